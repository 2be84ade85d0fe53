//! Back office and drone engine talking over one in-memory broker.

use std::sync::Arc;
use std::time::Duration;

use drone_delivery::backoffice::BackOffice;
use drone_delivery::domain::aggregates::{OrderState, ReportStatus};
use drone_delivery::domain::sensors::{AlertLevel, AlertType};
use drone_delivery::domain::value_objects::{Client, DroneId, Negligent, OrderDate, OrderIdentifier, Orientation, Product, Username};
use drone_delivery::drone::{DroneEngine, DroneHandle, EngineState, SensorSuite};
use drone_delivery::transport::MemoryBroker;
use drone_delivery::{AlertThresholds, Config, DeliveryError, DroneConfig, OrderError};
use rand::rngs::StdRng;
use rand::SeedableRng;

struct FixedSensors {
    proximity: f64,
}

impl SensorSuite for FixedSensors {
    fn read_proximity(&mut self) -> f64 { self.proximity }
    fn read_accelerometer(&mut self) -> Orientation { Orientation::new(5, -5, 180) }
    fn read_camera(&mut self) -> u64 { 2048 }
}

fn config(success_probability: f64) -> Config {
    let drone = DroneConfig {
        leg_duration: Duration::from_millis(150),
        travel_tick: Duration::from_millis(5),
        telemetry_period: Duration::from_millis(20),
        success_probability,
        ..DroneConfig::new(DroneId::new("D1").unwrap())
    };
    Config {
        nats_url: String::new(),
        http_port: 0,
        maintainer: Username::new("M1").unwrap(),
        supervised_couriers: vec![Username::new("C1").unwrap()],
        thresholds: AlertThresholds::default(),
        drone,
    }
}

async fn setup(success_probability: f64, proximity: f64) -> (BackOffice, DroneHandle, OrderIdentifier) {
    let broker = MemoryBroker::new();
    let cfg = config(success_probability);
    let office = BackOffice::start(Arc::new(broker.transport()), &cfg).await.unwrap();
    let mut drone = DroneEngine::spawn_with_rng(cfg.drone.clone(), Arc::new(broker.transport()), Box::new(FixedSensors { proximity }), StdRng::seed_from_u64(3));
    assert!(tokio::time::timeout(Duration::from_secs(2), drone.wait_for(EngineState::Activating)).await.unwrap());

    let order = office.orders.place_order(Product::new("Widget").unwrap(), Client::new("Alice").unwrap(), OrderDate::today().plus_days(2)).unwrap();
    office.delivery.perform_delivery(order.id(), DroneId::new("D1").unwrap(), Username::new("C1").unwrap()).await.unwrap();
    (office, drone, order.id())
}

async fn eventually(check: impl Fn() -> bool) {
    for _ in 0..300 {
        if check() { return; }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

fn state_of(office: &BackOffice, id: OrderIdentifier) -> Option<OrderState> {
    office.orders.retrieve_order(id).map(|o| o.current_state())
}

#[tokio::test]
async fn test_failed_delivery_rescheduled_and_recalled() {
    let (office, mut drone, id) = setup(0.0, 120.0).await;

    eventually(|| state_of(&office, id) == Some(OrderState::Failed)).await;
    assert_eq!(drone.state(), EngineState::Delivering);
    assert!(office.monitoring.is_monitoring(id));
    assert!(!office.data.history(id, AlertType::Distance).is_empty());
    assert_eq!(office.monitoring.alert_levels(id).unwrap()[&AlertType::Distance], AlertLevel::Stable);

    let earlier = office.delivery.reschedule_delivery(id, OrderDate::today().plus_days(1)).await;
    assert!(matches!(earlier, Err(DeliveryError::Order(OrderError::RescheduledBeforeArrival { .. }))));
    let rescheduled = office.delivery.reschedule_delivery(id, OrderDate::today().plus_days(3)).await.unwrap();
    assert_eq!(rescheduled.current_state(), OrderState::Rescheduled);
    assert_eq!(state_of(&office, id), Some(OrderState::Rescheduled));

    office.drones.callback(id).await.unwrap();
    assert!(tokio::time::timeout(Duration::from_secs(3), drone.wait_for(EngineState::Deactivated)).await.unwrap());
    eventually(|| !office.monitoring.is_monitoring(id)).await;
    assert_eq!(state_of(&office, id), Some(OrderState::Rescheduled));
    drone.join().await;
}

#[tokio::test]
async fn test_successful_delivery() {
    let (office, _drone, id) = setup(1.0, 120.0).await;
    eventually(|| state_of(&office, id) == Some(OrderState::Succeeded)).await;
    let snapshot = office.data.latest_snapshot(id).unwrap();
    assert_eq!(snapshot.proximity(), 120.0);
    assert_eq!(snapshot.image_size(), 2048);
}

#[tokio::test]
async fn test_critical_proximity_files_one_negligence_report() {
    let (office, _drone, id) = setup(1.0, 10.0).await;
    let courier = Negligent::new("C1").unwrap();
    eventually(|| !office.negligence.for_negligent(&courier, ReportStatus::Open).is_empty()).await;

    // the drone halted itself on the critical reading
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(state_of(&office, id), Some(OrderState::Delivering));
    office.drones.proceed(id).await.unwrap();
    eventually(|| state_of(&office, id) == Some(OrderState::Succeeded)).await;

    let reports = office.negligence.for_negligent(&courier, ReportStatus::Open);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].assignee().as_str(), "M1");
    assert_eq!(reports[0].data().proximity(), 10.0);
    assert_eq!(office.monitoring.alert_levels(id).unwrap()[&AlertType::Distance], AlertLevel::Critical);
}

#[tokio::test]
async fn test_back_office_drops_without_blocking() {
    let broker = MemoryBroker::new();
    let office = BackOffice::start(Arc::new(broker.transport()), &config(1.0)).await.unwrap();
    office.orders.place_order(Product::new("Widget").unwrap(), Client::new("Alice").unwrap(), OrderDate::today().plus_days(2)).unwrap();

    let (done_tx, done_rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        drop(office);
        let _ = done_tx.send(());
    });
    assert!(done_rx.recv_timeout(Duration::from_secs(2)).is_ok(), "dropping the back office blocked");
}
