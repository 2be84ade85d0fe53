//! Drone Command/Travel Engine
//!
//! One actor task per drone. Transport callbacks, the travel ticker and the
//! handle all talk to it through a single command queue, so the run state and
//! the current leg are only ever touched by the actor itself.
//!
//! ```text
//! Idle ──activate──► Activating ──perform delivery──► Delivering
//!                                                        │ outbound leg done → succeeded|failed, halt
//!                                                        │ callback
//!                                                        ▼
//!                      Deactivated ◄──return leg done── Returning
//! ```
//!
//! The drone also halts itself when one of its own readings turns critical.
//! Only a remote proceed moves it again.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::run_state::{DroneRunState, MoveOrigin};
use super::sensors::SensorSuite;
use super::travel::TravelSimulator;
use crate::config::DroneConfig;
use crate::domain::aggregates::Order;
use crate::domain::drone::{DeliveryStatus, DrivingMode, MoveCommand, MovingState};
use crate::domain::sensors::{AlertLevel, AlertType, SensorValue};
use crate::monitoring::AlertClassifier;
use crate::domain::value_objects::{OrderIdentifier, Username};
use crate::protocol::{decode_or_log, topics, ControlMessage, LifecycleMessage, MovingStateMessage, SyncMessage, WireMessage};
use crate::transport::{publish_or_log, MessageHandler, Transport, TransportError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Activating,
    Delivering,
    Returning,
    Deactivated,
}

enum Command {
    Sync(SyncMessage),
    Control(ControlMessage),
    TravelTick,
    CriticalReading(AlertType),
    Shutdown,
}

/// Outcome of an outbound leg: `succeeded` with probability `success_probability`.
pub fn delivery_outcome(rng: &mut impl Rng, success_probability: f64) -> DeliveryStatus {
    let p = if success_probability.is_nan() { 0.0 } else { success_probability.clamp(0.0, 1.0) };
    if rng.gen_bool(p) { DeliveryStatus::Succeeded } else { DeliveryStatus::Failed }
}

/// Owner-side view of a running engine.
pub struct DroneHandle {
    state: watch::Receiver<EngineState>,
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl DroneHandle {
    pub fn state(&self) -> EngineState { *self.state.borrow() }

    pub fn subscribe_state(&self) -> watch::Receiver<EngineState> { self.state.clone() }

    /// Resolves once the engine reaches `target`; false if the engine is gone first.
    pub async fn wait_for(&mut self, target: EngineState) -> bool {
        self.state.wait_for(|s| *s == target).await.is_ok()
    }

    /// Asks the engine to deactivate.
    pub fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }

    pub async fn join(self) {
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Drone engine task failed");
        }
    }
}

pub struct DroneEngine {
    config: DroneConfig,
    transport: Arc<dyn Transport>,
    sensors: Option<Box<dyn SensorSuite>>,
    rng: StdRng,
    run: DroneRunState,
    state: watch::Sender<EngineState>,
    commands: mpsc::UnboundedSender<Command>,
    order: Option<Order>,
    leg: Option<TravelSimulator>,
    outbound_done: bool,
    subscriptions: Vec<String>,
    travel_task: Option<JoinHandle<()>>,
    telemetry_task: Option<JoinHandle<()>>,
}

impl DroneEngine {
    pub fn spawn(config: DroneConfig, transport: Arc<dyn Transport>, sensors: Box<dyn SensorSuite>) -> DroneHandle {
        Self::spawn_with_rng(config, transport, sensors, StdRng::from_entropy())
    }

    pub fn spawn_with_rng(config: DroneConfig, transport: Arc<dyn Transport>, sensors: Box<dyn SensorSuite>, rng: StdRng) -> DroneHandle {
        let (commands, rx) = mpsc::unbounded_channel();
        let (state, state_rx) = watch::channel(EngineState::Idle);
        let engine = Self {
            run: DroneRunState::new(config.drone_id.clone()),
            config,
            transport,
            sensors: Some(sensors),
            rng,
            state,
            commands: commands.clone(),
            order: None,
            leg: None,
            outbound_done: false,
            subscriptions: Vec::new(),
            travel_task: None,
            telemetry_task: None,
        };
        let task = tokio::spawn(engine.run(rx));
        DroneHandle { state: state_rx, commands, task }
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        if let Err(e) = self.activate().await {
            tracing::error!(drone_id = %self.run.drone_id(), error = %e, "Drone activation failed");
            self.deactivate().await;
            return;
        }
        while let Some(command) = commands.recv().await {
            match command {
                Command::Sync(message) => self.on_sync(message).await,
                Command::Control(message) => self.on_control(message).await,
                Command::TravelTick => self.on_travel_tick().await,
                Command::CriticalReading(alert_type) => {
                    tracing::warn!(drone_id = %self.run.drone_id(), alert_type = %alert_type, "Critical reading, halting");
                    self.halt().await;
                }
                Command::Shutdown => self.deactivate().await,
            }
            if self.current_state() == EngineState::Deactivated {
                break;
            }
        }
    }

    fn current_state(&self) -> EngineState { *self.state.borrow() }

    fn set_state(&self, state: EngineState) {
        tracing::debug!(drone_id = %self.run.drone_id(), state = ?state, "Engine state");
        self.state.send_replace(state);
    }

    async fn activate(&mut self) -> Result<(), TransportError> {
        self.transport.connect().await?;
        self.listen::<SyncMessage>(topics::sync(self.run.drone_id()), Command::Sync).await?;
        self.set_state(EngineState::Activating);
        tracing::info!(drone_id = %self.run.drone_id(), "Drone activated, waiting for a delivery");
        Ok(())
    }

    async fn listen<T>(&mut self, topic: String, wrap: fn(T) -> Command) -> Result<(), TransportError>
    where
        T: WireMessage + Send + 'static,
    {
        let tx = self.commands.clone();
        let t = topic.clone();
        let handler: MessageHandler = Arc::new(move |payload: Vec<u8>| {
            if let Some(message) = decode_or_log::<T>(&t, &payload) {
                let _ = tx.send(wrap(message));
            }
        });
        self.transport.subscribe(&topic, handler).await?;
        self.subscriptions.push(topic);
        Ok(())
    }

    async fn unlisten(&mut self, topic: &str) {
        self.subscriptions.retain(|t| t != topic);
        if let Err(e) = self.transport.unsubscribe(topic).await {
            tracing::warn!(topic = %topic, error = %e, "Unsubscribe failed");
        }
    }

    async fn on_sync(&mut self, message: SyncMessage) {
        match message {
            SyncMessage::PerformDelivery { courier, order } => self.start_delivery(courier, order).await,
            SyncMessage::Callback => self.start_return().await,
        }
    }

    async fn start_delivery(&mut self, courier: Username, order: Order) {
        if self.current_state() != EngineState::Activating || !self.run.assign(order.id()) {
            tracing::warn!(drone_id = %self.run.drone_id(), order_id = %order.id(), "Delivery command ignored, drone is busy");
            return;
        }
        let order_id = order.id();

        // commands now arrive on the order's topics instead of the drone's
        self.unlisten(&topics::sync(self.run.drone_id())).await;
        let subscribed = match self.listen::<SyncMessage>(topics::sync(order_id), Command::Sync).await {
            Ok(()) => self.listen::<ControlMessage>(topics::control(order_id), Command::Control).await,
            Err(e) => Err(e),
        };
        if let Err(e) = subscribed {
            tracing::error!(order_id = %order_id, error = %e, "Cannot listen for order commands");
            self.deactivate().await;
            return;
        }

        tracing::info!(drone_id = %self.run.drone_id(), order_id = %order_id, courier = %courier, product = %order.product(), "Delivery started");
        self.order = Some(order);
        self.set_state(EngineState::Delivering);
        self.publish_status(DeliveryStatus::Delivering).await;
        self.start_telemetry(order_id);
        self.start_leg().await;
    }

    async fn start_return(&mut self) {
        if self.current_state() != EngineState::Delivering || !self.outbound_done {
            tracing::warn!(drone_id = %self.run.drone_id(), "Callback ignored, outbound leg not finished");
            return;
        }
        tracing::info!(drone_id = %self.run.drone_id(), "Returning to base");
        self.set_state(EngineState::Returning);
        self.publish_status(DeliveryStatus::Returning).await;
        self.start_leg().await;
    }

    async fn on_control(&mut self, message: ControlMessage) {
        match message {
            ControlMessage::Move(MoveCommand::Proceed) => self.proceed(MoveOrigin::Remote).await,
            ControlMessage::Move(MoveCommand::Halt) => self.halt().await,
            ControlMessage::Mode(mode) => {
                tracing::info!(drone_id = %self.run.drone_id(), mode = %mode, "Driving mode changed");
                if self.run.change_mode(mode) {
                    self.stopped().await;
                }
            }
        }
    }

    async fn start_leg(&mut self) {
        self.leg = Some(TravelSimulator::new(self.config.leg_duration));
        let tx = self.commands.clone();
        let period = self.config.travel_tick.max(Duration::from_millis(1));
        if let Some(previous) = self.travel_task.replace(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if tx.send(Command::TravelTick).is_err() {
                    break;
                }
            }
        })) {
            previous.abort();
        }
        self.proceed(MoveOrigin::Autonomous).await;
    }

    async fn proceed(&mut self, origin: MoveOrigin) {
        let Some(leg) = self.leg.as_mut() else {
            tracing::debug!(drone_id = %self.run.drone_id(), "No leg in progress, proceed ignored");
            return;
        };
        if self.run.proceed(origin) {
            leg.resume(Instant::now());
            self.publish_moving(MovingState::Moving).await;
        } else if self.run.mode() == DrivingMode::Manual && origin == MoveOrigin::Autonomous {
            tracing::info!(drone_id = %self.run.drone_id(), "Manual mode, waiting for a proceed command");
        }
    }

    async fn halt(&mut self) {
        if self.run.halt() {
            self.stopped().await;
        }
    }

    async fn stopped(&mut self) {
        if let Some(leg) = self.leg.as_mut() {
            leg.pause(Instant::now());
        }
        self.publish_moving(MovingState::Stopped).await;
    }

    async fn on_travel_tick(&mut self) {
        let now = Instant::now();
        if !self.leg.is_some_and(|leg| leg.is_complete(now)) {
            return;
        }
        self.leg = None;
        if let Some(task) = self.travel_task.take() {
            task.abort();
        }
        match self.current_state() {
            EngineState::Delivering => {
                let outcome = delivery_outcome(&mut self.rng, self.config.success_probability);
                tracing::info!(drone_id = %self.run.drone_id(), outcome = %outcome, "Outbound leg complete");
                self.outbound_done = true;
                self.publish_status(outcome).await;
                self.halt().await;
            }
            EngineState::Returning => {
                tracing::info!(drone_id = %self.run.drone_id(), "Return leg complete");
                self.halt().await;
                self.publish_status(DeliveryStatus::Returned).await;
                self.deactivate().await;
            }
            _ => {}
        }
    }

    fn start_telemetry(&mut self, order_id: OrderIdentifier) {
        let Some(mut sensors) = self.sensors.take() else { return };
        let transport = self.transport.clone();
        let tx = self.commands.clone();
        let classifier = AlertClassifier::new(self.config.thresholds);
        let period = self.config.telemetry_period.max(Duration::from_millis(1));
        self.telemetry_task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut was_critical = false;
            loop {
                ticker.tick().await;
                let mut critical = None;
                for (signal, sample) in sensors.read_all() {
                    let alert = classifier.classify(&SensorValue::from(sample));
                    if alert.level == AlertLevel::Critical {
                        critical.get_or_insert(alert.alert_type);
                    }
                    publish_or_log(transport.as_ref(), &topics::data(order_id, signal), &sample).await;
                }
                // halt once on entering danger so a remote proceed can override it
                if let (Some(alert_type), false) = (critical, was_critical) {
                    let _ = tx.send(Command::CriticalReading(alert_type));
                }
                was_critical = critical.is_some();
            }
        }));
    }

    async fn deactivate(&mut self) {
        for task in [self.telemetry_task.take(), self.travel_task.take()].into_iter().flatten() {
            task.abort();
        }
        self.leg = None;
        for topic in std::mem::take(&mut self.subscriptions) {
            if let Err(e) = self.transport.unsubscribe(&topic).await {
                tracing::warn!(topic = %topic, error = %e, "Unsubscribe failed");
            }
        }
        if let Err(e) = self.transport.close().await {
            tracing::warn!(error = %e, "Closing transport failed");
        }
        self.set_state(EngineState::Deactivated);
        tracing::info!(drone_id = %self.run.drone_id(), order_id = ?self.order.as_ref().map(|o| o.id().as_u64()), "Drone deactivated");
    }

    async fn publish_status(&self, status: DeliveryStatus) {
        let Some(order_id) = self.run.assigned_order() else { return };
        publish_or_log(self.transport.as_ref(), &topics::lifecycle(order_id), &LifecycleMessage { status }).await;
    }

    async fn publish_moving(&self, moving_state: MovingState) {
        let Some(order_id) = self.run.assigned_order() else { return };
        publish_or_log(self.transport.as_ref(), &topics::moving_state(order_id), &MovingStateMessage { moving_state }).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{Client, DroneId, OrderDate, Orientation, Product};
    use crate::protocol::{decode, encode, Signal};
    use crate::transport::{MemoryBroker, MemoryTransport};

    struct FixedSensors {
        proximity: f64,
    }

    impl SensorSuite for FixedSensors {
        fn read_proximity(&mut self) -> f64 { self.proximity }
        fn read_accelerometer(&mut self) -> Orientation { Orientation::new(2, -3, 90) }
        fn read_camera(&mut self) -> u64 { 4096 }
    }

    fn config(leg_ms: u64, success_probability: f64) -> DroneConfig {
        DroneConfig {
            leg_duration: Duration::from_millis(leg_ms),
            travel_tick: Duration::from_millis(5),
            telemetry_period: Duration::from_millis(20),
            success_probability,
            ..DroneConfig::new(DroneId::new("D1").unwrap())
        }
    }

    fn order() -> Order {
        let today = OrderDate::today();
        Order::place(OrderIdentifier::new(7).unwrap(), Product::new("Widget").unwrap(), Client::new("Alice").unwrap(), today, today.plus_days(1)).unwrap()
    }

    async fn start(cfg: DroneConfig) -> (MemoryBroker, MemoryTransport, DroneHandle) {
        start_near(cfg, 120.0).await
    }

    async fn start_near(cfg: DroneConfig, proximity: f64) -> (MemoryBroker, MemoryTransport, DroneHandle) {
        let broker = MemoryBroker::new();
        let office = broker.transport();
        office.connect().await.unwrap();
        let sensors = Box::new(FixedSensors { proximity });
        let mut drone = DroneEngine::spawn_with_rng(cfg, Arc::new(broker.transport()), sensors, StdRng::seed_from_u64(1));
        assert!(tokio::time::timeout(Duration::from_secs(2), drone.wait_for(EngineState::Activating)).await.unwrap());
        (broker, office, drone)
    }

    async fn send<T: WireMessage>(office: &MemoryTransport, topic: &str, message: &T) {
        office.publish(topic, encode(message).unwrap()).await.unwrap();
    }

    fn statuses(broker: &MemoryBroker) -> Vec<DeliveryStatus> {
        broker.published(&topics::lifecycle(7)).iter().map(|p| decode::<LifecycleMessage>(p).unwrap().unwrap().status).collect()
    }

    fn moves(broker: &MemoryBroker) -> Vec<MovingState> {
        broker.published(&topics::moving_state(7)).iter().map(|p| decode::<MovingStateMessage>(p).unwrap().unwrap().moving_state).collect()
    }

    async fn eventually(check: impl Fn() -> bool) {
        for _ in 0..300 {
            if check() { return; }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    fn deliver() -> SyncMessage {
        SyncMessage::PerformDelivery { courier: Username::new("C1").unwrap(), order: order() }
    }

    #[test]
    fn test_outcome_frequency() {
        let mut rng = StdRng::seed_from_u64(42);
        let runs = 20_000;
        let succeeded = (0..runs).filter(|_| delivery_outcome(&mut rng, 0.7) == DeliveryStatus::Succeeded).count();
        let ratio = succeeded as f64 / runs as f64;
        assert!((0.68..0.72).contains(&ratio), "ratio {ratio}");
        assert_eq!(delivery_outcome(&mut rng, 1.0), DeliveryStatus::Succeeded);
        assert_eq!(delivery_outcome(&mut rng, 0.0), DeliveryStatus::Failed);
        assert_eq!(delivery_outcome(&mut rng, f64::NAN), DeliveryStatus::Failed);
    }

    #[test]
    fn test_engine_can_be_shared_across_awaits() {
        fn shareable<T: Send + Sync>() {}
        shareable::<DroneEngine>();
    }

    #[tokio::test]
    async fn test_full_delivery_cycle() {
        let (broker, office, mut drone) = start(config(100, 1.0)).await;
        send(&office, "syncD1", &deliver()).await;
        let b = broker.clone();
        eventually(|| statuses(&b).len() == 2).await;
        assert_eq!(statuses(&broker), vec![DeliveryStatus::Delivering, DeliveryStatus::Succeeded]);
        assert_eq!(drone.state(), EngineState::Delivering);
        assert_eq!(broker.subscriber_count("syncD1"), 0);
        assert!(!broker.published(&topics::data(7, Signal::Proximity)).is_empty());
        assert!(!broker.published(&topics::data(7, Signal::Accelerometer)).is_empty());

        send(&office, &topics::sync(7), &SyncMessage::Callback).await;
        assert!(tokio::time::timeout(Duration::from_secs(2), drone.wait_for(EngineState::Deactivated)).await.unwrap());
        assert_eq!(
            statuses(&broker),
            vec![DeliveryStatus::Delivering, DeliveryStatus::Succeeded, DeliveryStatus::Returning, DeliveryStatus::Returned]
        );
        assert_eq!(moves(&broker), vec![MovingState::Moving, MovingState::Stopped, MovingState::Moving, MovingState::Stopped]);
        assert_eq!(broker.subscriber_count(&topics::control(7)), 0);
        assert_eq!(broker.subscriber_count(&topics::sync(7)), 0);

        // telemetry stops with the drone
        tokio::time::sleep(Duration::from_millis(30)).await;
        let samples = broker.published(&topics::data(7, Signal::Camera)).len();
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(broker.published(&topics::data(7, Signal::Camera)).len(), samples);
        drone.join().await;
    }

    #[tokio::test]
    async fn test_halt_freezes_the_leg() {
        let (broker, office, _drone) = start(config(300, 0.0)).await;
        send(&office, "syncD1", &deliver()).await;
        let b = broker.clone();
        eventually(|| statuses(&b).contains(&DeliveryStatus::Delivering)).await;
        send(&office, &topics::control(7), &ControlMessage::Move(MoveCommand::Halt)).await;
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(statuses(&broker), vec![DeliveryStatus::Delivering]);

        send(&office, &topics::control(7), &ControlMessage::Move(MoveCommand::Proceed)).await;
        eventually(|| statuses(&b).len() == 2).await;
        assert_eq!(statuses(&broker)[1], DeliveryStatus::Failed);
        assert_eq!(moves(&broker), vec![MovingState::Moving, MovingState::Stopped, MovingState::Moving, MovingState::Stopped]);
    }

    #[tokio::test]
    async fn test_critical_reading_halts_until_remote_proceed() {
        let (broker, office, _drone) = start_near(config(100, 1.0), 10.0).await;
        send(&office, "syncD1", &deliver()).await;
        let b = broker.clone();
        eventually(|| moves(&b).contains(&MovingState::Stopped)).await;
        assert_eq!(moves(&broker), vec![MovingState::Moving, MovingState::Stopped]);
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(statuses(&broker), vec![DeliveryStatus::Delivering]);

        // still critical, but the drone does not halt itself again
        send(&office, &topics::control(7), &ControlMessage::Move(MoveCommand::Proceed)).await;
        eventually(|| statuses(&b).len() == 2).await;
        assert_eq!(statuses(&broker)[1], DeliveryStatus::Succeeded);
        assert_eq!(moves(&broker), vec![MovingState::Moving, MovingState::Stopped, MovingState::Moving, MovingState::Stopped]);
    }

    #[tokio::test]
    async fn test_manual_mode_waits_for_remote_proceed() {
        let (broker, office, _drone) = start(config(200, 1.0)).await;
        send(&office, "syncD1", &deliver()).await;
        let b = broker.clone();
        eventually(|| statuses(&b).contains(&DeliveryStatus::Delivering)).await;
        send(&office, &topics::control(7), &ControlMessage::Mode(DrivingMode::Manual)).await;
        eventually(|| moves(&b).len() == 2).await;
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(statuses(&broker).len(), 1);

        send(&office, &topics::control(7), &ControlMessage::Move(MoveCommand::Proceed)).await;
        eventually(|| statuses(&b).len() == 2).await;
        // the return leg does not start on its own in manual mode
        send(&office, &topics::sync(7), &SyncMessage::Callback).await;
        eventually(|| statuses(&b).len() == 3).await;
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(statuses(&broker)[2], DeliveryStatus::Returning);
        assert_eq!(statuses(&broker).len(), 3);
    }

    #[tokio::test]
    async fn test_bad_commands_are_dropped() {
        let (broker, office, drone) = start(config(100, 1.0)).await;
        office.publish("syncD1", b"{not json".to_vec()).await.unwrap();
        send(&office, "syncD1", &SyncMessage::Callback).await;
        office.publish("syncD1", br#"{"sync": "dance"}"#.to_vec()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(drone.state(), EngineState::Activating);
        assert!(statuses(&broker).is_empty());

        send(&office, "syncD1", &deliver()).await;
        let b = broker.clone();
        eventually(|| statuses(&b).len() == 2).await;
    }

    #[tokio::test]
    async fn test_shutdown_deactivates() {
        let (broker, _office, mut drone) = start(config(100, 1.0)).await;
        drone.shutdown();
        assert!(tokio::time::timeout(Duration::from_secs(2), drone.wait_for(EngineState::Deactivated)).await.unwrap());
        assert_eq!(broker.subscriber_count("syncD1"), 0);
    }
}
