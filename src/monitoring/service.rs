//! Per-order monitoring of a drone in flight.
//!
//! While an order is monitored the service listens to its telemetry,
//! lifecycle and moving-state topics. Every callback is queued on the order's
//! worker so one order's messages are processed one at a time and in arrival
//! order.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

use super::classifier::AlertClassifier;
use crate::config::AlertThresholds;
use crate::domain::drone::DeliveryStatus;
use crate::domain::events::{DomainEvent, EventBus};
use crate::domain::sensors::{AlertLevel, AlertType, SensorReading, SensorValue};
use crate::domain::value_objects::{DroneData, OrderIdentifier, Orientation, Username};
use crate::protocol::{decode_or_log, topics, AlertMessage, LifecycleMessage, MovingStateMessage, Signal, Telemetry};
use crate::repositories::SensorDataRepository;
use crate::runtime::KeyedExecutor;
use crate::shipping::DeliveryService;
use crate::transport::{publish_or_log, MessageHandler, Transport, TransportError};

#[derive(Clone, Copy, Debug)]
enum Channel { Telemetry, Lifecycle, MovingState }

/// What the back office knows about one order in flight.
struct Session {
    courier: Username,
    levels: HashMap<AlertType, AlertLevel>,
    proximity: Option<f64>,
    orientation: Option<Orientation>,
    image_size: Option<u64>,
    topics: Vec<String>,
}

impl Session {
    fn new(courier: Username, topics: Vec<String>) -> Self {
        Self { courier, levels: HashMap::new(), proximity: None, orientation: None, image_size: None, topics }
    }

    fn record(&mut self, value: &SensorValue) {
        match value {
            SensorValue::Proximity { distance } => self.proximity = Some(*distance),
            SensorValue::Accelerometer(orientation) => self.orientation = Some(*orientation),
            SensorValue::Camera { image_size } => self.image_size = Some(*image_size),
        }
    }

    /// Latest values as a negligence snapshot. Signals not read yet are zero.
    fn snapshot(&self) -> Option<DroneData> {
        let data = DroneData::now(
            self.proximity.unwrap_or(0.0),
            self.orientation.unwrap_or_default(),
            self.image_size.unwrap_or(0),
        );
        data.map_err(|e| tracing::warn!(error = %e, "Cannot snapshot drone data")).ok()
    }
}

pub struct MonitoringService {
    inner: Arc<Inner>,
}

struct Inner {
    transport: Arc<dyn Transport>,
    events: EventBus,
    delivery: Arc<DeliveryService>,
    sensor_data: Arc<dyn SensorDataRepository>,
    classifier: AlertClassifier,
    executor: KeyedExecutor<OrderIdentifier>,
    sessions: Mutex<HashMap<OrderIdentifier, Session>>,
}

impl MonitoringService {
    pub fn new(
        transport: Arc<dyn Transport>,
        events: EventBus,
        delivery: Arc<DeliveryService>,
        sensor_data: Arc<dyn SensorDataRepository>,
        thresholds: AlertThresholds,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                events,
                delivery,
                sensor_data,
                classifier: AlertClassifier::new(thresholds),
                executor: KeyedExecutor::new("monitoring"),
                sessions: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Subscribes to every topic of `order_id`. Restarting an order resets its alert levels.
    pub async fn start(&self, order_id: OrderIdentifier, courier: Username) -> Result<(), TransportError> {
        let mut routes: Vec<(String, Channel)> =
            Signal::ALL.iter().map(|s| (topics::data(order_id, *s), Channel::Telemetry)).collect();
        routes.push((topics::lifecycle(order_id), Channel::Lifecycle));
        routes.push((topics::moving_state(order_id), Channel::MovingState));

        let topic_names = routes.iter().map(|(t, _)| t.clone()).collect();
        self.inner.sessions.lock().insert(order_id, Session::new(courier, topic_names));

        for (topic, channel) in routes {
            let handler = Inner::route(Arc::downgrade(&self.inner), order_id, topic.clone(), channel);
            if let Err(e) = self.inner.transport.subscribe(&topic, handler).await {
                self.inner.stop(order_id).await;
                return Err(e);
            }
        }
        tracing::info!(order_id = %order_id, "Monitoring started");
        Ok(())
    }

    pub async fn stop(&self, order_id: OrderIdentifier) {
        self.inner.stop(order_id).await;
    }

    pub fn is_monitoring(&self, order_id: OrderIdentifier) -> bool {
        self.inner.sessions.lock().contains_key(&order_id)
    }

    /// Current level of each signal seen so far for `order_id`.
    pub fn alert_levels(&self, order_id: OrderIdentifier) -> Option<HashMap<AlertType, AlertLevel>> {
        self.inner.sessions.lock().get(&order_id).map(|s| s.levels.clone())
    }
}

impl Inner {
    fn route(inner: Weak<Inner>, order_id: OrderIdentifier, topic: String, channel: Channel) -> MessageHandler {
        Arc::new(move |payload: Vec<u8>| {
            let Some(strong) = inner.upgrade() else { return };
            if !strong.sessions.lock().contains_key(&order_id) {
                tracing::debug!(order_id = %order_id, topic = %topic, "Message after monitoring stopped, dropping it");
                return;
            }
            let worker = strong.clone();
            let topic = topic.clone();
            strong.executor.submit(order_id, async move {
                match channel {
                    Channel::Telemetry => worker.on_telemetry(order_id, &topic, &payload).await,
                    Channel::Lifecycle => worker.on_lifecycle(order_id, &topic, &payload).await,
                    Channel::MovingState => worker.on_moving_state(order_id, &topic, &payload),
                }
            });
        })
    }

    async fn on_telemetry(&self, order_id: OrderIdentifier, topic: &str, payload: &[u8]) {
        let Some(telemetry) = decode_or_log::<Telemetry>(topic, payload) else { return };
        let reading = SensorReading::new(order_id, telemetry.into());
        let alert = self.classifier.classify(&reading.value);

        let change = {
            let mut sessions = self.sessions.lock();
            let Some(session) = sessions.get_mut(&order_id) else { return };
            session.record(&reading.value);
            let previous = session.levels.insert(alert.alert_type, alert.level).unwrap_or_default();
            (previous != alert.level).then(|| (session.courier.clone(), session.snapshot()))
        };

        if let Some((courier, snapshot)) = change {
            tracing::info!(order_id = %order_id, alert_type = %alert.alert_type, level = %alert.level, "Alert level changed");
            publish_or_log(self.transport.as_ref(), &topics::alert(order_id), &AlertMessage::from(alert)).await;
            let event = match alert.level {
                AlertLevel::Critical => DomainEvent::CriticalSituation { order_id, alert_type: alert.alert_type, courier, snapshot },
                AlertLevel::Warning => DomainEvent::DangerousSituation { order_id, alert_type: alert.alert_type },
                AlertLevel::Stable => DomainEvent::StableSituation { order_id, alert_type: alert.alert_type },
            };
            self.events.raise(&event);
        }

        self.sensor_data.save(reading);
        self.events.raise(&DomainEvent::SensorRead { reading });
    }

    async fn on_lifecycle(&self, order_id: OrderIdentifier, topic: &str, payload: &[u8]) {
        let Some(LifecycleMessage { status }) = decode_or_log(topic, payload) else { return };
        tracing::info!(order_id = %order_id, status = %status, "Delivery status");
        self.events.raise(&DomainEvent::StatusChanged { order_id, status });
        let outcome = match status {
            DeliveryStatus::Succeeded => self.delivery.succeed_delivery(order_id).await,
            DeliveryStatus::Failed => self.delivery.fail_delivery(order_id).await,
            DeliveryStatus::Returned => {
                self.stop(order_id).await;
                return;
            }
            DeliveryStatus::Delivering | DeliveryStatus::Returning => return,
        };
        if let Err(e) = outcome {
            tracing::warn!(order_id = %order_id, status = %status, error = %e, "Could not record delivery outcome");
        }
    }

    fn on_moving_state(&self, order_id: OrderIdentifier, topic: &str, payload: &[u8]) {
        let Some(MovingStateMessage { moving_state }) = decode_or_log(topic, payload) else { return };
        tracing::debug!(order_id = %order_id, state = ?moving_state, "Drone moving state");
        self.events.raise(&DomainEvent::MovingStateChanged { order_id, state: moving_state });
    }

    async fn stop(&self, order_id: OrderIdentifier) {
        let Some(session) = self.sessions.lock().remove(&order_id) else { return };
        for topic in &session.topics {
            if let Err(e) = self.transport.unsubscribe(topic).await {
                tracing::warn!(topic = %topic, error = %e, "Unsubscribe failed");
            }
        }
        self.executor.retire(&order_id);
        tracing::info!(order_id = %order_id, active = self.executor.active_keys(), "Monitoring stopped");
    }
}
