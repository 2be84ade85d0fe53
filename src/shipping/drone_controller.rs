//! Back-office side of drone commands.
//!
//! Reacts to `OrderDelivering` by starting monitoring for the order and only
//! then sending the perform-delivery command on the drone's sync topic, so no
//! telemetry is published before someone listens.

use std::sync::Arc;

use crate::domain::drone::{DrivingMode, MoveCommand};
use crate::domain::events::{DomainEvent, EventBus, EventKind, HandlerId};
use crate::domain::value_objects::OrderIdentifier;
use crate::monitoring::MonitoringService;
use crate::protocol::{topics, ControlMessage, SyncMessage};
use crate::transport::{publish_message, publish_or_log, Transport, TransportError};

pub struct DroneController {
    transport: Arc<dyn Transport>,
    events: EventBus,
    handler: HandlerId,
}

impl DroneController {
    pub fn new(transport: Arc<dyn Transport>, events: EventBus, monitoring: Arc<MonitoringService>) -> Self {
        let t = transport.clone();
        let handler = events.register(EventKind::OrderDelivering, Arc::new(move |event| {
            let DomainEvent::OrderDelivering { order, drone_id, courier } = event else { return };
            let Ok(runtime) = tokio::runtime::Handle::try_current() else {
                tracing::error!(order_id = %order.id(), "No runtime to dispatch the delivery command");
                return;
            };
            let (transport, monitoring) = (t.clone(), monitoring.clone());
            let (order, drone_id, courier) = (order.clone(), drone_id.clone(), courier.clone());
            runtime.spawn(async move {
                if let Err(e) = monitoring.start(order.id(), courier.clone()).await {
                    tracing::error!(order_id = %order.id(), error = %e, "Monitoring could not start, delivery command not sent");
                    return;
                }
                tracing::info!(order_id = %order.id(), drone_id = %drone_id, courier = %courier, "Sending delivery command");
                let topic = topics::sync(&drone_id);
                publish_or_log(transport.as_ref(), &topic, &SyncMessage::PerformDelivery { courier, order }).await;
            });
        }));
        Self { transport, events, handler }
    }

    /// Sends the drone of `order_id` back to base.
    pub async fn callback(&self, order_id: OrderIdentifier) -> Result<(), TransportError> {
        publish_message(self.transport.as_ref(), &topics::sync(order_id), &SyncMessage::Callback).await
    }

    pub async fn halt(&self, order_id: OrderIdentifier) -> Result<(), TransportError> {
        self.control(order_id, ControlMessage::Move(MoveCommand::Halt)).await
    }

    pub async fn proceed(&self, order_id: OrderIdentifier) -> Result<(), TransportError> {
        self.control(order_id, ControlMessage::Move(MoveCommand::Proceed)).await
    }

    pub async fn change_mode(&self, order_id: OrderIdentifier, mode: DrivingMode) -> Result<(), TransportError> {
        self.control(order_id, ControlMessage::Mode(mode)).await
    }

    async fn control(&self, order_id: OrderIdentifier, message: ControlMessage) -> Result<(), TransportError> {
        tracing::info!(order_id = %order_id, command = ?message, "Sending drone control");
        publish_message(self.transport.as_ref(), &topics::control(order_id), &message).await
    }
}

impl Drop for DroneController {
    fn drop(&mut self) {
        self.events.unregister(EventKind::OrderDelivering, self.handler);
    }
}
