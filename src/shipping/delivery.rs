//! Delivery Service
//!
//! Drives order transitions. A transition and the write of its result run as
//! one job in the order's queue: the job loads the stored order, applies the
//! transition, and the persistence handler registered here writes the new
//! value while the event is raised. Two transitions on the same order can
//! therefore never interleave.

use std::sync::Arc;

use crate::domain::aggregates::{Order, OrderState};
use crate::domain::events::{EventBus, EventKind, HandlerId};
use crate::domain::value_objects::{DroneId, OrderDate, OrderIdentifier, Username};
use crate::repositories::{OrderRepository, RepositoryError};
use crate::runtime::KeyedExecutor;

const ORDER_EVENTS: [EventKind; 4] =
    [EventKind::OrderDelivering, EventKind::OrderSucceeded, EventKind::OrderFailed, EventKind::OrderRescheduled];

pub struct DeliveryService {
    orders: Arc<dyn OrderRepository>,
    events: EventBus,
    executor: KeyedExecutor<OrderIdentifier>,
    handlers: Vec<(EventKind, HandlerId)>,
}

impl DeliveryService {
    pub fn new(orders: Arc<dyn OrderRepository>, events: EventBus) -> Self {
        let repo = orders.clone();
        let persist: crate::domain::events::EventHandler = Arc::new(move |event| {
            let Some(order) = event.order() else { return };
            match repo.update(order) {
                Ok(()) => tracing::debug!(order_id = %order.id(), state = %order.current_state(), "Order persisted"),
                Err(e) => tracing::error!(order_id = %order.id(), error = %e, "Failed to persist order"),
            }
        });
        let handlers = ORDER_EVENTS.iter().map(|kind| (*kind, events.register(*kind, persist.clone()))).collect();
        Self { orders, events, executor: KeyedExecutor::new("orders"), handlers }
    }

    /// Placed or Rescheduled → Delivering; the drone command follows from `OrderDelivering`.
    pub async fn perform_delivery(&self, id: OrderIdentifier, drone_id: DroneId, courier: Username) -> crate::Result<Order> {
        self.transition(id, move |order, events| order.start_delivering(&drone_id, &courier, events)).await
    }

    pub async fn succeed_delivery(&self, id: OrderIdentifier) -> crate::Result<Order> {
        self.transition(id, |order, events| order.succeed_delivery(events)).await
    }

    pub async fn fail_delivery(&self, id: OrderIdentifier) -> crate::Result<Order> {
        self.transition(id, |order, events| order.fail_delivery(events)).await
    }

    pub async fn reschedule_delivery(&self, id: OrderIdentifier, new_arrival: OrderDate) -> crate::Result<Order> {
        self.transition(id, move |order, events| order.reschedule_delivery(new_arrival, events)).await
    }

    async fn transition<F>(&self, id: OrderIdentifier, apply: F) -> crate::Result<Order>
    where
        F: FnOnce(&Order, &EventBus) -> Result<Order, crate::OrderError> + Send + 'static,
    {
        let (orders, events) = (self.orders.clone(), self.events.clone());
        let result = self
            .executor
            .run(id, async move {
                let current = orders.retrieve_order(id).ok_or_else(|| RepositoryError::not_found("order", id))?;
                let next = apply(&current, &events)?;
                tracing::info!(order_id = %id, from = %current.current_state(), to = %next.current_state(), "Order transition");
                Ok::<_, crate::DeliveryError>(next)
            })
            .await?;
        match &result {
            // succeeded is terminal; later transitions would only be rejected
            Ok(order) if order.current_state() == OrderState::Succeeded => {
                self.executor.retire(&id);
                tracing::debug!(order_id = %id, active = self.executor.active_keys(), "Order queue retired");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(order_id = %id, error = %e, "Order transition rejected"),
        }
        result
    }
}

impl Drop for DeliveryService {
    fn drop(&mut self) {
        for (kind, id) in &self.handlers {
            self.events.unregister(*kind, *id);
        }
    }
}
