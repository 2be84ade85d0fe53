//! Order Aggregate
//!
//! Every transition builds a new immutable [`Order`] carrying the same
//! identifier, raises the matching event and hands the new value back. The
//! aggregate is never written from here: persistence belongs to whoever
//! handles the event.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::events::{DomainEvent, EventBus};
use crate::domain::value_objects::{Client, DroneId, OrderDate, OrderIdentifier, Product, Username, ValueError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderState { Placed, Delivering, Succeeded, Failed, Rescheduled }

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Placed => "PLACED",
            Self::Delivering => "DELIVERING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Rescheduled => "RESCHEDULED",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "OrderDocument", into = "OrderDocument")]
pub struct Order {
    id: OrderIdentifier,
    product: Product,
    client: Client,
    placing_date: OrderDate,
    estimated_arrival: OrderDate,
    state: OrderState,
}

/// Wire and storage shape of an order.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderDocument {
    id: OrderIdentifier,
    product: Product,
    client: Client,
    placing_date: OrderDate,
    estimated_arrival: OrderDate,
    current_state: OrderState,
}

impl Order {
    /// A freshly placed order. Rejects an arrival before the placing date.
    pub fn place(id: OrderIdentifier, product: Product, client: Client, placing_date: OrderDate, estimated_arrival: OrderDate) -> Result<Self, OrderError> {
        Self::build(id, product, client, placing_date, estimated_arrival, OrderState::Placed)
    }

    fn build(id: OrderIdentifier, product: Product, client: Client, placing_date: OrderDate, estimated_arrival: OrderDate, state: OrderState) -> Result<Self, OrderError> {
        if estimated_arrival.is_before(&placing_date) {
            return Err(OrderError::ArrivalBeforePlacing { placing: placing_date, arrival: estimated_arrival });
        }
        Ok(Self { id, product, client, placing_date, estimated_arrival, state })
    }

    pub fn id(&self) -> OrderIdentifier { self.id }
    pub fn product(&self) -> &Product { &self.product }
    pub fn client(&self) -> &Client { &self.client }
    pub fn placing_date(&self) -> OrderDate { self.placing_date }
    pub fn estimated_arrival(&self) -> OrderDate { self.estimated_arrival }
    pub fn current_state(&self) -> OrderState { self.state }

    /// Placed or Rescheduled → Delivering. Raises `OrderDelivering`.
    pub fn start_delivering(&self, drone_id: &DroneId, courier: &Username, events: &EventBus) -> Result<Order, OrderError> {
        self.require(&[OrderState::Placed, OrderState::Rescheduled], "deliver")?;
        let order = self.with_state(OrderState::Delivering);
        events.raise(&DomainEvent::OrderDelivering { order: order.clone(), drone_id: drone_id.clone(), courier: courier.clone() });
        Ok(order)
    }

    /// Delivering → Succeeded. Raises `OrderSucceeded`.
    pub fn succeed_delivery(&self, events: &EventBus) -> Result<Order, OrderError> {
        self.require(&[OrderState::Delivering], "succeed")?;
        let order = self.with_state(OrderState::Succeeded);
        events.raise(&DomainEvent::OrderSucceeded { order: order.clone() });
        Ok(order)
    }

    /// Delivering → Failed. Raises `OrderFailed`.
    pub fn fail_delivery(&self, events: &EventBus) -> Result<Order, OrderError> {
        self.require(&[OrderState::Delivering], "fail")?;
        let order = self.with_state(OrderState::Failed);
        events.raise(&DomainEvent::OrderFailed { order: order.clone() });
        Ok(order)
    }

    /// Failed → Rescheduled with a new arrival no earlier than the current one.
    pub fn reschedule_delivery(&self, new_arrival: OrderDate, events: &EventBus) -> Result<Order, OrderError> {
        self.require(&[OrderState::Failed], "reschedule")?;
        if new_arrival.is_before(&self.estimated_arrival) {
            return Err(OrderError::RescheduledBeforeArrival { previous: self.estimated_arrival, requested: new_arrival });
        }
        let order = Self { estimated_arrival: new_arrival, state: OrderState::Rescheduled, ..self.clone() };
        events.raise(&DomainEvent::OrderRescheduled { order: order.clone() });
        Ok(order)
    }

    fn require(&self, allowed: &[OrderState], action: &'static str) -> Result<(), OrderError> {
        if allowed.contains(&self.state) { return Ok(()); }
        Err(OrderError::InvalidTransition { order_id: self.id, from: self.state, action })
    }

    fn with_state(&self, state: OrderState) -> Order { Self { state, ..self.clone() } }
}

impl TryFrom<OrderDocument> for Order {
    type Error = OrderError;
    fn try_from(doc: OrderDocument) -> Result<Self, Self::Error> {
        Self::build(doc.id, doc.product, doc.client, doc.placing_date, doc.estimated_arrival, doc.current_state)
    }
}

impl From<Order> for OrderDocument {
    fn from(o: Order) -> Self {
        Self { id: o.id, product: o.product, client: o.client, placing_date: o.placing_date, estimated_arrival: o.estimated_arrival, current_state: o.state }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    InvalidTransition { order_id: OrderIdentifier, from: OrderState, action: &'static str },
    ArrivalBeforePlacing { placing: OrderDate, arrival: OrderDate },
    RescheduledBeforeArrival { previous: OrderDate, requested: OrderDate },
    ArrivalNotInFuture { arrival: OrderDate },
    Value(ValueError),
}

impl std::error::Error for OrderError {}
impl fmt::Display for OrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTransition { order_id, from, action } => write!(f, "Order {} cannot {} from {}", order_id, action, from),
            Self::ArrivalBeforePlacing { placing, arrival } => write!(f, "Estimated arrival {} is before placing date {}", arrival, placing),
            Self::RescheduledBeforeArrival { previous, requested } => write!(f, "Rescheduled arrival {} is before previous arrival {}", requested, previous),
            Self::ArrivalNotInFuture { arrival } => write!(f, "Estimated arrival {} must be after today", arrival),
            Self::Value(e) => write!(f, "{}", e),
        }
    }
}

impl From<ValueError> for OrderError {
    fn from(e: ValueError) -> Self { Self::Value(e) }
}
