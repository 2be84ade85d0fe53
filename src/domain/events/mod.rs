//! Domain events
use crate::domain::aggregates::{Issue, NegligenceReport, Order};
use crate::domain::drone::{DeliveryStatus, MovingState};
use crate::domain::sensors::{AlertType, SensorReading};
use crate::domain::value_objects::{Assignee, DroneData, DroneId, Negligent, OrderIdentifier, Username};

mod bus;

pub use bus::{EventBus, EventHandler, HandlerId};

/// Immutable fact raised after a state transition or an inbound message.
#[derive(Clone, Debug)]
pub enum DomainEvent {
    OrderDelivering { order: Order, drone_id: DroneId, courier: Username },
    OrderSucceeded { order: Order },
    OrderFailed { order: Order },
    OrderRescheduled { order: Order },
    CriticalSituation { order_id: OrderIdentifier, alert_type: AlertType, courier: Username, snapshot: Option<DroneData> },
    DangerousSituation { order_id: OrderIdentifier, alert_type: AlertType },
    StableSituation { order_id: OrderIdentifier, alert_type: AlertType },
    StatusChanged { order_id: OrderIdentifier, status: DeliveryStatus },
    MovingStateChanged { order_id: OrderIdentifier, state: MovingState },
    SensorRead { reading: SensorReading },
    NewNegligence { negligent: Negligent, assignee: Assignee, data: DroneData },
    NegligenceReportClosed { report: NegligenceReport },
    NewIssue { issue: Issue },
}

/// Discriminant handlers are registered against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    OrderDelivering,
    OrderSucceeded,
    OrderFailed,
    OrderRescheduled,
    CriticalSituation,
    DangerousSituation,
    StableSituation,
    StatusChanged,
    MovingStateChanged,
    SensorRead,
    NewNegligence,
    NegligenceReportClosed,
    NewIssue,
}

impl DomainEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            DomainEvent::OrderDelivering { .. } => EventKind::OrderDelivering,
            DomainEvent::OrderSucceeded { .. } => EventKind::OrderSucceeded,
            DomainEvent::OrderFailed { .. } => EventKind::OrderFailed,
            DomainEvent::OrderRescheduled { .. } => EventKind::OrderRescheduled,
            DomainEvent::CriticalSituation { .. } => EventKind::CriticalSituation,
            DomainEvent::DangerousSituation { .. } => EventKind::DangerousSituation,
            DomainEvent::StableSituation { .. } => EventKind::StableSituation,
            DomainEvent::StatusChanged { .. } => EventKind::StatusChanged,
            DomainEvent::MovingStateChanged { .. } => EventKind::MovingStateChanged,
            DomainEvent::SensorRead { .. } => EventKind::SensorRead,
            DomainEvent::NewNegligence { .. } => EventKind::NewNegligence,
            DomainEvent::NegligenceReportClosed { .. } => EventKind::NegligenceReportClosed,
            DomainEvent::NewIssue { .. } => EventKind::NewIssue,
        }
    }

    /// Order carried by the four order transition events.
    pub fn order(&self) -> Option<&Order> {
        match self {
            DomainEvent::OrderDelivering { order, .. }
            | DomainEvent::OrderSucceeded { order }
            | DomainEvent::OrderFailed { order }
            | DomainEvent::OrderRescheduled { order } => Some(order),
            _ => None,
        }
    }
}
