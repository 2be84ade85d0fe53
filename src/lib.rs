//! Drone Delivery Coordination
//!
//! Back office and drone-resident engine exchanging JSON messages over
//! publish/subscribe topics.
//!
//! ## Features
//! - Order lifecycle (placed, delivering, succeeded/failed, rescheduled)
//! - Drone travel engine with halt/proceed and driving modes
//! - Telemetry classification into stable/warning/critical alerts
//! - Negligence reports and courier issues
//! - In-process event bus decoupling transitions from persistence

pub mod api;
pub mod backoffice;
pub mod config;
pub mod domain;
pub mod drone;
pub mod logging;
pub mod monitoring;
pub mod protocol;
pub mod reporting;
pub mod repositories;
pub mod runtime;
pub mod shipping;
pub mod transport;

use thiserror::Error;

// =============================================================================
// Re-exports
// =============================================================================

pub use backoffice::BackOffice;
pub use config::{AlertThresholds, Config, DroneConfig};
pub use domain::aggregates::{Issue, IssueError, NegligenceError, NegligenceReport, Order, OrderError, OrderState};
pub use domain::events::{DomainEvent, EventBus, EventKind};
pub use domain::value_objects::ValueError;
pub use protocol::CodecError;
pub use repositories::RepositoryError;
pub use runtime::ExecutorError;
pub use transport::{Transport, TransportError};

// =============================================================================
// Errors
// =============================================================================

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    #[error("Invalid value: {0}")]
    Value(#[from] ValueError),

    #[error("Negligence error: {0}")]
    Negligence(#[from] NegligenceError),

    #[error("Issue error: {0}")]
    Issue(#[from] IssueError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Executor error: {0}")]
    Executor(#[from] ExecutorError),
}

pub type Result<T> = std::result::Result<T, DeliveryError>;
