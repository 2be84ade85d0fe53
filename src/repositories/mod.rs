//! Repositories
//!
//! Each repository is a trait plus an in-memory implementation. Writes are
//! atomic per document; ordering across documents is the caller's concern.

use thiserror::Error;

pub mod issues;
pub mod negligence;
pub mod orders;
pub mod sensor_data;

pub use issues::{InMemoryIssueRepository, IssueRepository};
pub use negligence::{InMemoryNegligenceRepository, NegligenceRepository};
pub use orders::{InMemoryOrderRepository, OrderRepository};
pub use sensor_data::{InMemorySensorDataRepository, SensorDataRepository};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },
    #[error("{kind} {id} already exists")]
    Duplicate { kind: &'static str, id: String },
}

impl RepositoryError {
    pub(crate) fn not_found(kind: &'static str, id: impl ToString) -> Self { Self::NotFound { kind, id: id.to_string() } }
    pub(crate) fn duplicate(kind: &'static str, id: impl ToString) -> Self { Self::Duplicate { kind, id: id.to_string() } }
}
