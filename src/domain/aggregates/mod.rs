//! Aggregates module
pub mod order;
pub mod negligence;
pub mod issue;

pub use order::{Order, OrderError, OrderState};
pub use negligence::{NegligenceError, NegligenceReport, ReportStatus};
pub use issue::{Issue, IssueError, IssueState, SendingIssue};
