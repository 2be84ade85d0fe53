//! Reporting: negligence reports and courier issues.
pub mod issue;
pub mod negligence;

pub use issue::IssueService;
pub use negligence::{NegligenceReporter, NegligenceReports, NegligenceSupervisor};
