//! Telemetry monitoring: classification, alert publication and history.
pub mod classifier;
pub mod history;
pub mod service;

pub use classifier::AlertClassifier;
pub use history::DataManager;
pub use service::MonitoringService;
