//! Topic names: prefix followed by the correlation id.

use serde::Deserialize;
use std::fmt;

use crate::domain::sensors::AlertType;

pub const SYNC: &str = "sync";
pub const CONTROL: &str = "control";
pub const LIFECYCLE: &str = "lifecycle";
pub const DATA: &str = "data";
pub const ALERT: &str = "alertLevel";
pub const MOVING_STATE: &str = "movingStateChange";
pub const ISSUE: &str = "issue";
pub const NEGLIGENCE: &str = "negligenceReports";

/// Telemetry signal, one data topic each.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal { Proximity, Accelerometer, Camera }

impl Signal {
    pub const ALL: [Signal; 3] = [Signal::Proximity, Signal::Accelerometer, Signal::Camera];

    pub fn name(&self) -> &'static str {
        match self { Self::Proximity => "proximity", Self::Accelerometer => "accelerometer", Self::Camera => "camera" }
    }

    /// The alert family a reading of this signal is classified into.
    pub fn alert_type(&self) -> AlertType {
        match self { Self::Proximity => AlertType::Distance, Self::Accelerometer => AlertType::Angle, Self::Camera => AlertType::Camera }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

/// Delivery commands. Keyed by drone id until the drone is assigned, then by order id.
pub fn sync(correlation: impl fmt::Display) -> String { format!("{SYNC}{correlation}") }
pub fn control(order_id: impl fmt::Display) -> String { format!("{CONTROL}{order_id}") }
pub fn lifecycle(order_id: impl fmt::Display) -> String { format!("{LIFECYCLE}{order_id}") }
pub fn data(order_id: impl fmt::Display, signal: Signal) -> String { format!("{DATA}{order_id}.{signal}") }
pub fn alert(order_id: impl fmt::Display) -> String { format!("{ALERT}{order_id}") }
pub fn moving_state(order_id: impl fmt::Display) -> String { format!("{MOVING_STATE}{order_id}") }
pub fn issue(assignee: impl fmt::Display) -> String { format!("{ISSUE}{assignee}") }
pub fn negligence(courier: impl fmt::Display) -> String { format!("{NEGLIGENCE}{courier}") }
