//! Sensor readings and the alert levels derived from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::value_objects::{OrderIdentifier, Orientation};

/// Severity of one signal at one instant. Ordered from least to most severe.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    #[default]
    Stable,
    Warning,
    Critical,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    Distance,
    Angle,
    Camera,
}

impl AlertType {
    pub const ALL: [AlertType; 3] = [AlertType::Distance, AlertType::Angle, AlertType::Camera];
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::Stable => write!(f, "STABLE"), Self::Warning => write!(f, "WARNING"), Self::Critical => write!(f, "CRITICAL") }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::Distance => write!(f, "DISTANCE"), Self::Angle => write!(f, "ANGLE"), Self::Camera => write!(f, "CAMERA") }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Alert {
    pub alert_type: AlertType,
    pub level: AlertLevel,
}

impl Alert {
    pub fn new(alert_type: AlertType, level: AlertLevel) -> Self { Self { alert_type, level } }
    pub fn stable(alert_type: AlertType) -> Self { Self::new(alert_type, AlertLevel::Stable) }
}

/// Value carried by one sensor reading.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum SensorValue {
    Proximity { distance: f64 },
    Accelerometer(Orientation),
    Camera { image_size: u64 },
}

impl SensorValue {
    pub fn alert_type(&self) -> AlertType {
        match self {
            SensorValue::Proximity { .. } => AlertType::Distance,
            SensorValue::Accelerometer(_) => AlertType::Angle,
            SensorValue::Camera { .. } => AlertType::Camera,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub order_id: OrderIdentifier,
    pub detected_at: DateTime<Utc>,
    pub value: SensorValue,
}

impl SensorReading {
    pub fn new(order_id: OrderIdentifier, value: SensorValue) -> Self {
        Self { order_id, detected_at: Utc::now(), value }
    }
}
