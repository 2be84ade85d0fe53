//! Sensor Alert Classifier

use crate::config::AlertThresholds;
use crate::domain::sensors::{Alert, AlertLevel, AlertType, SensorValue};
use crate::domain::value_objects::Orientation;

/// Maps a single reading to an alert. Stateless: the result depends only on
/// the reading and the thresholds.
#[derive(Clone, Copy, Debug, Default)]
pub struct AlertClassifier {
    thresholds: AlertThresholds,
}

impl AlertClassifier {
    pub fn new(thresholds: AlertThresholds) -> Self { Self { thresholds } }

    pub fn classify(&self, value: &SensorValue) -> Alert {
        match value {
            SensorValue::Proximity { distance } => Alert::new(AlertType::Distance, self.proximity_level(*distance)),
            SensorValue::Accelerometer(orientation) => Alert::new(AlertType::Angle, self.angle_level(orientation)),
            SensorValue::Camera { .. } => Alert::stable(AlertType::Camera),
        }
    }

    /// Smaller distance is more dangerous.
    pub fn proximity_level(&self, distance: f64) -> AlertLevel {
        if distance <= self.thresholds.proximity_critical {
            AlertLevel::Critical
        } else if distance <= self.thresholds.proximity_warning {
            AlertLevel::Warning
        } else {
            AlertLevel::Stable
        }
    }

    /// Only pitch and roll count; yaw is heading, not tilt.
    pub fn angle_level(&self, orientation: &Orientation) -> AlertLevel {
        let tilt = orientation.pitch.unsigned_abs().max(orientation.roll.unsigned_abs());
        if tilt > self.thresholds.angle_critical.unsigned_abs() {
            AlertLevel::Critical
        } else if tilt > self.thresholds.angle_warning.unsigned_abs() {
            AlertLevel::Warning
        } else {
            AlertLevel::Stable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> AlertClassifier { AlertClassifier::default() }

    #[test]
    fn test_accelerometer_levels() {
        let c = classifier();
        assert_eq!(c.angle_level(&Orientation::new(10, 0, 0)), AlertLevel::Stable);
        assert_eq!(c.angle_level(&Orientation::new(0, 35, 0)), AlertLevel::Warning);
        assert_eq!(c.angle_level(&Orientation::new(50, 0, 0)), AlertLevel::Critical);
        assert_eq!(c.angle_level(&Orientation::new(0, -50, 0)), AlertLevel::Critical);
    }

    #[test]
    fn test_yaw_is_ignored() {
        let alert = classifier().classify(&SensorValue::Accelerometer(Orientation::new(10, 0, 50)));
        assert_eq!(alert, Alert::new(AlertType::Angle, AlertLevel::Stable));
    }

    #[test]
    fn test_proximity_levels() {
        let c = classifier();
        assert_eq!(c.proximity_level(55.0), AlertLevel::Stable);
        assert_eq!(c.proximity_level(35.0), AlertLevel::Warning);
        assert_eq!(c.proximity_level(15.0), AlertLevel::Critical);
        assert_eq!(c.proximity_level(25.0), AlertLevel::Critical);
        assert_eq!(c.proximity_level(50.0), AlertLevel::Warning);
    }

    #[test]
    fn test_camera_is_always_stable() {
        let alert = classifier().classify(&SensorValue::Camera { image_size: u64::MAX });
        assert_eq!(alert, Alert::stable(AlertType::Camera));
    }

    #[test]
    fn test_custom_thresholds() {
        let c = AlertClassifier::new(AlertThresholds { proximity_warning: 10.0, proximity_critical: 5.0, angle_warning: 60, angle_critical: 80 });
        assert_eq!(c.proximity_level(15.0), AlertLevel::Stable);
        assert_eq!(c.angle_level(&Orientation::new(50, 0, 0)), AlertLevel::Stable);
    }
}
