//! Negligence-time drone snapshot and the maintainer's action form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ValueError;

pub const MIN_ANGLE: i32 = -180;
pub const MAX_ANGLE: i32 = 180;

/// Attitude of the drone, in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Orientation {
    pub pitch: i32,
    pub roll: i32,
    pub yaw: i32,
}

impl Orientation {
    pub fn new(pitch: i32, roll: i32, yaw: i32) -> Self { Self { pitch, roll, yaw } }
}

/// Sensor snapshot attached to a negligence report.
///
/// Proximity and image size are non-negative, every angle lies in
/// `[MIN_ANGLE, MAX_ANGLE]`. Deserialization goes through the same check.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDroneData", into = "RawDroneData")]
pub struct DroneData {
    detection_instant: DateTime<Utc>,
    proximity: f64,
    orientation: Orientation,
    image_size: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDroneData {
    detection_instant: DateTime<Utc>,
    proximity: f64,
    roll: i32,
    pitch: i32,
    yaw: i32,
    image_size: u64,
}

impl DroneData {
    pub fn new(detection_instant: DateTime<Utc>, proximity: f64, orientation: Orientation, image_size: u64) -> Result<Self, ValueError> {
        if !proximity.is_finite() || proximity < 0.0 {
            return Err(ValueError::InvalidDroneData(format!("proximity {proximity}")));
        }
        for (name, angle) in [("roll", orientation.roll), ("pitch", orientation.pitch), ("yaw", orientation.yaw)] {
            if !(MIN_ANGLE..=MAX_ANGLE).contains(&angle) {
                return Err(ValueError::InvalidDroneData(format!("{name} {angle}")));
            }
        }
        Ok(Self { detection_instant, proximity, orientation, image_size })
    }

    /// Snapshot stamped with the current instant.
    pub fn now(proximity: f64, orientation: Orientation, image_size: u64) -> Result<Self, ValueError> {
        Self::new(Utc::now(), proximity, orientation, image_size)
    }

    pub fn detection_instant(&self) -> DateTime<Utc> { self.detection_instant }
    pub fn proximity(&self) -> f64 { self.proximity }
    pub fn orientation(&self) -> Orientation { self.orientation }
    pub fn image_size(&self) -> u64 { self.image_size }
}

impl TryFrom<RawDroneData> for DroneData {
    type Error = ValueError;
    fn try_from(raw: RawDroneData) -> Result<Self, Self::Error> {
        Self::new(raw.detection_instant, raw.proximity, Orientation::new(raw.pitch, raw.roll, raw.yaw), raw.image_size)
    }
}

impl From<DroneData> for RawDroneData {
    fn from(data: DroneData) -> Self {
        Self {
            detection_instant: data.detection_instant,
            proximity: data.proximity,
            roll: data.orientation.roll,
            pitch: data.orientation.pitch,
            yaw: data.orientation.yaw,
            image_size: data.image_size,
        }
    }
}

/// Resolution a maintainer attaches to close a negligence report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawActionForm", into = "RawActionForm")]
pub struct NegligenceActionForm {
    solution: String,
    closing_instant: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawActionForm {
    solution: String,
    closing_instant: DateTime<Utc>,
}

impl NegligenceActionForm {
    pub fn new(solution: impl Into<String>, closing_instant: DateTime<Utc>) -> Result<Self, ValueError> {
        let solution = solution.into().trim().to_string();
        if solution.is_empty() { return Err(ValueError::Empty("solution")); }
        Ok(Self { solution, closing_instant })
    }

    /// Form closed at the current instant.
    pub fn create(solution: impl Into<String>) -> Result<Self, ValueError> { Self::new(solution, Utc::now()) }

    pub fn solution(&self) -> &str { &self.solution }
    pub fn closing_instant(&self) -> DateTime<Utc> { self.closing_instant }
}

impl TryFrom<RawActionForm> for NegligenceActionForm {
    type Error = ValueError;
    fn try_from(raw: RawActionForm) -> Result<Self, Self::Error> { Self::new(raw.solution, raw.closing_instant) }
}

impl From<NegligenceActionForm> for RawActionForm {
    fn from(form: NegligenceActionForm) -> Self {
        Self { solution: form.solution, closing_instant: form.closing_instant }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drone_data_rejects_out_of_range() {
        assert!(DroneData::now(-1.0, Orientation::default(), 0).is_err());
        assert!(DroneData::now(10.0, Orientation::new(0, 181, 0), 0).is_err());
        assert!(DroneData::now(10.0, Orientation::new(-180, 180, 0), 0).is_ok());
        assert!(DroneData::now(f64::NAN, Orientation::default(), 0).is_err());
    }

    #[test]
    fn test_drone_data_json_is_flat_and_validated() {
        let data = DroneData::now(12.5, Orientation::new(1, 2, 3), 2048).unwrap();
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["roll"], 2);
        assert_eq!(json["imageSize"], 2048);

        let mut bad = json.clone();
        bad["yaw"] = serde_json::json!(270);
        assert!(serde_json::from_value::<DroneData>(bad).is_err());
        assert_eq!(serde_json::from_value::<DroneData>(json).unwrap(), data);
    }

    #[test]
    fn test_action_form_requires_solution() {
        assert_eq!(NegligenceActionForm::create("  "), Err(ValueError::Empty("solution")));
        assert_eq!(NegligenceActionForm::create(" replaced rotor ").unwrap().solution(), "replaced rotor");
    }
}
