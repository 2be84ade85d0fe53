//! Wire messages. Each is a flat JSON object whose discriminant field selects
//! the handler branch.

use serde::{Deserialize, Serialize};

use super::codec::WireMessage;
use crate::domain::aggregates::{Issue, Order};
use crate::domain::drone::{DeliveryStatus, DrivingMode, MoveCommand, MovingState};
use crate::domain::sensors::{Alert, AlertLevel, AlertType, SensorValue};
use crate::domain::value_objects::{DroneData, Negligent, Orientation, Username, ValueError, MAX_ANGLE, MIN_ANGLE};

/// Back office → drone, on `sync<droneId>` and then `sync<orderId>`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "sync")]
pub enum SyncMessage {
    #[serde(rename = "perform delivery")]
    PerformDelivery { courier: Username, order: Order },
    #[serde(rename = "callback")]
    Callback,
}

impl WireMessage for SyncMessage {
    const ROUTES: &'static [(&'static str, Option<&'static [&'static str]>)] =
        &[("sync", Some(&["perform delivery", "callback"]))];
}

/// `{"mode": "automatic"|"manual"}` or `{"move": "proceed"|"halt"}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlMessage {
    Mode(DrivingMode),
    Move(MoveCommand),
}

impl WireMessage for ControlMessage {
    const ROUTES: &'static [(&'static str, Option<&'static [&'static str]>)] =
        &[("mode", Some(&["automatic", "manual"])), ("move", Some(&["proceed", "halt"]))];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleMessage {
    pub status: DeliveryStatus,
}

impl WireMessage for LifecycleMessage {
    const ROUTES: &'static [(&'static str, Option<&'static [&'static str]>)] =
        &[("status", Some(&["delivering", "succeeded", "failed", "returning", "returned"]))];
}

/// One telemetry sample: `{"proximity": 12.5}`, `{"accelerometer": {...}}` or `{"camera": 2048}`.
///
/// Decoding rejects a negative or non-finite proximity and any angle outside
/// `[MIN_ANGLE, MAX_ANGLE]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "RawTelemetry")]
pub enum Telemetry {
    Proximity(f64),
    Accelerometer(Orientation),
    Camera(u64),
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum RawTelemetry {
    Proximity(f64),
    Accelerometer(Orientation),
    Camera(u64),
}

impl TryFrom<RawTelemetry> for Telemetry {
    type Error = ValueError;
    fn try_from(raw: RawTelemetry) -> Result<Self, Self::Error> {
        match raw {
            RawTelemetry::Proximity(distance) if !distance.is_finite() || distance < 0.0 => {
                Err(ValueError::InvalidReading(format!("proximity {distance}")))
            }
            RawTelemetry::Proximity(distance) => Ok(Telemetry::Proximity(distance)),
            RawTelemetry::Accelerometer(o) => {
                let angles = [("pitch", o.pitch), ("roll", o.roll), ("yaw", o.yaw)];
                match angles.into_iter().find(|(_, a)| !(MIN_ANGLE..=MAX_ANGLE).contains(a)) {
                    Some((name, angle)) => Err(ValueError::InvalidReading(format!("{name} {angle}"))),
                    None => Ok(Telemetry::Accelerometer(o)),
                }
            }
            RawTelemetry::Camera(image_size) => Ok(Telemetry::Camera(image_size)),
        }
    }
}

impl WireMessage for Telemetry {
    const ROUTES: &'static [(&'static str, Option<&'static [&'static str]>)] =
        &[("proximity", None), ("accelerometer", None), ("camera", None)];
}

impl From<Telemetry> for SensorValue {
    fn from(t: Telemetry) -> Self {
        match t {
            Telemetry::Proximity(distance) => SensorValue::Proximity { distance },
            Telemetry::Accelerometer(orientation) => SensorValue::Accelerometer(orientation),
            Telemetry::Camera(image_size) => SensorValue::Camera { image_size },
        }
    }
}

impl From<SensorValue> for Telemetry {
    fn from(v: SensorValue) -> Self {
        match v {
            SensorValue::Proximity { distance } => Telemetry::Proximity(distance),
            SensorValue::Accelerometer(orientation) => Telemetry::Accelerometer(orientation),
            SensorValue::Camera { image_size } => Telemetry::Camera(image_size),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertMessage {
    pub alert_level: AlertLevel,
    pub alert_type: AlertType,
}

impl WireMessage for AlertMessage {
    const ROUTES: &'static [(&'static str, Option<&'static [&'static str]>)] =
        &[("alertLevel", Some(&["STABLE", "WARNING", "CRITICAL"]))];
}

impl From<Alert> for AlertMessage {
    fn from(alert: Alert) -> Self { Self { alert_level: alert.level, alert_type: alert.alert_type } }
}

/// Courier negligence, on `negligenceReports<courier>`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NegligenceMessage {
    pub negligent: Negligent,
    pub data: DroneData,
}

impl WireMessage for NegligenceMessage {
    const ROUTES: &'static [(&'static str, Option<&'static [&'static str]>)] = &[("negligent", None)];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovingStateMessage {
    pub moving_state: MovingState,
}

impl WireMessage for MovingStateMessage {
    const ROUTES: &'static [(&'static str, Option<&'static [&'static str]>)] =
        &[("movingState", Some(&["MOVING", "STOPPED"]))];
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueMessage {
    pub issue: Issue,
}

impl WireMessage for IssueMessage {
    const ROUTES: &'static [(&'static str, Option<&'static [&'static str]>)] = &[("issue", None)];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::SendingIssue;
    use crate::domain::value_objects::{Client, IssueIdentifier, OrderDate, OrderIdentifier, Product};
    use crate::protocol::codec::{decode, encode};
    use serde_json::json;

    fn order() -> Order {
        let today = OrderDate::parse("2026-10-19").unwrap();
        Order::place(OrderIdentifier::new(42).unwrap(), Product::new("Widget").unwrap(), Client::new("Alice").unwrap(), today, today.plus_days(1)).unwrap()
    }

    fn round_trip<T: WireMessage + PartialEq + std::fmt::Debug>(msg: T) -> serde_json::Value {
        let bytes = encode(&msg).unwrap();
        assert_eq!(decode::<T>(&bytes).unwrap(), Some(msg));
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_sync_messages() {
        let json = round_trip(SyncMessage::PerformDelivery { courier: Username::new("C1").unwrap(), order: order() });
        assert_eq!(json["sync"], "perform delivery");
        assert_eq!(json["courier"], "C1");
        assert_eq!(json["order"]["id"], 42);
        assert_eq!(json["order"]["currentState"], "PLACED");
        assert_eq!(round_trip(SyncMessage::Callback), json!({"sync": "callback"}));
    }

    #[test]
    fn test_control_messages() {
        assert_eq!(round_trip(ControlMessage::Mode(DrivingMode::Manual)), json!({"mode": "manual"}));
        assert_eq!(round_trip(ControlMessage::Move(MoveCommand::Halt)), json!({"move": "halt"}));
        assert_eq!(round_trip(ControlMessage::Move(MoveCommand::Proceed)), json!({"move": "proceed"}));
    }

    #[test]
    fn test_lifecycle_and_moving_state() {
        assert_eq!(round_trip(LifecycleMessage { status: DeliveryStatus::Returned }), json!({"status": "returned"}));
        assert_eq!(round_trip(MovingStateMessage { moving_state: MovingState::Stopped }), json!({"movingState": "STOPPED"}));
    }

    #[test]
    fn test_telemetry_messages() {
        assert_eq!(round_trip(Telemetry::Proximity(12.5)), json!({"proximity": 12.5}));
        assert_eq!(round_trip(Telemetry::Camera(2048)), json!({"camera": 2048}));
        assert_eq!(
            round_trip(Telemetry::Accelerometer(Orientation::new(10, -20, 30))),
            json!({"accelerometer": {"pitch": 10, "roll": -20, "yaw": 30}})
        );
    }

    #[test]
    fn test_out_of_range_telemetry_is_rejected() {
        assert!(decode::<Telemetry>(br#"{"proximity": -5.0}"#).is_err());
        assert!(decode::<Telemetry>(br#"{"accelerometer": {"pitch": 181, "roll": 0, "yaw": 0}}"#).is_err());
        assert!(decode::<Telemetry>(br#"{"accelerometer": {"pitch": 0, "roll": 0, "yaw": -200}}"#).is_err());
        assert_eq!(decode::<Telemetry>(br#"{"proximity": 0.0}"#).unwrap(), Some(Telemetry::Proximity(0.0)));
        assert_eq!(
            decode::<Telemetry>(br#"{"accelerometer": {"pitch": -180, "roll": 180, "yaw": 0}}"#).unwrap(),
            Some(Telemetry::Accelerometer(Orientation::new(-180, 180, 0)))
        );
    }

    #[test]
    fn test_alert_message() {
        let json = round_trip(AlertMessage::from(Alert::new(AlertType::Angle, AlertLevel::Critical)));
        assert_eq!(json, json!({"alertLevel": "CRITICAL", "alertType": "ANGLE"}));
    }

    #[test]
    fn test_negligence_and_issue_messages() {
        let data = DroneData::now(10.0, Orientation::new(50, 0, 0), 512).unwrap();
        let json = round_trip(NegligenceMessage { negligent: Negligent::new("C1").unwrap(), data });
        assert_eq!(json["data"]["pitch"], 50);
        let sending = SendingIssue::new("Battery", "drains fast", Username::new("C1").unwrap(), Username::new("M1").unwrap(), None).unwrap();
        round_trip(IssueMessage { issue: Issue::open(IssueIdentifier::FIRST, sending) });
    }
}
