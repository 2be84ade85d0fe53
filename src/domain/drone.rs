//! Drone-facing vocabulary shared by the back office and the drone engine.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrivingMode {
    #[default]
    Automatic,
    Manual,
}

/// Remote movement command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveCommand {
    Proceed,
    Halt,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementState {
    #[default]
    Halted,
    Proceeding,
}

/// Movement state as announced on the moving-state topic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovingState {
    Moving,
    Stopped,
}

impl From<MovementState> for MovingState {
    fn from(state: MovementState) -> Self {
        match state { MovementState::Proceeding => MovingState::Moving, MovementState::Halted => MovingState::Stopped }
    }
}

/// Delivery progress reported by a drone on the lifecycle topic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Delivering,
    Succeeded,
    Failed,
    Returning,
    Returned,
}

impl DeliveryStatus {
    pub fn is_outcome(&self) -> bool { matches!(self, Self::Succeeded | Self::Failed) }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Delivering => "delivering",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Returning => "returning",
            Self::Returned => "returned",
        };
        f.write_str(s)
    }
}

impl fmt::Display for DrivingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::Automatic => write!(f, "automatic"), Self::Manual => write!(f, "manual") }
    }
}
