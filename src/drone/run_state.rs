//! Drone run state: assignment, driving mode and movement.

use crate::domain::drone::{DrivingMode, MovementState};
use crate::domain::value_objects::{DroneId, OrderIdentifier};

/// Who asked the drone to move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveOrigin {
    /// A `proceed` command from the back office. Honoured in any mode.
    Remote,
    /// The drone starting a leg on its own. Ignored in manual mode.
    Autonomous,
}

#[derive(Clone, Debug)]
pub struct DroneRunState {
    drone_id: DroneId,
    assigned_order: Option<OrderIdentifier>,
    mode: DrivingMode,
    movement: MovementState,
}

impl DroneRunState {
    pub fn new(drone_id: DroneId) -> Self {
        Self { drone_id, assigned_order: None, mode: DrivingMode::default(), movement: MovementState::default() }
    }

    pub fn drone_id(&self) -> &DroneId { &self.drone_id }
    pub fn assigned_order(&self) -> Option<OrderIdentifier> { self.assigned_order }
    pub fn mode(&self) -> DrivingMode { self.mode }
    pub fn movement(&self) -> MovementState { self.movement }

    /// A drone carries one order at a time. Returns false if another order is assigned.
    pub fn assign(&mut self, order_id: OrderIdentifier) -> bool {
        match self.assigned_order {
            Some(current) if current != order_id => false,
            _ => {
                self.assigned_order = Some(order_id);
                true
            }
        }
    }

    /// Returns true when the drone started moving.
    pub fn proceed(&mut self, origin: MoveOrigin) -> bool {
        if origin == MoveOrigin::Autonomous && self.mode == DrivingMode::Manual {
            return false;
        }
        self.set_movement(MovementState::Proceeding)
    }

    /// Returns true when the drone stopped.
    pub fn halt(&mut self) -> bool { self.set_movement(MovementState::Halted) }

    /// Switching to manual stops the drone; returns true in that case.
    pub fn change_mode(&mut self, mode: DrivingMode) -> bool {
        self.mode = mode;
        mode == DrivingMode::Manual && self.halt()
    }

    fn set_movement(&mut self, movement: MovementState) -> bool {
        let changed = self.movement != movement;
        self.movement = movement;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> DroneRunState { DroneRunState::new(DroneId::new("D1").unwrap()) }

    #[test]
    fn test_manual_mode_never_self_starts() {
        let mut s = state();
        assert!(!s.change_mode(DrivingMode::Manual));
        assert!(!s.proceed(MoveOrigin::Autonomous));
        assert_eq!(s.movement(), MovementState::Halted);
        assert!(s.proceed(MoveOrigin::Remote));
        assert_eq!(s.movement(), MovementState::Proceeding);
    }

    #[test]
    fn test_switch_to_manual_halts() {
        let mut s = state();
        assert!(s.proceed(MoveOrigin::Autonomous));
        assert!(!s.proceed(MoveOrigin::Remote));
        assert!(s.change_mode(DrivingMode::Manual));
        assert_eq!(s.movement(), MovementState::Halted);
        assert!(!s.halt());
        assert!(!s.change_mode(DrivingMode::Automatic));
    }

    #[test]
    fn test_single_assignment() {
        let mut s = state();
        let (a, b) = (OrderIdentifier::FIRST, OrderIdentifier::FIRST.next());
        assert!(s.assign(a));
        assert!(s.assign(a));
        assert!(!s.assign(b));
        assert_eq!(s.assigned_order(), Some(a));
    }
}
