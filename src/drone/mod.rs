//! Drone-resident side: run state, travel simulation, sensors and the engine actor.
pub mod engine;
pub mod run_state;
pub mod sensors;
pub mod travel;

pub use engine::{delivery_outcome, DroneEngine, DroneHandle, EngineState};
pub use run_state::{DroneRunState, MoveOrigin};
pub use sensors::{orientation_from_acceleration, SensorSuite, SimulatedSensors};
pub use travel::TravelSimulator;
