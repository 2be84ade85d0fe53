//! Drone-side sensor sources.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::value_objects::Orientation;
use crate::protocol::{Signal, Telemetry};

/// Producer of raw sensor values, sampled once per telemetry tick.
pub trait SensorSuite: Send + Sync {
    fn read_proximity(&mut self) -> f64;
    fn read_accelerometer(&mut self) -> Orientation;
    fn read_camera(&mut self) -> u64;

    /// One sample of every signal, in publication order.
    fn read_all(&mut self) -> [(Signal, Telemetry); 3] {
        [
            (Signal::Proximity, Telemetry::Proximity(self.read_proximity())),
            (Signal::Accelerometer, Telemetry::Accelerometer(self.read_accelerometer())),
            (Signal::Camera, Telemetry::Camera(self.read_camera())),
        ]
    }
}

/// Converts a raw acceleration vector (in g) into degrees.
pub fn orientation_from_acceleration(x: f64, y: f64, z: f64) -> Orientation {
    let pitch = (-x).atan2((y * y + z * z).sqrt()).to_degrees();
    let roll = y.atan2(z).to_degrees();
    let yaw = x.atan2(y).to_degrees();
    Orientation::new(pitch.round() as i32, roll.round() as i32, yaw.round() as i32)
}

/// Random sensor values for a drone without hardware.
pub struct SimulatedSensors {
    rng: StdRng,
}

impl SimulatedSensors {
    pub fn new() -> Self { Self { rng: StdRng::from_entropy() } }
    pub fn seeded(seed: u64) -> Self { Self { rng: StdRng::seed_from_u64(seed) } }
}

impl Default for SimulatedSensors {
    fn default() -> Self { Self::new() }
}

impl SensorSuite for SimulatedSensors {
    fn read_proximity(&mut self) -> f64 {
        (self.rng.gen_range(10.0..250.0_f64) * 10.0).round() / 10.0
    }

    fn read_accelerometer(&mut self) -> Orientation {
        let x = self.rng.gen_range(-0.5..0.5);
        let y = self.rng.gen_range(-0.5..0.5);
        let z = self.rng.gen_range(0.6..1.0);
        orientation_from_acceleration(x, y, z)
    }

    fn read_camera(&mut self) -> u64 {
        self.rng.gen_range(50_000..2_000_000)
    }
}
