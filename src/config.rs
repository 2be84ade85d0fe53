//! Runtime configuration
//!
//! Every value can be overridden through the environment:
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | NATS_URL | nats://127.0.0.1:4222 | broker address |
//! | PORT | 8083 | back-office HTTP port |
//! | DRONE_ID | random UUID | identity of the drone binary |
//! | MAINTAINER | maintainer | assignee of negligence reports |
//! | SUPERVISED_COURIERS | (none) | comma-separated couriers watched by the maintainer |
//! | TELEMETRY_PERIOD_MS | 200 | telemetry loop period |
//! | TRAVEL_TICK_MS | 50 | travel tick period |
//! | TRAVEL_DURATION_MS | 6000 | duration of one leg |
//! | DELIVERY_SUCCESS_PROBABILITY | 0.7 | chance the outbound leg succeeds |
//! | PROXIMITY_WARNING | 50 | distance at or under which proximity warns |
//! | PROXIMITY_CRITICAL | 25 | distance at or under which proximity is critical |
//! | ANGLE_WARNING | 30 | tilt over which the accelerometer warns |
//! | ANGLE_CRITICAL | 45 | tilt over which the accelerometer is critical |

use std::str::FromStr;
use std::time::Duration;

use crate::domain::value_objects::{DroneId, Username, ValueError};

#[derive(Debug, Clone)]
pub struct Config {
    pub nats_url: String,
    pub http_port: u16,
    pub maintainer: Username,
    pub supervised_couriers: Vec<Username>,
    pub thresholds: AlertThresholds,
    pub drone: DroneConfig,
}

/// Limits used by the alert classifier. Proximity compares `<=`, angles compare `>`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertThresholds {
    pub proximity_warning: f64,
    pub proximity_critical: f64,
    pub angle_warning: i32,
    pub angle_critical: i32,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self { proximity_warning: 50.0, proximity_critical: 25.0, angle_warning: 30, angle_critical: 45 }
    }
}

/// Settings of the drone-resident engine.
#[derive(Debug, Clone)]
pub struct DroneConfig {
    pub drone_id: DroneId,
    pub telemetry_period: Duration,
    pub travel_tick: Duration,
    pub leg_duration: Duration,
    pub success_probability: f64,
    /// Readings the drone halts itself on.
    pub thresholds: AlertThresholds,
}

impl DroneConfig {
    pub fn new(drone_id: DroneId) -> Self {
        Self {
            drone_id,
            telemetry_period: Duration::from_millis(200),
            travel_tick: Duration::from_millis(50),
            leg_duration: Duration::from_millis(6000),
            success_probability: 0.7,
            thresholds: AlertThresholds::default(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ValueError> {
        let defaults = AlertThresholds::default();
        let thresholds = AlertThresholds {
            proximity_warning: env_or("PROXIMITY_WARNING", defaults.proximity_warning),
            proximity_critical: env_or("PROXIMITY_CRITICAL", defaults.proximity_critical),
            angle_warning: env_or("ANGLE_WARNING", defaults.angle_warning),
            angle_critical: env_or("ANGLE_CRITICAL", defaults.angle_critical),
        };

        let drone_id = match std::env::var("DRONE_ID").ok().filter(|id| !id.trim().is_empty()) {
            Some(id) => DroneId::new(id)?,
            None => DroneId::new(uuid::Uuid::new_v4().to_string())?,
        };
        let base = DroneConfig::new(drone_id);
        let drone = DroneConfig {
            telemetry_period: Duration::from_millis(env_or("TELEMETRY_PERIOD_MS", 200)),
            travel_tick: Duration::from_millis(env_or("TRAVEL_TICK_MS", 50)),
            leg_duration: Duration::from_millis(env_or("TRAVEL_DURATION_MS", 6000)),
            success_probability: env_or("DELIVERY_SUCCESS_PROBABILITY", base.success_probability).clamp(0.0, 1.0),
            thresholds,
            ..base
        };

        Ok(Self {
            nats_url: std::env::var("NATS_URL").unwrap_or_else(|_| "nats://127.0.0.1:4222".into()),
            http_port: env_or("PORT", 8083),
            maintainer: Username::new(std::env::var("MAINTAINER").unwrap_or_else(|_| "maintainer".into()))?,
            supervised_couriers: std::env::var("SUPERVISED_COURIERS")
                .map(|list| parse_usernames(&list))
                .unwrap_or_default(),
            thresholds,
            drone,
        })
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn parse_usernames(list: &str) -> Vec<Username> {
    list.split(',').filter_map(|name| Username::new(name).ok()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let t = AlertThresholds::default();
        assert_eq!(t.proximity_warning, 50.0);
        assert_eq!(t.proximity_critical, 25.0);
        assert_eq!(t.angle_warning, 30);
        assert_eq!(t.angle_critical, 45);
    }

    #[test]
    fn test_parse_usernames_skips_blanks() {
        let names = parse_usernames("C1, ,C2,");
        assert_eq!(names.iter().map(|n| n.as_str()).collect::<Vec<_>>(), vec!["C1", "C2"]);
    }

    #[test]
    fn test_drone_defaults() {
        let cfg = DroneConfig::new(DroneId::new("D1").unwrap());
        assert_eq!(cfg.telemetry_period, Duration::from_millis(200));
        assert_eq!(cfg.travel_tick, Duration::from_millis(50));
        assert_eq!(cfg.leg_duration, Duration::from_secs(6));
        assert_eq!(cfg.success_probability, 0.7);
        assert_eq!(cfg.thresholds, AlertThresholds::default());
    }
}
