//! Telemetry history, per order and signal.

use parking_lot::RwLock;
use std::collections::HashMap;

use crate::domain::sensors::{AlertType, SensorReading};
use crate::domain::value_objects::OrderIdentifier;

pub trait SensorDataRepository: Send + Sync {
    fn save(&self, reading: SensorReading);
    /// Readings of one signal in arrival order.
    fn history(&self, order_id: OrderIdentifier, signal: AlertType) -> Vec<SensorReading>;
    fn latest(&self, order_id: OrderIdentifier, signal: AlertType) -> Option<SensorReading>;
}

#[derive(Default)]
pub struct InMemorySensorDataRepository {
    readings: RwLock<HashMap<(OrderIdentifier, AlertType), Vec<SensorReading>>>,
}

impl InMemorySensorDataRepository {
    pub fn new() -> Self { Self::default() }
}

impl SensorDataRepository for InMemorySensorDataRepository {
    fn save(&self, reading: SensorReading) {
        self.readings.write().entry((reading.order_id, reading.value.alert_type())).or_default().push(reading);
    }

    fn history(&self, order_id: OrderIdentifier, signal: AlertType) -> Vec<SensorReading> {
        self.readings.read().get(&(order_id, signal)).cloned().unwrap_or_default()
    }

    fn latest(&self, order_id: OrderIdentifier, signal: AlertType) -> Option<SensorReading> {
        self.readings.read().get(&(order_id, signal)).and_then(|r| r.last().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sensors::SensorValue;

    #[test]
    fn test_history_is_split_per_signal() {
        let repo = InMemorySensorDataRepository::new();
        let id = OrderIdentifier::FIRST;
        repo.save(SensorReading::new(id, SensorValue::Proximity { distance: 80.0 }));
        repo.save(SensorReading::new(id, SensorValue::Camera { image_size: 10 }));
        repo.save(SensorReading::new(id, SensorValue::Proximity { distance: 20.0 }));
        assert_eq!(repo.history(id, AlertType::Distance).len(), 2);
        assert_eq!(repo.latest(id, AlertType::Distance).unwrap().value, SensorValue::Proximity { distance: 20.0 });
        assert!(repo.latest(id, AlertType::Angle).is_none());
        assert!(repo.history(OrderIdentifier::new(2).unwrap(), AlertType::Camera).is_empty());
    }
}
