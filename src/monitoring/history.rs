//! Read side of the telemetry history.

use std::sync::Arc;

use crate::domain::sensors::{AlertType, SensorReading, SensorValue};
use crate::domain::value_objects::{DroneData, OrderIdentifier, Orientation};
use crate::repositories::SensorDataRepository;

pub struct DataManager {
    readings: Arc<dyn SensorDataRepository>,
}

impl DataManager {
    pub fn new(readings: Arc<dyn SensorDataRepository>) -> Self { Self { readings } }

    pub fn history(&self, order_id: OrderIdentifier, signal: AlertType) -> Vec<SensorReading> {
        self.readings.history(order_id, signal)
    }

    /// Snapshot assembled from the latest reading of each signal.
    pub fn latest_snapshot(&self, order_id: OrderIdentifier) -> Option<DroneData> {
        let proximity = match self.readings.latest(order_id, AlertType::Distance)?.value {
            SensorValue::Proximity { distance } => distance,
            _ => return None,
        };
        let orientation = match self.readings.latest(order_id, AlertType::Angle).map(|r| r.value) {
            Some(SensorValue::Accelerometer(o)) => o,
            _ => Orientation::default(),
        };
        let image_size = match self.readings.latest(order_id, AlertType::Camera).map(|r| r.value) {
            Some(SensorValue::Camera { image_size }) => image_size,
            _ => 0,
        };
        DroneData::now(proximity, orientation, image_size).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::InMemorySensorDataRepository;

    #[test]
    fn test_latest_snapshot_needs_proximity() {
        let repo = Arc::new(InMemorySensorDataRepository::new());
        let data = DataManager::new(repo.clone());
        let id = OrderIdentifier::FIRST;
        repo.save(SensorReading::new(id, SensorValue::Accelerometer(Orientation::new(5, 6, 7))));
        assert!(data.latest_snapshot(id).is_none());
        repo.save(SensorReading::new(id, SensorValue::Proximity { distance: 42.0 }));
        let snapshot = data.latest_snapshot(id).unwrap();
        assert_eq!(snapshot.proximity(), 42.0);
        assert_eq!(snapshot.orientation(), Orientation::new(5, 6, 7));
        assert_eq!(snapshot.image_size(), 0);
        assert_eq!(data.history(id, AlertType::Angle).len(), 1);
    }
}
