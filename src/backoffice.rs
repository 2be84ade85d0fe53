//! Back office wiring.
//!
//! Builds every back-office service around one event bus and one transport,
//! backed by the in-memory repositories.

use std::sync::Arc;

use crate::config::Config;
use crate::domain::events::EventBus;
use crate::domain::value_objects::{Assignee, Username};
use crate::monitoring::{DataManager, MonitoringService};
use crate::reporting::{IssueService, NegligenceReporter, NegligenceReports, NegligenceSupervisor};
use crate::repositories::{
    InMemoryIssueRepository, InMemoryNegligenceRepository, InMemoryOrderRepository, InMemorySensorDataRepository,
    NegligenceRepository, OrderRepository, SensorDataRepository,
};
use crate::shipping::{DeliveryService, DroneController, OrderManager};
use crate::transport::Transport;

pub struct BackOffice {
    pub events: EventBus,
    pub orders: OrderManager,
    pub delivery: Arc<DeliveryService>,
    pub monitoring: Arc<MonitoringService>,
    pub drones: DroneController,
    pub data: DataManager,
    pub negligence: NegligenceReports,
    pub supervisor: NegligenceSupervisor,
    pub issues: IssueService,
    _reporter: NegligenceReporter,
    maintainer: Username,
}

impl BackOffice {
    /// Connects the transport, builds the services and starts listening for the
    /// maintainer's issues and the supervised couriers' negligence reports.
    pub async fn start(transport: Arc<dyn Transport>, config: &Config) -> crate::Result<Self> {
        transport.connect().await?;

        let events = EventBus::new();
        let orders: Arc<dyn OrderRepository> = Arc::new(InMemoryOrderRepository::new());
        let readings: Arc<dyn SensorDataRepository> = Arc::new(InMemorySensorDataRepository::new());
        let reports: Arc<dyn NegligenceRepository> = Arc::new(InMemoryNegligenceRepository::new());

        let delivery = Arc::new(DeliveryService::new(orders.clone(), events.clone()));
        let monitoring = Arc::new(MonitoringService::new(
            transport.clone(),
            events.clone(),
            delivery.clone(),
            readings.clone(),
            config.thresholds,
        ));
        let office = Self {
            orders: OrderManager::new(orders),
            drones: DroneController::new(transport.clone(), events.clone(), monitoring.clone()),
            data: DataManager::new(readings),
            negligence: NegligenceReports::new(reports.clone(), events.clone()),
            supervisor: NegligenceSupervisor::new(transport.clone(), events.clone(), reports, Assignee::from(config.maintainer.clone())),
            issues: IssueService::new(transport.clone(), events.clone(), Arc::new(InMemoryIssueRepository::new())),
            _reporter: NegligenceReporter::new(transport, events.clone()),
            maintainer: config.maintainer.clone(),
            delivery,
            monitoring,
            events,
        };

        office.issues.watch(&office.maintainer).await?;
        for courier in &config.supervised_couriers {
            office.supervisor.watch_courier(courier).await?;
        }
        tracing::info!(maintainer = %office.maintainer, couriers = config.supervised_couriers.len(), "Back office started");
        Ok(office)
    }

    pub fn maintainer(&self) -> &Username { &self.maintainer }
}
