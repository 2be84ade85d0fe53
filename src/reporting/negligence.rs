//! Negligence Reporting Workflow
//!
//! ```text
//! CriticalSituation ──► NegligenceReporter ──► negligenceReports<courier>
//!                                                      │
//!                        NegligenceSupervisor ◄────────┘
//!                                │ NewNegligence
//!                                ▼
//!                         Open report stored
//!                                │ take_action
//!                                ▼
//!                        Closed report replaces it
//! ```

use parking_lot::Mutex;
use std::sync::Arc;

use crate::domain::aggregates::{NegligenceError, NegligenceReport, ReportStatus};
use crate::domain::events::{DomainEvent, EventBus, EventHandler, EventKind, HandlerId};
use crate::domain::value_objects::{Assignee, NegligenceActionForm, NegligenceIdentifier, Negligent, Username};
use crate::protocol::{decode_or_log, topics, NegligenceMessage};
use crate::repositories::NegligenceRepository;
use crate::runtime::KeyedExecutor;
use crate::transport::{publish_or_log, Transport, TransportError};

/// Publishes a negligence message for the courier whenever a signal turns critical.
pub struct NegligenceReporter {
    events: EventBus,
    handler: HandlerId,
}

impl NegligenceReporter {
    pub fn new(transport: Arc<dyn Transport>, events: EventBus) -> Self {
        let handler = events.register(EventKind::CriticalSituation, Arc::new(move |event| {
            let DomainEvent::CriticalSituation { order_id, alert_type, courier, snapshot } = event else { return };
            let Some(data) = snapshot.clone() else {
                tracing::warn!(order_id = %order_id, alert_type = %alert_type, "Critical situation without a drone snapshot, no negligence sent");
                return;
            };
            let Ok(runtime) = tokio::runtime::Handle::try_current() else { return };
            let transport = transport.clone();
            let message = NegligenceMessage { negligent: Negligent::from(courier.clone()), data };
            let topic = topics::negligence(courier);
            tracing::info!(order_id = %order_id, courier = %courier, alert_type = %alert_type, "Reporting negligence");
            runtime.spawn(async move { publish_or_log(transport.as_ref(), &topic, &message).await });
        }));
        Self { events, handler }
    }
}

impl Drop for NegligenceReporter {
    fn drop(&mut self) {
        self.events.unregister(EventKind::CriticalSituation, self.handler);
    }
}

/// Maintainer side: watches couriers' negligence topics and files an open
/// report, assigned to this maintainer, for every message.
pub struct NegligenceSupervisor {
    transport: Arc<dyn Transport>,
    events: EventBus,
    assignee: Assignee,
    executor: KeyedExecutor<Username>,
    handler: HandlerId,
}

impl NegligenceSupervisor {
    pub fn new(transport: Arc<dyn Transport>, events: EventBus, reports: Arc<dyn NegligenceRepository>, assignee: Assignee) -> Self {
        let own = assignee.clone();
        let persist: EventHandler = Arc::new(move |event| {
            let DomainEvent::NewNegligence { negligent, assignee, data } = event else { return };
            if *assignee != own { return; }
            let report = NegligenceReport::open(reports.next_identifier(), negligent.clone(), assignee.clone(), data.clone());
            match reports.create(&report) {
                Ok(()) => tracing::info!(report_id = %report.id(), negligent = %negligent, assignee = %assignee, "Negligence report opened"),
                Err(e) => tracing::error!(negligent = %negligent, error = %e, "Failed to store negligence report"),
            }
        });
        let handler = events.register(EventKind::NewNegligence, persist);
        Self { transport, events, assignee, executor: KeyedExecutor::new("negligence"), handler }
    }

    pub fn assignee(&self) -> &Assignee { &self.assignee }

    pub async fn watch_courier(&self, courier: &Username) -> Result<(), TransportError> {
        let topic = topics::negligence(courier);
        let (events, assignee, executor, key) = (self.events.clone(), self.assignee.clone(), self.executor.clone(), courier.clone());
        let t = topic.clone();
        self.transport
            .subscribe(&topic, Arc::new(move |payload: Vec<u8>| {
                let (events, assignee, topic) = (events.clone(), assignee.clone(), t.clone());
                executor.submit(key.clone(), async move {
                    let Some(NegligenceMessage { negligent, data }) = decode_or_log(&topic, &payload) else { return };
                    events.raise(&DomainEvent::NewNegligence { negligent, assignee, data });
                });
            }))
            .await?;
        tracing::info!(courier = %courier, assignee = %self.assignee, "Watching courier for negligence");
        Ok(())
    }

    pub async fn unwatch_courier(&self, courier: &Username) -> Result<(), TransportError> {
        self.executor.retire(courier);
        self.transport.unsubscribe(&topics::negligence(courier)).await
    }
}

impl Drop for NegligenceSupervisor {
    fn drop(&mut self) {
        self.events.unregister(EventKind::NewNegligence, self.handler);
    }
}

/// Queries and resolution of stored reports.
pub struct NegligenceReports {
    reports: Arc<dyn NegligenceRepository>,
    events: EventBus,
    handler: HandlerId,
    // held from lookup until the closed report is stored
    closing: Mutex<()>,
}

impl NegligenceReports {
    pub fn new(reports: Arc<dyn NegligenceRepository>, events: EventBus) -> Self {
        let repo = reports.clone();
        let handler = events.register(EventKind::NegligenceReportClosed, Arc::new(move |event| {
            let DomainEvent::NegligenceReportClosed { report } = event else { return };
            if let Err(e) = repo.replace(report) {
                tracing::error!(report_id = %report.id(), error = %e, "Failed to store closed negligence report");
            }
        }));
        Self { reports, events, handler, closing: Mutex::new(()) }
    }

    /// Closes an open report. Only its assignee may do so, and only the first
    /// of concurrent closes wins.
    pub fn take_action(&self, id: NegligenceIdentifier, assignee: &Assignee, form: NegligenceActionForm) -> crate::Result<NegligenceReport> {
        let _closing = self.closing.lock();
        let report = self.reports.find(id).ok_or(NegligenceError::NotFound(id))?;
        if report.assignee() != assignee {
            return Err(NegligenceError::NotAssignee { id, assignee: report.assignee().clone() }.into());
        }
        let closed = report.take_action(form, &self.events)?;
        tracing::info!(report_id = %id, assignee = %assignee, "Negligence report closed");
        Ok(closed)
    }

    pub fn find(&self, id: NegligenceIdentifier) -> Option<NegligenceReport> { self.reports.find(id) }

    pub fn for_negligent(&self, negligent: &Negligent, status: ReportStatus) -> Vec<NegligenceReport> {
        self.reports.by_negligent(negligent, status)
    }

    pub fn for_assignee(&self, assignee: &Assignee, status: ReportStatus) -> Vec<NegligenceReport> {
        self.reports.by_assignee(assignee, status)
    }
}

impl Drop for NegligenceReports {
    fn drop(&mut self) {
        self.events.unregister(EventKind::NegligenceReportClosed, self.handler);
    }
}
