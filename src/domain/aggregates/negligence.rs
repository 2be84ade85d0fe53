//! Negligence Report Aggregate

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::events::{DomainEvent, EventBus};
use crate::domain::value_objects::{Assignee, DroneData, NegligenceActionForm, NegligenceIdentifier, Negligent};

/// A courier's negligence under review by a maintainer. Open until an action
/// form is attached; closing is terminal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NegligenceReport {
    id: NegligenceIdentifier,
    negligent: Negligent,
    assignee: Assignee,
    data: DroneData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    action_form: Option<NegligenceActionForm>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus { Open, Closed }

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NegligenceError {
    #[error("negligence report {0} is already closed")]
    AlreadyClosed(NegligenceIdentifier),
    #[error("negligence report {0} not found")]
    NotFound(NegligenceIdentifier),
    #[error("negligence report {id} is assigned to {assignee}")]
    NotAssignee { id: NegligenceIdentifier, assignee: Assignee },
}

impl NegligenceReport {
    pub fn open(id: NegligenceIdentifier, negligent: Negligent, assignee: Assignee, data: DroneData) -> Self {
        Self { id, negligent, assignee, data, action_form: None }
    }

    pub fn id(&self) -> NegligenceIdentifier { self.id }
    pub fn negligent(&self) -> &Negligent { &self.negligent }
    pub fn assignee(&self) -> &Assignee { &self.assignee }
    pub fn data(&self) -> &DroneData { &self.data }
    pub fn action_form(&self) -> Option<&NegligenceActionForm> { self.action_form.as_ref() }
    pub fn status(&self) -> ReportStatus { if self.action_form.is_some() { ReportStatus::Closed } else { ReportStatus::Open } }
    pub fn is_open(&self) -> bool { self.status() == ReportStatus::Open }

    /// Produces the closed report carrying `form` and raises `NegligenceReportClosed`.
    pub fn take_action(&self, form: NegligenceActionForm, events: &EventBus) -> Result<NegligenceReport, NegligenceError> {
        if !self.is_open() { return Err(NegligenceError::AlreadyClosed(self.id)); }
        let closed = Self { action_form: Some(form), ..self.clone() };
        events.raise(&DomainEvent::NegligenceReportClosed { report: closed.clone() });
        Ok(closed)
    }
}
