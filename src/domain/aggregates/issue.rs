//! Issue Aggregate
//!
//! Courier-submitted free-text report: Sending → Open → Visioned → Closed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::negligence::ReportStatus;
use crate::domain::value_objects::{DroneId, IssueIdentifier, Username, ValueError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState { Open, Visioned, Closed }

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IssueError {
    #[error("issue {id} cannot be {action} while {state:?}")]
    InvalidTransition { id: IssueIdentifier, state: IssueState, action: &'static str },
    #[error("issue {0} not found")]
    NotFound(IssueIdentifier),
    #[error(transparent)]
    Value(#[from] ValueError),
}

/// Issue written by a courier but not yet stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendingIssue {
    subject: String,
    details: String,
    courier: Username,
    assignee: Username,
    drone_id: Option<DroneId>,
    reporting_date: DateTime<Utc>,
}

impl SendingIssue {
    pub fn new(subject: impl Into<String>, details: impl Into<String>, courier: Username, assignee: Username, drone_id: Option<DroneId>) -> Result<Self, IssueError> {
        let subject = subject.into().trim().to_string();
        if subject.is_empty() { return Err(ValueError::Empty("subject").into()); }
        let details = details.into().trim().to_string();
        if details.is_empty() { return Err(ValueError::Empty("details").into()); }
        Ok(Self { subject, details, courier, assignee, drone_id, reporting_date: Utc::now() })
    }

    pub fn assignee(&self) -> &Username { &self.assignee }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    id: IssueIdentifier,
    subject: String,
    details: String,
    courier: Username,
    assignee: Username,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    drone_id: Option<DroneId>,
    reporting_date: DateTime<Utc>,
    state: IssueState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    solution: Option<String>,
}

impl Issue {
    /// Stored form of a sending issue under its repository-assigned id.
    pub fn open(id: IssueIdentifier, sending: SendingIssue) -> Self {
        Self {
            id,
            subject: sending.subject,
            details: sending.details,
            courier: sending.courier,
            assignee: sending.assignee,
            drone_id: sending.drone_id,
            reporting_date: sending.reporting_date,
            state: IssueState::Open,
            solution: None,
        }
    }

    pub fn id(&self) -> IssueIdentifier { self.id }
    pub fn subject(&self) -> &str { &self.subject }
    pub fn details(&self) -> &str { &self.details }
    pub fn courier(&self) -> &Username { &self.courier }
    pub fn assignee(&self) -> &Username { &self.assignee }
    pub fn drone_id(&self) -> Option<&DroneId> { self.drone_id.as_ref() }
    pub fn reporting_date(&self) -> DateTime<Utc> { self.reporting_date }
    pub fn state(&self) -> IssueState { self.state }
    pub fn solution(&self) -> Option<&str> { self.solution.as_deref() }
    /// Open and visioned issues both count as open.
    pub fn status(&self) -> ReportStatus { if self.state == IssueState::Closed { ReportStatus::Closed } else { ReportStatus::Open } }

    /// The maintainer has seen the issue.
    pub fn vision(&self) -> Result<Issue, IssueError> {
        if self.state != IssueState::Open {
            return Err(IssueError::InvalidTransition { id: self.id, state: self.state, action: "visioned" });
        }
        Ok(Self { state: IssueState::Visioned, ..self.clone() })
    }

    pub fn close(&self, solution: impl Into<String>) -> Result<Issue, IssueError> {
        if self.state != IssueState::Visioned {
            return Err(IssueError::InvalidTransition { id: self.id, state: self.state, action: "closed" });
        }
        let solution = solution.into().trim().to_string();
        if solution.is_empty() { return Err(ValueError::Empty("solution").into()); }
        Ok(Self { state: IssueState::Closed, solution: Some(solution), ..self.clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sending() -> SendingIssue {
        SendingIssue::new("Propeller", "noisy rotor", Username::new("C1").unwrap(), Username::new("M1").unwrap(), None).unwrap()
    }

    #[test]
    fn test_issue_lifecycle() {
        let open = Issue::open(IssueIdentifier::FIRST, sending());
        assert_eq!(open.state(), IssueState::Open);
        assert!(open.close("fixed").is_err());
        let visioned = open.vision().unwrap();
        assert!(visioned.vision().is_err());
        assert!(visioned.close("  ").is_err());
        let closed = visioned.close("fixed").unwrap();
        assert_eq!(closed.state(), IssueState::Closed);
        assert_eq!(closed.solution(), Some("fixed"));
    }

    #[test]
    fn test_sending_issue_requires_text() {
        let c = Username::new("C1").unwrap();
        assert!(SendingIssue::new("", "x", c.clone(), c.clone(), None).is_err());
        assert!(SendingIssue::new("x", " ", c.clone(), c, None).is_err());
    }
}
