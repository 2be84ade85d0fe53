//! Courier issues: submit, review, close.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::domain::aggregates::{Issue, IssueError, ReportStatus, SendingIssue};
use crate::domain::events::{DomainEvent, EventBus};
use crate::domain::value_objects::{IssueIdentifier, Username};
use crate::protocol::{decode_or_log, topics, IssueMessage};
use crate::repositories::IssueRepository;
use crate::transport::{publish_message, Transport, TransportError};

pub struct IssueService {
    transport: Arc<dyn Transport>,
    events: EventBus,
    issues: Arc<dyn IssueRepository>,
    // held from lookup until the transitioned issue is stored
    transitions: Mutex<()>,
}

impl IssueService {
    pub fn new(transport: Arc<dyn Transport>, events: EventBus, issues: Arc<dyn IssueRepository>) -> Self {
        Self { transport, events, issues, transitions: Mutex::new(()) }
    }

    /// Stores the issue as open and notifies its assignee. A failed
    /// notification does not undo the stored issue.
    pub async fn create(&self, sending: SendingIssue) -> crate::Result<Issue> {
        let issue = Issue::open(self.issues.next_identifier(), sending);
        self.issues.create(&issue)?;
        tracing::info!(issue_id = %issue.id(), courier = %issue.courier(), assignee = %issue.assignee(), "Issue opened");
        publish_message(self.transport.as_ref(), &topics::issue(issue.assignee()), &IssueMessage { issue: issue.clone() }).await?;
        Ok(issue)
    }

    pub fn vision(&self, id: IssueIdentifier) -> crate::Result<Issue> {
        let _transition = self.transitions.lock();
        let visioned = self.load(id)?.vision()?;
        self.issues.replace(&visioned)?;
        Ok(visioned)
    }

    pub fn close(&self, id: IssueIdentifier, solution: &str) -> crate::Result<Issue> {
        let _transition = self.transitions.lock();
        let closed = self.load(id)?.close(solution)?;
        self.issues.replace(&closed)?;
        tracing::info!(issue_id = %id, "Issue closed");
        Ok(closed)
    }

    pub fn find(&self, id: IssueIdentifier) -> Option<Issue> { self.issues.find(id) }

    pub fn for_assignee(&self, assignee: &Username, status: ReportStatus) -> Vec<Issue> { self.issues.by_assignee(assignee, status) }

    pub fn for_courier(&self, courier: &Username, status: ReportStatus) -> Vec<Issue> { self.issues.by_courier(courier, status) }

    /// Raises `NewIssue` for every issue announced to `assignee`.
    pub async fn watch(&self, assignee: &Username) -> Result<(), TransportError> {
        let topic = topics::issue(assignee);
        let (events, t) = (self.events.clone(), topic.clone());
        self.transport
            .subscribe(&topic, Arc::new(move |payload: Vec<u8>| {
                if let Some(IssueMessage { issue }) = decode_or_log(&t, &payload) {
                    events.raise(&DomainEvent::NewIssue { issue });
                }
            }))
            .await
    }

    fn load(&self, id: IssueIdentifier) -> Result<Issue, IssueError> {
        self.issues.find(id).ok_or(IssueError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::IssueState;
    use crate::domain::events::EventKind;
    use crate::repositories::InMemoryIssueRepository;
    use crate::transport::MemoryBroker;
    use crate::DeliveryError;
    use std::time::Duration;

    #[tokio::test]
    async fn test_issue_flow_notifies_assignee() {
        let broker = MemoryBroker::new();
        let courier_side: Arc<dyn Transport> = Arc::new(broker.transport());
        let maintainer_side: Arc<dyn Transport> = Arc::new(broker.transport());
        courier_side.connect().await.unwrap();
        maintainer_side.connect().await.unwrap();
        let repo = Arc::new(InMemoryIssueRepository::new());
        let courier_bus = EventBus::new();
        let maintainer_bus = EventBus::new();
        let service = IssueService::new(courier_side, courier_bus, repo.clone());
        let watcher = IssueService::new(maintainer_side, maintainer_bus.clone(), repo.clone());

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        maintainer_bus.register(EventKind::NewIssue, Arc::new(move |e| {
            if let DomainEvent::NewIssue { issue } = e { let _ = tx.send(issue.id()); }
        }));
        let (c1, m1) = (Username::new("C1").unwrap(), Username::new("M1").unwrap());
        watcher.watch(&m1).await.unwrap();

        let issue = service.create(SendingIssue::new("Gimbal", "camera shakes", c1.clone(), m1.clone(), None).unwrap()).await.unwrap();
        assert_eq!(issue.id(), IssueIdentifier::FIRST);
        let notified = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
        assert_eq!(notified, Some(issue.id()));

        assert!(matches!(service.close(issue.id(), "done"), Err(DeliveryError::Issue(IssueError::InvalidTransition { .. }))));
        assert_eq!(service.vision(issue.id()).unwrap().state(), IssueState::Visioned);
        assert_eq!(service.for_assignee(&m1, ReportStatus::Open).len(), 1);
        service.close(issue.id(), "rebalanced").unwrap();
        assert!(service.for_courier(&c1, ReportStatus::Open).is_empty());
        assert_eq!(service.for_courier(&c1, ReportStatus::Closed).len(), 1);
        assert!(matches!(service.vision(IssueIdentifier::new(9).unwrap()), Err(DeliveryError::Issue(IssueError::NotFound(_)))));
    }

    #[test]
    fn test_concurrent_close_keeps_the_first_solution() {
        let broker = MemoryBroker::new();
        let repo = Arc::new(InMemoryIssueRepository::new());
        let service = IssueService::new(Arc::new(broker.transport()), EventBus::new(), repo.clone());
        let sending = SendingIssue::new("Rotor", "noisy", Username::new("C1").unwrap(), Username::new("M1").unwrap(), None).unwrap();
        let issue = Issue::open(repo.next_identifier(), sending);
        repo.create(&issue).unwrap();
        let id = issue.id();
        service.vision(id).unwrap();

        let barrier = std::sync::Barrier::new(8);
        let results: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|n| {
                    let (service, barrier) = (&service, &barrier);
                    scope.spawn(move || {
                        barrier.wait();
                        service.close(id, &format!("fix {n}"))
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1);
        assert_eq!(results.iter().filter(|r| matches!(r, Err(DeliveryError::Issue(IssueError::InvalidTransition { .. })))).count(), 7);
        assert_eq!(repo.find(id).unwrap(), *winners[0]);
    }
}
