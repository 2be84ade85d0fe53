use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;

use super::RepositoryError;
use crate::domain::aggregates::{Issue, ReportStatus};
use crate::domain::value_objects::{IssueIdentifier, Username};

/// Issue storage. `ReportStatus::Open` selects open and visioned issues.
pub trait IssueRepository: Send + Sync {
    fn next_identifier(&self) -> IssueIdentifier;
    fn create(&self, issue: &Issue) -> Result<(), RepositoryError>;
    fn replace(&self, issue: &Issue) -> Result<(), RepositoryError>;
    fn find(&self, id: IssueIdentifier) -> Option<Issue>;
    fn by_assignee(&self, assignee: &Username, status: ReportStatus) -> Vec<Issue>;
    fn by_courier(&self, courier: &Username, status: ReportStatus) -> Vec<Issue>;
}

pub struct InMemoryIssueRepository {
    issues: RwLock<BTreeMap<IssueIdentifier, Issue>>,
    next_id: Mutex<IssueIdentifier>,
}

impl Default for InMemoryIssueRepository {
    fn default() -> Self { Self { issues: RwLock::new(BTreeMap::new()), next_id: Mutex::new(IssueIdentifier::FIRST) } }
}

impl InMemoryIssueRepository {
    pub fn new() -> Self { Self::default() }

    fn filter(&self, keep: impl Fn(&Issue) -> bool) -> Vec<Issue> {
        self.issues.read().values().filter(|i| keep(i)).cloned().collect()
    }
}

impl IssueRepository for InMemoryIssueRepository {
    fn next_identifier(&self) -> IssueIdentifier {
        let mut next = self.next_id.lock();
        let id = *next;
        *next = id.next();
        id
    }

    fn create(&self, issue: &Issue) -> Result<(), RepositoryError> {
        let mut issues = self.issues.write();
        if issues.contains_key(&issue.id()) { return Err(RepositoryError::duplicate("issue", issue.id())); }
        issues.insert(issue.id(), issue.clone());
        Ok(())
    }

    fn replace(&self, issue: &Issue) -> Result<(), RepositoryError> {
        let mut issues = self.issues.write();
        let slot = issues.get_mut(&issue.id()).ok_or_else(|| RepositoryError::not_found("issue", issue.id()))?;
        *slot = issue.clone();
        Ok(())
    }

    fn find(&self, id: IssueIdentifier) -> Option<Issue> { self.issues.read().get(&id).cloned() }

    fn by_assignee(&self, assignee: &Username, status: ReportStatus) -> Vec<Issue> {
        self.filter(|i| i.assignee() == assignee && i.status() == status)
    }

    fn by_courier(&self, courier: &Username, status: ReportStatus) -> Vec<Issue> {
        self.filter(|i| i.courier() == courier && i.status() == status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::SendingIssue;

    #[test]
    fn test_visioned_issue_is_still_open() {
        let repo = InMemoryIssueRepository::new();
        let (c1, m1) = (Username::new("C1").unwrap(), Username::new("M1").unwrap());
        let issue = Issue::open(repo.next_identifier(), SendingIssue::new("Motor", "hot", c1.clone(), m1.clone(), None).unwrap());
        repo.create(&issue).unwrap();
        let visioned = issue.vision().unwrap();
        repo.replace(&visioned).unwrap();
        assert_eq!(repo.by_assignee(&m1, ReportStatus::Open), vec![visioned.clone()]);
        let closed = visioned.close("replaced motor").unwrap();
        repo.replace(&closed).unwrap();
        assert!(repo.by_courier(&c1, ReportStatus::Open).is_empty());
        assert_eq!(repo.by_courier(&c1, ReportStatus::Closed).len(), 1);
        assert_eq!(repo.find(issue.id()).unwrap().solution(), Some("replaced motor"));
    }
}
