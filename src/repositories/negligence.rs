use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;

use super::RepositoryError;
use crate::domain::aggregates::{NegligenceReport, ReportStatus};
use crate::domain::value_objects::{Assignee, NegligenceIdentifier, Negligent};

pub trait NegligenceRepository: Send + Sync {
    fn next_identifier(&self) -> NegligenceIdentifier;
    fn create(&self, report: &NegligenceReport) -> Result<(), RepositoryError>;
    /// Swaps the stored report with the same identifier.
    fn replace(&self, report: &NegligenceReport) -> Result<(), RepositoryError>;
    fn find(&self, id: NegligenceIdentifier) -> Option<NegligenceReport>;
    fn by_negligent(&self, negligent: &Negligent, status: ReportStatus) -> Vec<NegligenceReport>;
    fn by_assignee(&self, assignee: &Assignee, status: ReportStatus) -> Vec<NegligenceReport>;
}

pub struct InMemoryNegligenceRepository {
    reports: RwLock<BTreeMap<NegligenceIdentifier, NegligenceReport>>,
    next_id: Mutex<NegligenceIdentifier>,
}

impl Default for InMemoryNegligenceRepository {
    fn default() -> Self { Self { reports: RwLock::new(BTreeMap::new()), next_id: Mutex::new(NegligenceIdentifier::FIRST) } }
}

impl InMemoryNegligenceRepository {
    pub fn new() -> Self { Self::default() }

    fn filter(&self, keep: impl Fn(&NegligenceReport) -> bool) -> Vec<NegligenceReport> {
        self.reports.read().values().filter(|r| keep(r)).cloned().collect()
    }
}

impl NegligenceRepository for InMemoryNegligenceRepository {
    fn next_identifier(&self) -> NegligenceIdentifier {
        let mut next = self.next_id.lock();
        let id = *next;
        *next = id.next();
        id
    }

    fn create(&self, report: &NegligenceReport) -> Result<(), RepositoryError> {
        let mut reports = self.reports.write();
        if reports.contains_key(&report.id()) { return Err(RepositoryError::duplicate("negligence report", report.id())); }
        reports.insert(report.id(), report.clone());
        Ok(())
    }

    fn replace(&self, report: &NegligenceReport) -> Result<(), RepositoryError> {
        let mut reports = self.reports.write();
        let slot = reports.get_mut(&report.id()).ok_or_else(|| RepositoryError::not_found("negligence report", report.id()))?;
        *slot = report.clone();
        Ok(())
    }

    fn find(&self, id: NegligenceIdentifier) -> Option<NegligenceReport> { self.reports.read().get(&id).cloned() }

    fn by_negligent(&self, negligent: &Negligent, status: ReportStatus) -> Vec<NegligenceReport> {
        self.filter(|r| r.negligent() == negligent && r.status() == status)
    }

    fn by_assignee(&self, assignee: &Assignee, status: ReportStatus) -> Vec<NegligenceReport> {
        self.filter(|r| r.assignee() == assignee && r.status() == status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::EventBus;
    use crate::domain::value_objects::{DroneData, NegligenceActionForm, Orientation};

    #[test]
    fn test_queries_follow_closure() {
        let repo = InMemoryNegligenceRepository::new();
        let (c1, m1) = (Negligent::new("C1").unwrap(), Assignee::new("M1").unwrap());
        let data = DroneData::now(5.0, Orientation::default(), 0).unwrap();
        let report = NegligenceReport::open(repo.next_identifier(), c1.clone(), m1.clone(), data);
        repo.create(&report).unwrap();
        assert!(repo.create(&report).is_err());
        assert_eq!(repo.by_negligent(&c1, ReportStatus::Open).len(), 1);
        assert_eq!(repo.by_assignee(&m1, ReportStatus::Open).len(), 1);

        let closed = report.take_action(NegligenceActionForm::create("fine").unwrap(), &EventBus::new()).unwrap();
        repo.replace(&closed).unwrap();
        assert!(repo.by_negligent(&c1, ReportStatus::Open).is_empty());
        assert!(repo.by_assignee(&m1, ReportStatus::Open).is_empty());
        assert_eq!(repo.by_assignee(&m1, ReportStatus::Closed), vec![closed]);
        assert_eq!(repo.next_identifier().as_u64(), 2);
    }
}
