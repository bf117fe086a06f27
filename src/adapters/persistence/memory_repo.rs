//! In-memory store. Implements every storage port without SQLite.
//!
//! Used by tests. Supports fault injection so interrupted runs can be simulated: a write
//! for a chosen company fails without touching the edge map, like a rolled-back transaction.

use crate::domain::{
    CoEmploymentEdge, Company, CompanyCandidate, CompanyId, DomainError, EmploymentRecord,
    PersonId, SizeBound,
};
use crate::ports::{
    CompanySelectorPort, EdgeWriterPort, EmploymentImportPort, EmploymentReader, GraphStatsPort,
};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

type EdgeKey = (PersonId, PersonId, CompanyId);

#[derive(Debug, Default)]
struct MemoryState {
    companies: BTreeMap<CompanyId, String>,
    employment: Vec<EmploymentRecord>,
    edges: BTreeMap<EdgeKey, Option<i32>>,
}

#[derive(Debug, Default)]
pub struct MemoryRepo {
    state: RwLock<MemoryState>,
    /// Companies whose next write fails.
    fail_on: RwLock<HashSet<CompanyId>>,
    /// Successful edge-set writes allowed before every further write fails.
    fail_after_commits: RwLock<Option<usize>>,
    commits: AtomicUsize,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next write for `company_id` fail with a store error.
    pub async fn fail_on_company(&self, company_id: CompanyId) {
        self.fail_on.write().await.insert(company_id);
    }

    /// Allow `n` more successful company commits, then fail every write (lost connection).
    pub async fn fail_after_commits(&self, n: usize) {
        let done = self.commits.load(Ordering::SeqCst);
        *self.fail_after_commits.write().await = Some(done + n);
    }

    /// Restore normal behavior.
    pub async fn heal(&self) {
        self.fail_on.write().await.clear();
        *self.fail_after_commits.write().await = None;
    }

    /// Number of successful company commits so far.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Snapshot of every edge, ordered by key. Zero-pair markers are left out.
    pub async fn all_edges(&self) -> Vec<CoEmploymentEdge> {
        let state = self.state.read().await;
        state
            .edges
            .iter()
            .map(|(&(src, dst, company_id), &overlap_months)| CoEmploymentEdge {
                src_person_id: src,
                dst_person_id: dst,
                company_id,
                overlap_months,
            })
            .filter(|e| !e.is_zero_pair_marker())
            .collect()
    }

    async fn check_fault(&self, company_id: CompanyId) -> Result<(), DomainError> {
        if self.fail_on.write().await.remove(&company_id) {
            return Err(DomainError::Store(format!(
                "injected failure for company {}",
                company_id
            )));
        }
        if let Some(limit) = *self.fail_after_commits.read().await {
            if self.commits.load(Ordering::SeqCst) >= limit {
                return Err(DomainError::Store("injected connection loss".into()));
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl CompanySelectorPort for MemoryRepo {
    async fn select_unprocessed(
        &self,
        bound: SizeBound,
    ) -> Result<Vec<CompanyCandidate>, DomainError> {
        let state = self.state.read().await;
        let processed: HashSet<CompanyId> = state.edges.keys().map(|&(_, _, c)| c).collect();

        let mut people: HashMap<CompanyId, BTreeSet<PersonId>> = HashMap::new();
        for r in &state.employment {
            if let Some(company_id) = r.company_id {
                people.entry(company_id).or_default().insert(r.person_id);
            }
        }

        let mut candidates: Vec<CompanyCandidate> = people
            .into_iter()
            .filter(|(company_id, persons)| {
                !processed.contains(company_id) && bound.admits(persons.len())
            })
            .map(|(company_id, persons)| CompanyCandidate {
                company_id,
                company_name: state.companies.get(&company_id).cloned().unwrap_or_default(),
                employee_count: persons.len(),
            })
            .collect();
        candidates.sort_by_key(|c| (c.employee_count, c.company_id));
        Ok(candidates)
    }
}

#[async_trait::async_trait]
impl EmploymentReader for MemoryRepo {
    async fn employment_for_company(
        &self,
        company_id: CompanyId,
    ) -> Result<Vec<EmploymentRecord>, DomainError> {
        let state = self.state.read().await;
        let mut records: Vec<_> = state
            .employment
            .iter()
            .filter(|r| r.company_id == Some(company_id))
            .cloned()
            .collect();
        records.sort_by_key(|r| r.person_id);
        Ok(records)
    }
}

#[async_trait::async_trait]
impl EdgeWriterPort for MemoryRepo {
    async fn write_company_edges(
        &self,
        company_id: CompanyId,
        edges: &[CoEmploymentEdge],
    ) -> Result<usize, DomainError> {
        self.check_fault(company_id).await?;
        if edges.is_empty() {
            let marker = CoEmploymentEdge::zero_pair_marker(company_id);
            let mut state = self.state.write().await;
            state.edges.entry(marker.key()).or_insert(None);
            self.commits.fetch_add(1, Ordering::SeqCst);
            return Ok(0);
        }

        // Validate the whole set before touching the map so a bad row leaves nothing behind.
        if let Some(bad) = edges.iter().find(|e| e.src_person_id >= e.dst_person_id) {
            return Err(DomainError::Store(format!(
                "non-canonical edge ({}, {}) for company {}",
                bad.src_person_id, bad.dst_person_id, bad.company_id
            )));
        }

        let mut state = self.state.write().await;
        let mut inserted = 0usize;
        for e in edges {
            if let std::collections::btree_map::Entry::Vacant(slot) = state.edges.entry(e.key()) {
                slot.insert(e.overlap_months);
                inserted += 1;
            }
        }
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(inserted)
    }
}

#[async_trait::async_trait]
impl EmploymentImportPort for MemoryRepo {
    async fn save_companies(&self, companies: &[Company]) -> Result<usize, DomainError> {
        let mut state = self.state.write().await;
        for c in companies {
            state.companies.insert(c.id, c.name.clone());
        }
        Ok(companies.len())
    }

    async fn save_employment(&self, records: &[EmploymentRecord]) -> Result<usize, DomainError> {
        let mut state = self.state.write().await;
        let mut inserted = 0usize;
        for r in records {
            if !state.employment.contains(r) {
                state.employment.push(r.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }
}

#[async_trait::async_trait]
impl GraphStatsPort for MemoryRepo {
    async fn edge_count(&self) -> Result<u64, DomainError> {
        Ok(self.all_edges().await.len() as u64)
    }

    async fn processed_company_count(&self) -> Result<u64, DomainError> {
        let state = self.state.read().await;
        let companies: HashSet<CompanyId> = state.edges.keys().map(|&(_, _, c)| c).collect();
        Ok(companies.len() as u64)
    }

    async fn edges_for_company(
        &self,
        company_id: CompanyId,
    ) -> Result<Vec<CoEmploymentEdge>, DomainError> {
        Ok(self
            .all_edges()
            .await
            .into_iter()
            .filter(|e| e.company_id == company_id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(person_id: i64, company_id: i64) -> EmploymentRecord {
        EmploymentRecord {
            person_id,
            company_id: Some(company_id),
            start_date: None,
            end_date: None,
            title: None,
        }
    }

    #[tokio::test]
    async fn test_injected_failure_writes_nothing() {
        let repo = MemoryRepo::new();
        let edge = CoEmploymentEdge::canonical(1, 2, 3, Some(1)).unwrap();
        repo.fail_on_company(3).await;

        assert!(repo.write_company_edges(3, &[edge]).await.is_err());
        assert_eq!(repo.edge_count().await.unwrap(), 0);

        // one-shot: the retry succeeds
        assert_eq!(repo.write_company_edges(3, &[edge]).await.unwrap(), 1);
        assert_eq!(repo.commit_count(), 1);
    }

    #[tokio::test]
    async fn test_selector_excludes_processed() {
        let repo = MemoryRepo::new();
        repo.save_employment(&[row(1, 1), row(2, 1), row(1, 2), row(2, 2), row(3, 2)])
            .await
            .unwrap();
        let edge = CoEmploymentEdge::canonical(1, 2, 1, None).unwrap();
        repo.write_company_edges(1, &[edge]).await.unwrap();

        let left = repo.select_unprocessed(SizeBound::Unbounded).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].company_id, 2);
        assert_eq!(left[0].employee_count, 3);
    }

    #[tokio::test]
    async fn test_empty_edge_set_leaves_marker_only() {
        let repo = MemoryRepo::new();
        repo.save_employment(&[row(1, 4), row(2, 4)]).await.unwrap();

        assert_eq!(repo.write_company_edges(4, &[]).await.unwrap(), 0);
        assert_eq!(repo.edge_count().await.unwrap(), 0);
        assert!(repo.all_edges().await.is_empty());
        assert_eq!(repo.processed_company_count().await.unwrap(), 1);
        assert!(repo
            .select_unprocessed(SizeBound::Unbounded)
            .await
            .unwrap()
            .is_empty());
    }
}
