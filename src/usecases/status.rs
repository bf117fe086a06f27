//! Read-only view of how far graph construction has progressed.

use crate::domain::{DomainError, SizeBound, pair_count};
use crate::ports::{CompanySelectorPort, GraphStatsPort};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphStatus {
    pub bound: SizeBound,
    pub edges: u64,
    pub processed_companies: u64,
    /// Unprocessed companies a run with `bound` would pick up.
    pub pending_within_bound: usize,
    /// Unprocessed companies deferred to a higher-bound run.
    pub pending_above_bound: usize,
    /// Largest deferred company, if any.
    pub largest_pending: Option<usize>,
    /// Pairs a run with `bound` would enumerate.
    pub pending_pairs_within_bound: u64,
}

pub async fn graph_status(
    selector: &dyn CompanySelectorPort,
    stats: &dyn GraphStatsPort,
    bound: SizeBound,
) -> Result<GraphStatus, DomainError> {
    let pending = selector.select_unprocessed(SizeBound::Unbounded).await?;
    let (within, above): (Vec<_>, Vec<_>) =
        pending.iter().partition(|c| bound.admits(c.employee_count));

    Ok(GraphStatus {
        bound,
        edges: stats.edge_count().await?,
        processed_companies: stats.processed_company_count().await?,
        pending_within_bound: within.len(),
        pending_above_bound: above.len(),
        largest_pending: above.iter().map(|c| c.employee_count).max(),
        pending_pairs_within_bound: within
            .iter()
            .map(|c| pair_count(c.employee_count) as u64)
            .sum(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::persistence::MemoryRepo;
    use crate::domain::EmploymentRecord;
    use crate::ports::EmploymentImportPort;

    #[tokio::test]
    async fn test_status_splits_by_bound() {
        let repo = MemoryRepo::new();
        let mut rows = Vec::new();
        for (company_id, size) in [(1, 2), (2, 3), (3, 6)] {
            for p in 0..size {
                rows.push(EmploymentRecord {
                    person_id: p,
                    company_id: Some(company_id),
                    start_date: None,
                    end_date: None,
                    title: None,
                });
            }
        }
        repo.save_employment(&rows).await.unwrap();

        let status = graph_status(&repo, &repo, SizeBound::AtMost(5)).await.unwrap();
        assert_eq!(status.edges, 0);
        assert_eq!(status.pending_within_bound, 2);
        assert_eq!(status.pending_above_bound, 1);
        assert_eq!(status.largest_pending, Some(6));
        assert_eq!(status.pending_pairs_within_bound, 1 + 3);
    }
}
