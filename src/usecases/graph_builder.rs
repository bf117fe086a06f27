//! Graph construction: select unprocessed companies -> aggregate tenures -> compute overlaps ->
//! write edges -> report, one company at a time.
//!
//! - Worklist is recomputed on every run; companies that already have edges are skipped
//! - Each company's edge set is committed as a unit (insert-if-absent), so a crash loses at most
//!   the company in flight and a restart simply resumes with the shorter worklist
//! - Companies above the size bound wait for an explicit higher-bound or unbounded run

use crate::domain::{
    CompanyCandidate, DomainError, InvertedWindowPolicy, OverlapCalculator, SizeBound,
    build_company_edges,
};
use crate::ports::{CompanySelectorPort, EdgeWriterPort, EmploymentReader};
use crate::usecases::progress::{CompanyOutcome, ProgressReporter, RunSummary};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, warn};

/// Default size tier: caps a routine run at ~125k pairs per company.
pub const DEFAULT_MAX_SIZE: usize = 500;

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub bound: SizeBound,
    pub policy: InvertedWindowPolicy,
    /// Stop after this many companies (the rest stay eligible for the next run).
    pub max_companies: Option<usize>,
    /// Date that ongoing tenures run through. `None` = local date at the start of the run.
    pub today: Option<NaiveDate>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            bound: SizeBound::AtMost(DEFAULT_MAX_SIZE),
            policy: InvertedWindowPolicy::default(),
            max_companies: None,
            today: None,
        }
    }
}

/// Graph build service. Sequential: peak memory is one company's edge set.
pub struct GraphBuilder {
    selector: Arc<dyn CompanySelectorPort>,
    reader: Arc<dyn EmploymentReader>,
    writer: Arc<dyn EdgeWriterPort>,
    options: BuildOptions,
}

impl GraphBuilder {
    pub fn new(
        selector: Arc<dyn CompanySelectorPort>,
        reader: Arc<dyn EmploymentReader>,
        writer: Arc<dyn EdgeWriterPort>,
        options: BuildOptions,
    ) -> Self {
        Self {
            selector,
            reader,
            writer,
            options,
        }
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Run until the worklist is exhausted (or `max_companies` is reached).
    ///
    /// A store error stops the run at the current company boundary; that company's
    /// transaction is rolled back and it will be reselected next time.
    pub async fn run(&self, reporter: &mut ProgressReporter) -> Result<RunSummary, DomainError> {
        let today = self
            .options
            .today
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        let calc = OverlapCalculator::new(today, self.options.policy);

        let mut worklist = self.selector.select_unprocessed(self.options.bound).await?;
        if let Some(max) = self.options.max_companies {
            worklist.truncate(max);
        }
        reporter.start(self.options.bound, worklist.len());

        for candidate in &worklist {
            match self.process_company(candidate, &calc).await {
                Ok(outcome) => reporter.record(&outcome),
                Err(e) => {
                    reporter.abort(&e);
                    return Err(e);
                }
            }
        }

        Ok(reporter.finish())
    }

    /// Aggregate, compute and commit one company.
    pub async fn process_company(
        &self,
        candidate: &CompanyCandidate,
        calc: &OverlapCalculator,
    ) -> Result<CompanyOutcome, DomainError> {
        let company_id = candidate.company_id;
        let records = self.reader.employment_for_company(company_id).await?;
        let set = build_company_edges(company_id, &records, calc);

        for err in &set.malformed {
            warn!(company_id, error = %err, "skipping pairs for malformed tenure");
        }
        if set.employee_count != candidate.employee_count {
            // Employment changed between selection and read; the fresh rows win.
            debug!(
                company_id,
                selected = candidate.employee_count,
                read = set.employee_count,
                "employee count drifted since selection"
            );
        }

        if set.edges.is_empty() {
            debug!(
                company_id,
                skipped = set.skipped_pairs,
                suppressed = set.suppressed_pairs,
                "no pairs to write; recording zero-pair outcome"
            );
        }
        let edges_added = self.writer.write_company_edges(company_id, &set.edges).await?;

        Ok(CompanyOutcome {
            company_id,
            company_name: candidate.company_name.clone(),
            employee_count: set.employee_count,
            candidate_edges: set.edges.len(),
            edges_added,
            skipped_pairs: set.skipped_pairs,
            suppressed_pairs: set.suppressed_pairs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::persistence::MemoryRepo;
    use crate::domain::{CoEmploymentEdge, EmploymentRecord};
    use crate::ports::{EmploymentImportPort, GraphStatsPort};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(
        person_id: i64,
        company_id: i64,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> EmploymentRecord {
        EmploymentRecord {
            person_id,
            company_id: Some(company_id),
            start_date: Some(start),
            end_date: end,
            title: None,
        }
    }

    fn builder(repo: &Arc<MemoryRepo>, options: BuildOptions) -> GraphBuilder {
        GraphBuilder::new(repo.clone(), repo.clone(), repo.clone(), options)
    }

    fn options(bound: SizeBound) -> BuildOptions {
        BuildOptions {
            bound,
            today: Some(date(2024, 1, 1)),
            ..BuildOptions::default()
        }
    }

    #[tokio::test]
    async fn test_run_processes_then_nothing_left() {
        let repo = Arc::new(MemoryRepo::new());
        repo.save_employment(&[
            row(1, 1, date(2020, 1, 1), Some(date(2022, 1, 1))),
            row(2, 1, date(2020, 1, 1), Some(date(2022, 1, 1))),
            row(3, 1, date(2020, 1, 1), Some(date(2022, 1, 1))),
        ])
        .await
        .unwrap();

        let b = builder(&repo, options(SizeBound::AtMost(500)));
        let first = b.run(&mut ProgressReporter::default()).await.unwrap();
        assert!(first.completed);
        assert_eq!(first.companies_processed, 1);
        assert_eq!(first.edges_added, 3);

        let second = b.run(&mut ProgressReporter::default()).await.unwrap();
        assert_eq!(second.candidates, 0);
        assert_eq!(second.edges_added, 0);
        assert_eq!(repo.edge_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_ongoing_peer_runs_through_today() {
        let repo = Arc::new(MemoryRepo::new());
        repo.save_employment(&[
            row(5, 2, date(2021, 1, 1), None),
            row(4, 2, date(2020, 1, 1), Some(date(2021, 7, 1))),
            row(6, 2, date(2022, 1, 1), None),
        ])
        .await
        .unwrap();

        builder(&repo, options(SizeBound::Unbounded))
            .run(&mut ProgressReporter::default())
            .await
            .unwrap();

        let edges = repo.edges_for_company(2).await.unwrap();
        let months: Vec<_> = edges
            .iter()
            .map(|e| (e.src_person_id, e.dst_person_id, e.overlap_months))
            .collect();
        // 4-5: 2021-01..2021-07, 4-6: sequential (clamped), 5-6: 2022-01..today(2024-01)
        assert_eq!(
            months,
            vec![(4, 5, Some(6)), (4, 6, Some(0)), (5, 6, Some(24))]
        );
    }

    #[tokio::test]
    async fn test_max_companies_leaves_rest_for_next_run() {
        let repo = Arc::new(MemoryRepo::new());
        for company in 1..=3 {
            repo.save_employment(&[
                row(1, company, date(2020, 1, 1), None),
                row(2, company, date(2020, 1, 1), None),
            ])
            .await
            .unwrap();
        }
        let b = builder(
            &repo,
            BuildOptions {
                max_companies: Some(2),
                ..options(SizeBound::AtMost(10))
            },
        );
        let first = b.run(&mut ProgressReporter::default()).await.unwrap();
        assert_eq!(first.companies_processed, 2);
        let second = b.run(&mut ProgressReporter::default()).await.unwrap();
        assert_eq!(second.companies_processed, 1);
        assert_eq!(repo.processed_company_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_failed_company_aborts_run_and_stays_eligible() {
        let repo = Arc::new(MemoryRepo::new());
        for company in 1..=3 {
            repo.save_employment(&[
                row(10, company, date(2020, 1, 1), None),
                row(20, company, date(2020, 1, 1), None),
            ])
            .await
            .unwrap();
        }
        repo.fail_on_company(2).await;

        let b = builder(&repo, options(SizeBound::AtMost(10)));
        let err = b.run(&mut ProgressReporter::default()).await.unwrap_err();
        assert!(matches!(err, DomainError::Store(_)));
        assert_eq!(repo.processed_company_count().await.unwrap(), 1);

        let resumed = b.run(&mut ProgressReporter::default()).await.unwrap();
        assert_eq!(resumed.candidates, 2);
        assert_eq!(resumed.edges_added, 2);
    }

    #[tokio::test]
    async fn test_process_company_defends_single_employee() {
        let repo = Arc::new(MemoryRepo::new());
        repo.save_employment(&[row(1, 9, date(2020, 1, 1), None)])
            .await
            .unwrap();
        let b = builder(&repo, options(SizeBound::Unbounded));
        let calc = OverlapCalculator::new(date(2024, 1, 1), InvertedWindowPolicy::Clamp);

        // bypass the selector on purpose
        let candidate = CompanyCandidate {
            company_id: 9,
            company_name: "Solo".into(),
            employee_count: 1,
        };
        let outcome = b.process_company(&candidate, &calc).await.unwrap();
        assert_eq!(outcome.candidate_edges, 0);
        assert_eq!(outcome.edges_added, 0);
        assert_eq!(repo.edge_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_limited_runs_move_past_zero_pair_company() {
        let repo = Arc::new(MemoryRepo::new());
        repo.save_employment(&[
            row(1, 1, date(2020, 1, 1), None),
            // ends before it starts: every pair at company 1 is skipped
            row(2, 1, date(2022, 1, 1), Some(date(2021, 1, 1))),
            row(3, 2, date(2020, 1, 1), None),
            row(4, 2, date(2020, 1, 1), None),
            row(5, 2, date(2020, 1, 1), None),
        ])
        .await
        .unwrap();
        let b = builder(
            &repo,
            BuildOptions {
                max_companies: Some(1),
                ..options(SizeBound::AtMost(10))
            },
        );

        let first = b.run(&mut ProgressReporter::default()).await.unwrap();
        assert_eq!(first.companies_processed, 1);
        assert_eq!(first.edges_added, 0);
        assert_eq!(first.pairs_skipped, 1);

        let second = b.run(&mut ProgressReporter::default()).await.unwrap();
        assert_eq!(second.companies_processed, 1);
        assert_eq!(second.edges_added, 3);

        let third = b.run(&mut ProgressReporter::default()).await.unwrap();
        assert_eq!(third.candidates, 0);
        assert_eq!(repo.processed_company_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_fully_suppressed_company_is_not_reselected() {
        let repo = Arc::new(MemoryRepo::new());
        repo.save_employment(&[
            row(1, 4, date(2019, 1, 1), Some(date(2019, 6, 1))),
            row(2, 4, date(2020, 1, 1), Some(date(2020, 6, 1))),
        ])
        .await
        .unwrap();
        let b = builder(
            &repo,
            BuildOptions {
                policy: InvertedWindowPolicy::Suppress,
                ..options(SizeBound::AtMost(10))
            },
        );

        let first = b.run(&mut ProgressReporter::default()).await.unwrap();
        assert_eq!(first.pairs_suppressed, 1);
        assert_eq!(repo.edge_count().await.unwrap(), 0);

        let second = b.run(&mut ProgressReporter::default()).await.unwrap();
        assert_eq!(second.candidates, 0);
    }

    #[tokio::test]
    async fn test_reprocessing_company_adds_nothing() {
        let repo = Arc::new(MemoryRepo::new());
        repo.save_employment(&[
            row(1, 3, date(2020, 1, 1), None),
            row(2, 3, date(2021, 1, 1), None),
        ])
        .await
        .unwrap();
        let b = builder(&repo, options(SizeBound::Unbounded));
        let calc = OverlapCalculator::new(date(2024, 1, 1), InvertedWindowPolicy::Clamp);
        let candidate = CompanyCandidate {
            company_id: 3,
            company_name: String::new(),
            employee_count: 2,
        };

        let first = b.process_company(&candidate, &calc).await.unwrap();
        // a later "today" must not rewrite the stored duration
        let later = OverlapCalculator::new(date(2025, 1, 1), InvertedWindowPolicy::Clamp);
        let second = b.process_company(&candidate, &later).await.unwrap();
        assert_eq!(first.edges_added, 1);
        assert_eq!(second.edges_added, 0);
        assert_eq!(
            repo.edges_for_company(3).await.unwrap(),
            vec![CoEmploymentEdge::canonical(1, 2, 3, Some(36)).unwrap()]
        );
    }
}
