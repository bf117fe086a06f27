//! Run observability. Logs per-company progress at a fixed cadence (or immediately for
//! companies that add many edges) and a final summary. Never affects control flow.

use crate::domain::{CompanyId, DomainError, SizeBound};
use crate::ports::ProgressSink;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

pub const DEFAULT_PROGRESS_EVERY: usize = 100;
pub const DEFAULT_LARGE_COMPANY_EDGES: usize = 10_000;

/// What happened to one company in a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompanyOutcome {
    pub company_id: CompanyId,
    pub company_name: String,
    pub employee_count: usize,
    /// Edges computed for the company.
    pub candidate_edges: usize,
    /// Edges actually inserted (the rest were already present).
    pub edges_added: usize,
    pub skipped_pairs: usize,
    pub suppressed_pairs: usize,
}

/// Totals for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub candidates: usize,
    pub companies_processed: usize,
    pub edges_added: u64,
    pub edges_already_present: u64,
    pub pairs_skipped: u64,
    pub pairs_suppressed: u64,
    pub elapsed_ms: u64,
    /// False when the run stopped on an error before exhausting its worklist.
    pub completed: bool,
}

pub struct ProgressReporter {
    every: usize,
    large_company_edges: usize,
    started: Instant,
    summary: RunSummary,
    sink: Option<Arc<dyn ProgressSink>>,
}

impl ProgressReporter {
    pub fn new(every: usize, large_company_edges: usize) -> Self {
        Self {
            every: every.max(1),
            large_company_edges,
            started: Instant::now(),
            summary: RunSummary::default(),
            sink: None,
        }
    }

    /// Attach a visual progress display (e.g. a terminal bar).
    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn start(&mut self, bound: SizeBound, candidates: usize) {
        self.started = Instant::now();
        self.summary = RunSummary {
            candidates,
            ..RunSummary::default()
        };
        if let Some(sink) = &self.sink {
            sink.begin(candidates);
        }
        if candidates == 0 {
            info!(bound = %bound, "no unprocessed companies within bound; nothing to do");
        } else {
            info!(bound = %bound, candidates, "starting graph build");
        }
    }

    /// Whether this outcome gets its own log line.
    pub fn should_log(&self, outcome: &CompanyOutcome) -> bool {
        self.summary.companies_processed % self.every == 0
            || outcome.edges_added >= self.large_company_edges
    }

    pub fn record(&mut self, outcome: &CompanyOutcome) {
        let log = self.should_log(outcome);
        let s = &mut self.summary;
        s.companies_processed += 1;
        s.edges_added += outcome.edges_added as u64;
        s.edges_already_present +=
            outcome.candidate_edges.saturating_sub(outcome.edges_added) as u64;
        s.pairs_skipped += outcome.skipped_pairs as u64;
        s.pairs_suppressed += outcome.suppressed_pairs as u64;

        if let Some(sink) = &self.sink {
            sink.advance(&outcome.company_name);
        }

        if log {
            info!(
                company_id = outcome.company_id,
                company = %outcome.company_name,
                employees = outcome.employee_count,
                edges_added = outcome.edges_added,
                done = self.summary.companies_processed,
                of = self.summary.candidates,
                total_edges_added = self.summary.edges_added,
                elapsed_secs = self.started.elapsed().as_secs(),
                "company committed"
            );
        }
    }

    pub fn finish(&mut self) -> RunSummary {
        self.summary.completed = true;
        self.summary.elapsed_ms = self.started.elapsed().as_millis() as u64;
        if let Some(sink) = &self.sink {
            sink.finish();
        }
        let s = &self.summary;
        info!(
            companies = s.companies_processed,
            edges_added = s.edges_added,
            edges_already_present = s.edges_already_present,
            pairs_skipped = s.pairs_skipped,
            pairs_suppressed = s.pairs_suppressed,
            elapsed_ms = s.elapsed_ms,
            "graph build complete"
        );
        s.clone()
    }

    /// Log the partial summary of a run that stopped on `error`. Committed companies stay valid.
    pub fn abort(&mut self, error: &DomainError) -> RunSummary {
        self.summary.completed = false;
        self.summary.elapsed_ms = self.started.elapsed().as_millis() as u64;
        if let Some(sink) = &self.sink {
            sink.finish();
        }
        let s = &self.summary;
        warn!(
            error = %error,
            companies_committed = s.companies_processed,
            remaining = s.candidates.saturating_sub(s.companies_processed),
            edges_added = s.edges_added,
            "graph build aborted at company boundary; rerun to resume"
        );
        s.clone()
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRESS_EVERY, DEFAULT_LARGE_COMPANY_EDGES)
    }
}
