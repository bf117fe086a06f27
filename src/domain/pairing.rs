//! Per-company pair enumeration.
//!
//! Rows are folded into one tenure per person (earliest start, latest end, ongoing wins),
//! then every unordered pair of distinct people yields at most one canonical edge.
//! Pair count is `n * (n - 1) / 2`; callers bound `n` through the size tier.

use crate::domain::entities::{
    CoEmploymentEdge, CompanyId, EmploymentRecord, PersonId, Tenure, TenureEnd,
};
use crate::domain::errors::DomainError;
use crate::domain::overlap::OverlapCalculator;
use std::collections::BTreeMap;

/// Number of unordered pairs among `n` people.
pub fn pair_count(n: usize) -> usize {
    n.saturating_mul(n.saturating_sub(1)) / 2
}

/// Fold a company's rows into one tenure per person, ordered by `person_id`.
/// Rows for other companies (or without a company) are ignored.
pub fn aggregate_tenures(company_id: CompanyId, records: &[EmploymentRecord]) -> Vec<Tenure> {
    let mut by_person: BTreeMap<PersonId, Tenure> = BTreeMap::new();

    for r in records.iter().filter(|r| r.company_id == Some(company_id)) {
        let end = r.end_date.map(TenureEnd::Ended).unwrap_or(TenureEnd::Ongoing);
        by_person
            .entry(r.person_id)
            .and_modify(|t| {
                t.start = match (t.start, r.start_date) {
                    (Some(a), Some(b)) => Some(a.min(b)),
                    (a, b) => a.or(b),
                };
                t.end = match (t.end, end) {
                    (TenureEnd::Ended(a), TenureEnd::Ended(b)) => TenureEnd::Ended(a.max(b)),
                    _ => TenureEnd::Ongoing,
                };
            })
            .or_insert(Tenure {
                person_id: r.person_id,
                start: r.start_date,
                end,
            });
    }

    by_person.into_values().collect()
}

/// Candidate edge set for one company, plus what was left out and why.
#[derive(Debug, Default)]
pub struct CompanyEdgeSet {
    pub company_id: CompanyId,
    pub employee_count: usize,
    pub edges: Vec<CoEmploymentEdge>,
    /// Pairs dropped because one side had a malformed tenure.
    pub skipped_pairs: usize,
    /// Pairs dropped by `InvertedWindowPolicy::Suppress`.
    pub suppressed_pairs: usize,
    pub malformed: Vec<DomainError>,
}

/// Build the full candidate edge set for a company.
///
/// A person whose aggregated tenure ends before it starts is reported in `malformed`
/// and contributes no pairs; the rest of the company proceeds.
pub fn build_company_edges(
    company_id: CompanyId,
    records: &[EmploymentRecord],
    calc: &OverlapCalculator,
) -> CompanyEdgeSet {
    let tenures = aggregate_tenures(company_id, records);
    let employee_count = tenures.len();

    let mut malformed = Vec::new();
    let mut valid = Vec::with_capacity(tenures.len());
    for t in tenures {
        match (t.start, t.end) {
            (Some(start), TenureEnd::Ended(end)) if t.is_inverted() => {
                malformed.push(DomainError::MalformedInterval {
                    person_id: t.person_id,
                    company_id,
                    start,
                    end,
                });
            }
            _ => valid.push(t),
        }
    }

    let skipped_pairs = pair_count(employee_count) - pair_count(valid.len());
    let mut edges = Vec::with_capacity(pair_count(valid.len()));
    let mut suppressed_pairs = 0usize;

    // `valid` is sorted by person_id, so `a` always holds the smaller id.
    for (i, a) in valid.iter().enumerate() {
        for b in &valid[i + 1..] {
            let Some(months) = calc.overlap(a, b).into_edge_value() else {
                suppressed_pairs += 1;
                continue;
            };
            if let Some(edge) =
                CoEmploymentEdge::canonical(a.person_id, b.person_id, company_id, months)
            {
                edges.push(edge);
            }
        }
    }

    CompanyEdgeSet {
        company_id,
        employee_count,
        edges,
        skipped_pairs,
        suppressed_pairs,
        malformed,
    }
}
