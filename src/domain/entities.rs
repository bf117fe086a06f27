//! Domain entities. Pure data structures for the core business.
//!
//! No SQL/CSV types here. Adapters map rows into these.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type PersonId = i64;
pub type CompanyId = i64;

/// Company metadata. Read-only for graph construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
}

/// A company eligible for processing, as returned by the selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyCandidate {
    pub company_id: CompanyId,
    pub company_name: String,
    /// Distinct employees at the company.
    pub employee_count: usize,
}

/// One raw employment row. Several rows may describe the same (person, company) tenure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmploymentRecord {
    pub person_id: PersonId,
    pub company_id: Option<CompanyId>,
    pub start_date: Option<NaiveDate>,
    /// `None` = still employed.
    pub end_date: Option<NaiveDate>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenureEnd {
    Ended(NaiveDate),
    Ongoing,
}

/// One person's aggregated tenure at one company.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tenure {
    pub person_id: PersonId,
    /// Earliest known start. `None` when no contributing row had a start date.
    pub start: Option<NaiveDate>,
    pub end: TenureEnd,
}

impl Tenure {
    /// Concrete end date, resolving an ongoing tenure to `today`.
    pub fn end_or(&self, today: NaiveDate) -> NaiveDate {
        match self.end {
            TenureEnd::Ended(d) => d,
            TenureEnd::Ongoing => today,
        }
    }

    /// True when the tenure ended before it started.
    pub fn is_inverted(&self) -> bool {
        match (self.start, self.end) {
            (Some(start), TenureEnd::Ended(end)) => end < start,
            _ => false,
        }
    }
}

/// Person id used on both ends of a company's zero-pair marker row.
pub const ZERO_PAIR_MARKER_PERSON: PersonId = 0;

/// Derived co-employment relation. Invariant: `src_person_id < dst_person_id`,
/// except for the zero-pair marker (see [`CoEmploymentEdge::zero_pair_marker`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CoEmploymentEdge {
    pub src_person_id: PersonId,
    pub dst_person_id: PersonId,
    pub company_id: CompanyId,
    pub overlap_months: Option<i32>,
}

impl CoEmploymentEdge {
    /// Build an edge with canonical ordering. Returns `None` for a self-pair.
    pub fn canonical(
        a: PersonId,
        b: PersonId,
        company_id: CompanyId,
        overlap_months: Option<i32>,
    ) -> Option<Self> {
        if a == b {
            return None;
        }
        let (src_person_id, dst_person_id) = if a < b { (a, b) } else { (b, a) };
        Some(Self {
            src_person_id,
            dst_person_id,
            company_id,
            overlap_months,
        })
    }

    /// Edge key: `(src, dst, company_id)`.
    pub fn key(&self) -> (PersonId, PersonId, CompanyId) {
        (self.src_person_id, self.dst_person_id, self.company_id)
    }

    /// Row recording that a company was processed and yielded no pairs.
    ///
    /// `src == dst` never occurs for a real edge, so the marker cannot collide with one.
    /// It only exists so the selector's "has any row" check sees the company as processed.
    pub fn zero_pair_marker(company_id: CompanyId) -> Self {
        Self {
            src_person_id: ZERO_PAIR_MARKER_PERSON,
            dst_person_id: ZERO_PAIR_MARKER_PERSON,
            company_id,
            overlap_months: None,
        }
    }

    pub fn is_zero_pair_marker(&self) -> bool {
        self.src_person_id == self.dst_person_id
    }
}

/// Size tier: the maximum distinct-employee count a company may have to be processed in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeBound {
    AtMost(usize),
    Unbounded,
}

impl SizeBound {
    /// Smallest company that can produce a pair.
    pub const MIN_EMPLOYEES: usize = 2;

    pub fn admits(&self, employee_count: usize) -> bool {
        if employee_count < Self::MIN_EMPLOYEES {
            return false;
        }
        match self {
            SizeBound::AtMost(max) => employee_count <= *max,
            SizeBound::Unbounded => true,
        }
    }

    pub fn max(&self) -> Option<usize> {
        match self {
            SizeBound::AtMost(max) => Some(*max),
            SizeBound::Unbounded => None,
        }
    }
}

impl From<Option<usize>> for SizeBound {
    fn from(max: Option<usize>) -> Self {
        max.map(SizeBound::AtMost).unwrap_or(SizeBound::Unbounded)
    }
}

impl fmt::Display for SizeBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeBound::AtMost(max) => write!(f, "<= {}", max),
            SizeBound::Unbounded => write!(f, "unbounded"),
        }
    }
}
