//! Core domain layer. No external I/O dependencies.
//!
//! Entities, overlap rules and pair enumeration live here. Dependencies flow inward.

pub mod entities;
pub mod errors;
pub mod overlap;
pub mod pairing;

pub use entities::{
    CoEmploymentEdge, Company, CompanyCandidate, CompanyId, EmploymentRecord, PersonId, SizeBound,
    Tenure, TenureEnd, ZERO_PAIR_MARKER_PERSON,
};
pub use errors::DomainError;
pub use overlap::{InvertedWindowPolicy, Overlap, OverlapCalculator};
pub use pairing::{CompanyEdgeSet, aggregate_tenures, build_company_edges, pair_count};
