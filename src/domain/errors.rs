//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these.

use crate::domain::entities::{CompanyId, PersonId};
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    /// Store unreachable or a statement failed. Aborts the run at the current company boundary;
    /// the in-flight company is rolled back and stays eligible for the next run.
    #[error("Store error: {0}")]
    Store(String),

    /// Aggregated tenure ends before it starts. Only the offending person's pairs are skipped.
    #[error("Malformed interval for person {person_id} at company {company_id}: {start} > {end}")]
    MalformedInterval {
        person_id: PersonId,
        company_id: CompanyId,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("Import error: {0}")]
    Import(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Aborted: {0}")]
    Aborted(String),
}
