//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters. Every port takes the store explicitly; there is no ambient connection.

use crate::domain::{
    CoEmploymentEdge, Company, CompanyCandidate, CompanyId, DomainError, EmploymentRecord,
    SizeBound,
};

/// Finds companies that still need edges.
#[async_trait::async_trait]
pub trait CompanySelectorPort: Send + Sync {
    /// Companies with a non-null id, a distinct-employee count admitted by `bound`
    /// and no edge in the edge store, ordered by employee count ascending (ties by id).
    ///
    /// Recomputed on every call; an empty list means there is nothing left to do.
    async fn select_unprocessed(
        &self,
        bound: SizeBound,
    ) -> Result<Vec<CompanyCandidate>, DomainError>;
}

/// Read side of the employment history.
#[async_trait::async_trait]
pub trait EmploymentReader: Send + Sync {
    /// All rows for one company, duplicates included.
    async fn employment_for_company(
        &self,
        company_id: CompanyId,
    ) -> Result<Vec<EmploymentRecord>, DomainError>;
}

/// Edge store writes. One call is one unit of work.
#[async_trait::async_trait]
pub trait EdgeWriterPort: Send + Sync {
    /// Insert the company's edge set if absent, keyed by `(src, dst, company_id)`.
    /// Either every row is committed or none is. Returns the number of rows actually inserted;
    /// rows already present are skipped silently.
    ///
    /// An empty set records the company's zero-pair marker instead, so the selector treats
    /// the company as processed.
    async fn write_company_edges(
        &self,
        company_id: CompanyId,
        edges: &[CoEmploymentEdge],
    ) -> Result<usize, DomainError>;
}

/// Loads source data (companies, employment rows) into the store.
#[async_trait::async_trait]
pub trait EmploymentImportPort: Send + Sync {
    /// Upsert company names. Returns rows written.
    async fn save_companies(&self, companies: &[Company]) -> Result<usize, DomainError>;

    /// Insert employment rows; identical rows are stored once. Returns rows inserted.
    async fn save_employment(&self, records: &[EmploymentRecord]) -> Result<usize, DomainError>;
}

/// Read-only view of the edge store.
#[async_trait::async_trait]
pub trait GraphStatsPort: Send + Sync {
    /// Real edges only; zero-pair markers are not counted.
    async fn edge_count(&self) -> Result<u64, DomainError>;

    /// Companies with at least one edge or a zero-pair marker.
    async fn processed_company_count(&self) -> Result<u64, DomainError>;

    /// Edges for one company, ordered by `(src, dst)`.
    async fn edges_for_company(
        &self,
        company_id: CompanyId,
    ) -> Result<Vec<CoEmploymentEdge>, DomainError>;
}

/// Visual progress for interactive runs. Purely cosmetic.
pub trait ProgressSink: Send + Sync {
    fn begin(&self, total: usize);
    fn advance(&self, company_name: &str);
    fn finish(&self);
}
