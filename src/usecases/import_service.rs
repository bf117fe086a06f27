//! Import use case: CSV files -> employment store.
//!
//! Bad rows are skipped and logged. The import itself only fails on unreadable files
//! or store errors.

use crate::adapters::import::{CsvBatch, RejectedRow, read_companies, read_employment};
use crate::domain::DomainError;
use crate::ports::EmploymentImportPort;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Rejected rows logged individually before switching to a count.
const MAX_LOGGED_REJECTS: usize = 20;

/// Outcome of importing one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileImport {
    pub rows_read: usize,
    pub rows_saved: usize,
    pub rows_rejected: usize,
}

pub struct ImportService {
    store: Arc<dyn EmploymentImportPort>,
}

impl ImportService {
    pub fn new(store: Arc<dyn EmploymentImportPort>) -> Self {
        Self { store }
    }

    pub async fn import_companies(&self, path: &Path) -> Result<FileImport, DomainError> {
        let bytes = read_file(path).await?;
        let batch = read_companies(bytes.as_slice())
            .map_err(|e| DomainError::Import(format!("{}: {}", path.display(), e)))?;
        log_rejects(path, &batch);
        let saved = self.store.save_companies(&batch.rows).await?;
        let report = FileImport {
            rows_read: batch.rows.len() + batch.rejected.len(),
            rows_saved: saved,
            rows_rejected: batch.rejected.len(),
        };
        info!(path = %path.display(), ?report, "companies imported");
        Ok(report)
    }

    pub async fn import_employment(&self, path: &Path) -> Result<FileImport, DomainError> {
        let bytes = read_file(path).await?;
        let batch = read_employment(bytes.as_slice())
            .map_err(|e| DomainError::Import(format!("{}: {}", path.display(), e)))?;
        log_rejects(path, &batch);
        let saved = self.store.save_employment(&batch.rows).await?;
        let report = FileImport {
            rows_read: batch.rows.len() + batch.rejected.len(),
            rows_saved: saved,
            rows_rejected: batch.rejected.len(),
        };
        info!(path = %path.display(), ?report, "employment imported");
        Ok(report)
    }
}

async fn read_file(path: &Path) -> Result<Vec<u8>, DomainError> {
    tokio::fs::read(path)
        .await
        .map_err(|e| DomainError::Import(format!("read {}: {}", path.display(), e)))
}

fn log_rejects<T>(path: &Path, batch: &CsvBatch<T>) {
    for RejectedRow { line, reason } in batch.rejected.iter().take(MAX_LOGGED_REJECTS) {
        warn!(path = %path.display(), line, reason = %reason, "skipping row");
    }
    if batch.rejected.len() > MAX_LOGGED_REJECTS {
        warn!(
            path = %path.display(),
            more = batch.rejected.len() - MAX_LOGGED_REJECTS,
            "further rows skipped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::persistence::MemoryRepo;
    use crate::domain::SizeBound;
    use crate::ports::CompanySelectorPort;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_import_files_into_store() {
        let dir = TempDir::new().unwrap();
        let companies = dir.path().join("companies.csv");
        let employment = dir.path().join("employment.csv");
        std::fs::write(&companies, "company_id,company_name\n1,Acme\n").unwrap();
        std::fs::write(
            &employment,
            "person_id,company_id,start_date,end_date,title\n\
             1,1,2020-01-01,,Dev\n\
             2,1,2020-01-01,2021-01-01,QA\n\
             2,1,2020-01-01,2021-01-01,QA\n\
             3,1,not-a-date,,Ops\n",
        )
        .unwrap();

        let repo = Arc::new(MemoryRepo::new());
        let service = ImportService::new(repo.clone());
        let c = service.import_companies(&companies).await.unwrap();
        assert_eq!(c.rows_saved, 1);

        let e = service.import_employment(&employment).await.unwrap();
        assert_eq!(
            e,
            FileImport {
                rows_read: 4,
                rows_saved: 2,
                rows_rejected: 1,
            }
        );

        let candidates = repo.select_unprocessed(SizeBound::Unbounded).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].company_name, "Acme");
    }

    #[tokio::test]
    async fn test_missing_file_is_import_error() {
        let service = ImportService::new(Arc::new(MemoryRepo::new()));
        let err = service
            .import_employment(Path::new("/nonexistent/employment.csv"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Import(_)));
    }
}
