//! SQLite-backed store via libsql. Holds the employment history (read side) and the
//! co-employment edge table (write side) in one database file: data/graph.db
//!
//! Edge writes are set-oriented: a company's whole edge set goes out as multi-row
//! `INSERT ... ON CONFLICT DO NOTHING` statements inside a single transaction.

use crate::domain::{
    CoEmploymentEdge, Company, CompanyCandidate, CompanyId, DomainError, EmploymentRecord,
    SizeBound,
};
use crate::ports::{
    CompanySelectorPort, EdgeWriterPort, EmploymentImportPort, EmploymentReader, GraphStatsPort,
};
use chrono::NaiveDate;
use libsql::{Connection, Database, Value, params};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const DB_FILE_NAME: &str = "graph.db";

/// Rows per multi-row INSERT. 4 bound parameters per row keeps a statement under 999 parameters.
pub const DEFAULT_INSERT_CHUNK_ROWS: usize = 200;
const MAX_INSERT_CHUNK_ROWS: usize = 249;

const DATE_FORMAT: &str = "%Y-%m-%d";

const COMPANIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS companies (
    company_id INTEGER PRIMARY KEY,
    company_name TEXT NOT NULL DEFAULT ''
)"#;

const EMPLOYMENT_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS employment (
    person_id INTEGER NOT NULL,
    company_id INTEGER,
    start_date TEXT,
    end_date TEXT,
    title TEXT
)"#;
const EMPLOYMENT_COMPANY_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_employment_company ON employment (company_id, person_id)";
/// Identical rows are stored once so re-imports are no-ops.
const EMPLOYMENT_ROW_INDEX: &str = r#"
CREATE UNIQUE INDEX IF NOT EXISTS idx_employment_row ON employment (
    person_id,
    COALESCE(company_id, -1),
    COALESCE(start_date, ''),
    COALESCE(end_date, ''),
    COALESCE(title, '')
)"#;

const EDGES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS coworker_edges (
    src_person_id INTEGER NOT NULL,
    dst_person_id INTEGER NOT NULL,
    company_id INTEGER NOT NULL,
    overlap_months INTEGER,
    PRIMARY KEY (src_person_id, dst_person_id, company_id),
    CHECK (
        src_person_id < dst_person_id
        OR (src_person_id = 0 AND dst_person_id = 0 AND overlap_months IS NULL)
    )
)"#;
/// Keeps the selector's "no edge yet" anti-join cheap.
const EDGES_COMPANY_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_edges_company ON coworker_edges (company_id)";

/// Any row for a company, marker included, means it has been processed.
/// `?1` is the upper bound, or NULL for an unbounded run.
const SELECT_UNPROCESSED: &str = r#"
SELECT e.company_id, MAX(c.company_name), COUNT(DISTINCT e.person_id) AS employees
FROM employment e
LEFT JOIN companies c ON c.company_id = e.company_id
WHERE e.company_id IS NOT NULL
  AND NOT EXISTS (SELECT 1 FROM coworker_edges g WHERE g.company_id = e.company_id)
GROUP BY e.company_id
HAVING employees >= 2 AND (?1 IS NULL OR employees <= ?1)
ORDER BY employees ASC, e.company_id ASC
"#;

fn store_err(e: impl Display) -> DomainError {
    DomainError::Store(e.to_string())
}

fn date_to_value(d: Option<NaiveDate>) -> Value {
    match d {
        Some(d) => Value::Text(d.format(DATE_FORMAT).to_string()),
        None => Value::Null,
    }
}

fn text_to_value(s: Option<&str>) -> Value {
    match s {
        Some(s) => Value::Text(s.to_string()),
        None => Value::Null,
    }
}

fn value_to_opt_i64(v: Value) -> Result<Option<i64>, DomainError> {
    match v {
        Value::Null => Ok(None),
        Value::Integer(n) => Ok(Some(n)),
        other => Err(DomainError::Store(format!("expected integer, got {:?}", other))),
    }
}

fn value_to_opt_text(v: Value) -> Option<String> {
    match v {
        Value::Text(s) => Some(s),
        _ => None,
    }
}

/// Accepts `YYYY-MM-DD`, a datetime starting with it (`2020-06-30 00:00:00`,
/// `2020-06-30T00:00:00Z`) or `YYYY-MM` (first of month).
fn parse_stored_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let (day, rest) = s.split_at_checked(10).unwrap_or((s, ""));
    if rest.is_empty() || rest.starts_with([' ', 'T']) {
        if let Ok(d) = NaiveDate::parse_from_str(day, DATE_FORMAT) {
            return Some(d);
        }
    }
    NaiveDate::parse_from_str(&format!("{}-01", s), DATE_FORMAT).ok()
}

/// NULL is an unknown start or an ongoing end. Any other value must parse: reading a bad
/// end date as NULL would turn a finished tenure into an ongoing one.
fn value_to_opt_date(
    v: Value,
    column: &str,
    person_id: i64,
    company_id: CompanyId,
) -> Result<Option<NaiveDate>, DomainError> {
    let s = match v {
        Value::Null => return Ok(None),
        Value::Text(s) => s,
        other => {
            return Err(DomainError::Store(format!(
                "{} for person {} at company {}: expected text, got {:?}",
                column, person_id, company_id, other
            )));
        }
    };
    parse_stored_date(&s).map(Some).ok_or_else(|| {
        DomainError::Store(format!(
            "{} for person {} at company {}: unparseable date '{}'",
            column, person_id, company_id, s
        ))
    })
}

/// Drain a row set returned by a PRAGMA (execute fails when rows are returned).
async fn run_pragma(conn: &Connection, pragma: &str) -> Result<(), DomainError> {
    let mut rows = conn
        .query(pragma, ())
        .await
        .map_err(|e| DomainError::Store(format!("{} failed: {}", pragma, e)))?;
    while rows.next().await.map_err(store_err)?.is_some() {}
    Ok(())
}

/// SQLite store. One database file in the given base directory.
pub struct SqliteRepo {
    db: Database,
    db_path: PathBuf,
    insert_chunk_rows: usize,
}

impl SqliteRepo {
    /// Connect to (or create) the database and ensure the schema exists.
    /// Call this once at startup; the returned repo is safe to share via Arc.
    pub async fn connect(base_dir: impl AsRef<Path>) -> Result<Self, DomainError> {
        let base = base_dir.as_ref();
        std::fs::create_dir_all(base).map_err(store_err)?;
        let db_path = base.join(DB_FILE_NAME);
        let path_str = db_path.to_string_lossy();
        let db = libsql::Builder::new_local(path_str.as_ref())
            .build()
            .await
            .map_err(store_err)?;
        let conn = db.connect().map_err(store_err)?;

        // WAL: readers (status, selector) don't block the edge writer.
        run_pragma(&conn, "PRAGMA journal_mode=WAL").await?;
        run_pragma(&conn, "PRAGMA synchronous=NORMAL").await?;

        for ddl in [
            COMPANIES_TABLE,
            EMPLOYMENT_TABLE,
            EMPLOYMENT_COMPANY_INDEX,
            EMPLOYMENT_ROW_INDEX,
            EDGES_TABLE,
            EDGES_COMPANY_INDEX,
        ] {
            conn.execute(ddl, ()).await.map_err(store_err)?;
        }

        info!(path = %db_path.display(), "SQLite connected with WAL mode");

        Ok(Self {
            db,
            db_path,
            insert_chunk_rows: DEFAULT_INSERT_CHUNK_ROWS,
        })
    }

    /// Rows per multi-row INSERT statement, capped to stay under SQLite's parameter limit.
    pub fn with_insert_chunk_rows(mut self, rows: usize) -> Self {
        self.insert_chunk_rows = rows.clamp(1, MAX_INSERT_CHUNK_ROWS);
        self
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn connection(&self) -> Result<Connection, DomainError> {
        self.db.connect().map_err(store_err)
    }

    fn edge_insert_sql(rows: usize) -> String {
        let values = vec!["(?, ?, ?, ?)"; rows].join(", ");
        format!(
            "INSERT INTO coworker_edges (src_person_id, dst_person_id, company_id, overlap_months) \
             VALUES {} \
             ON CONFLICT (src_person_id, dst_person_id, company_id) DO NOTHING",
            values
        )
    }

    async fn count(&self, sql: &str) -> Result<u64, DomainError> {
        let conn = self.connection()?;
        let mut rows = conn.query(sql, ()).await.map_err(store_err)?;
        match rows.next().await.map_err(store_err)? {
            Some(row) => {
                let n: i64 = row.get(0).map_err(store_err)?;
                Ok(n.max(0) as u64)
            }
            None => Ok(0),
        }
    }
}

#[async_trait::async_trait]
impl CompanySelectorPort for SqliteRepo {
    async fn select_unprocessed(
        &self,
        bound: SizeBound,
    ) -> Result<Vec<CompanyCandidate>, DomainError> {
        let conn = self.connection()?;
        let max = match bound.max() {
            Some(max) => Value::Integer(max.min(i64::MAX as usize) as i64),
            None => Value::Null,
        };
        let mut rows = conn
            .query(SELECT_UNPROCESSED, vec![max])
            .await
            .map_err(store_err)?;

        let mut candidates = Vec::new();
        while let Some(row) = rows.next().await.map_err(store_err)? {
            let company_id: i64 = row.get(0).map_err(store_err)?;
            let company_name = value_to_opt_text(row.get_value(1).map_err(store_err)?)
                .unwrap_or_default();
            let employees: i64 = row.get(2).map_err(store_err)?;
            candidates.push(CompanyCandidate {
                company_id,
                company_name,
                employee_count: employees.max(0) as usize,
            });
        }
        debug!(bound = %bound, count = candidates.len(), "selected unprocessed companies");
        Ok(candidates)
    }
}

#[async_trait::async_trait]
impl EmploymentReader for SqliteRepo {
    async fn employment_for_company(
        &self,
        company_id: CompanyId,
    ) -> Result<Vec<EmploymentRecord>, DomainError> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(
                r#"
                SELECT person_id, company_id, start_date, end_date, title
                FROM employment
                WHERE company_id = ?1
                ORDER BY person_id
                "#,
                params![company_id],
            )
            .await
            .map_err(store_err)?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await.map_err(store_err)? {
            let person_id: i64 = row.get(0).map_err(store_err)?;
            let start = row.get_value(2).map_err(store_err)?;
            let end = row.get_value(3).map_err(store_err)?;
            records.push(EmploymentRecord {
                person_id,
                company_id: value_to_opt_i64(row.get_value(1).map_err(store_err)?)?,
                start_date: value_to_opt_date(start, "start_date", person_id, company_id)?,
                end_date: value_to_opt_date(end, "end_date", person_id, company_id)?,
                title: value_to_opt_text(row.get_value(4).map_err(store_err)?),
            });
        }
        Ok(records)
    }
}

#[async_trait::async_trait]
impl EdgeWriterPort for SqliteRepo {
    async fn write_company_edges(
        &self,
        company_id: CompanyId,
        edges: &[CoEmploymentEdge],
    ) -> Result<usize, DomainError> {
        let conn = self.connection()?;
        if edges.is_empty() {
            let marker = CoEmploymentEdge::zero_pair_marker(company_id);
            conn.execute(
                &Self::edge_insert_sql(1),
                vec![
                    Value::Integer(marker.src_person_id),
                    Value::Integer(marker.dst_person_id),
                    Value::Integer(marker.company_id),
                    Value::Null,
                ],
            )
            .await
            .map_err(store_err)?;
            debug!(company_id, "zero-pair outcome recorded");
            return Ok(0);
        }
        let tx = conn.transaction().await.map_err(store_err)?;

        let mut inserted = 0usize;
        for chunk in edges.chunks(self.insert_chunk_rows) {
            let sql = Self::edge_insert_sql(chunk.len());
            let mut values = Vec::with_capacity(chunk.len() * 4);
            for e in chunk {
                values.push(Value::Integer(e.src_person_id));
                values.push(Value::Integer(e.dst_person_id));
                values.push(Value::Integer(e.company_id));
                values.push(match e.overlap_months {
                    Some(m) => Value::Integer(i64::from(m)),
                    None => Value::Null,
                });
            }
            let result = tx.execute(&sql, values).await;
            match result {
                Ok(n) => inserted += n as usize,
                Err(e) => {
                    if let Err(rb) = tx.rollback().await {
                        warn!(company_id, error = %rb, "rollback failed");
                    }
                    return Err(store_err(e));
                }
            }
        }

        tx.commit().await.map_err(store_err)?;
        debug!(company_id, candidates = edges.len(), inserted, "edge set committed");
        Ok(inserted)
    }
}

#[async_trait::async_trait]
impl EmploymentImportPort for SqliteRepo {
    async fn save_companies(&self, companies: &[Company]) -> Result<usize, DomainError> {
        if companies.is_empty() {
            return Ok(0);
        }
        let conn = self.connection()?;
        let tx = conn.transaction().await.map_err(store_err)?;
        let mut written = 0usize;
        for c in companies {
            let n = tx
                .execute(
                    r#"
                    INSERT INTO companies (company_id, company_name)
                    VALUES (?1, ?2)
                    ON CONFLICT (company_id) DO UPDATE SET
                        company_name = excluded.company_name
                    "#,
                    params![c.id, c.name.as_str()],
                )
                .await
                .map_err(store_err)?;
            written += n as usize;
        }
        tx.commit().await.map_err(store_err)?;
        Ok(written)
    }

    async fn save_employment(&self, records: &[EmploymentRecord]) -> Result<usize, DomainError> {
        if records.is_empty() {
            return Ok(0);
        }
        let conn = self.connection()?;
        let tx = conn.transaction().await.map_err(store_err)?;
        let mut inserted = 0usize;
        for r in records {
            let company = match r.company_id {
                Some(id) => Value::Integer(id),
                None => Value::Null,
            };
            let n = tx
                .execute(
                    r#"
                    INSERT INTO employment (person_id, company_id, start_date, end_date, title)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    ON CONFLICT DO NOTHING
                    "#,
                    vec![
                        Value::Integer(r.person_id),
                        company,
                        date_to_value(r.start_date),
                        date_to_value(r.end_date),
                        text_to_value(r.title.as_deref()),
                    ],
                )
                .await
                .map_err(store_err)?;
            inserted += n as usize;
        }
        tx.commit().await.map_err(store_err)?;
        info!(
            path = %self.db_path.display(),
            received = records.len(),
            inserted,
            "saved employment rows"
        );
        Ok(inserted)
    }
}

#[async_trait::async_trait]
impl GraphStatsPort for SqliteRepo {
    async fn edge_count(&self) -> Result<u64, DomainError> {
        self.count("SELECT COUNT(*) FROM coworker_edges WHERE src_person_id < dst_person_id")
            .await
    }

    async fn processed_company_count(&self) -> Result<u64, DomainError> {
        self.count("SELECT COUNT(DISTINCT company_id) FROM coworker_edges")
            .await
    }

    async fn edges_for_company(
        &self,
        company_id: CompanyId,
    ) -> Result<Vec<CoEmploymentEdge>, DomainError> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(
                r#"
                SELECT src_person_id, dst_person_id, company_id, overlap_months
                FROM coworker_edges
                WHERE company_id = ?1 AND src_person_id < dst_person_id
                ORDER BY src_person_id, dst_person_id
                "#,
                params![company_id],
            )
            .await
            .map_err(store_err)?;

        let mut edges = Vec::new();
        while let Some(row) = rows.next().await.map_err(store_err)? {
            let overlap = value_to_opt_i64(row.get_value(3).map_err(store_err)?)?
                .map(i32::try_from)
                .transpose()
                .map_err(store_err)?;
            edges.push(CoEmploymentEdge {
                src_person_id: row.get(0).map_err(store_err)?,
                dst_person_id: row.get(1).map_err(store_err)?,
                company_id: row.get(2).map_err(store_err)?,
                overlap_months: overlap,
            });
        }
        Ok(edges)
    }
}
