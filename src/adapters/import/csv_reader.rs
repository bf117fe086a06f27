//! CSV loading for companies and employment rows. Uses the `csv` crate with serde rows.
//!
//! Expected headers:
//! - companies: `company_id,company_name`
//! - employment: `person_id,company_id,start_date,end_date,title`
//!
//! Dates accept `YYYY-MM-DD` or `YYYY-MM` (first of month); empty means unknown / ongoing.

use crate::domain::{Company, EmploymentRecord};
use chrono::NaiveDate;
use serde::Deserialize;
use std::io::Read;

/// A row that could not be turned into a domain record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRow {
    /// 1-based line number in the file (header is line 1).
    pub line: u64,
    pub reason: String,
}

/// Parsed rows plus the ones that were skipped.
#[derive(Debug)]
pub struct CsvBatch<T> {
    pub rows: Vec<T>,
    pub rejected: Vec<RejectedRow>,
}

// Manual impl: a derive would require `T: Default`.
impl<T> Default for CsvBatch<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompanyRow {
    company_id: Option<i64>,
    #[serde(default)]
    company_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmploymentRow {
    person_id: Option<i64>,
    company_id: Option<i64>,
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

/// Parse a date cell. `Ok(None)` for empty cells, `Err` for anything unrecognised.
pub fn parse_date(cell: Option<&str>) -> Result<Option<NaiveDate>, String> {
    let Some(s) = cell.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(Some(d));
    }
    NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d")
        .map(Some)
        .map_err(|_| format!("unrecognised date '{}'", s))
}

fn reader<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(input)
}

fn line_of(record: &csv::StringRecord, fallback: u64) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(fallback)
}

pub fn read_companies<R: Read>(input: R) -> Result<CsvBatch<Company>, csv::Error> {
    let mut rdr = reader(input);
    let headers = rdr.headers()?.clone();
    let mut batch = CsvBatch::default();

    for (i, result) in rdr.records().enumerate() {
        let record = result?;
        let line = line_of(&record, i as u64 + 2);
        match record.deserialize::<CompanyRow>(Some(&headers)) {
            Ok(CompanyRow {
                company_id: Some(id),
                company_name,
            }) => batch.rows.push(Company {
                id,
                name: company_name.unwrap_or_default(),
            }),
            Ok(_) => batch.rejected.push(RejectedRow {
                line,
                reason: "missing company_id".into(),
            }),
            Err(e) => batch.rejected.push(RejectedRow {
                line,
                reason: e.to_string(),
            }),
        }
    }
    Ok(batch)
}

pub fn read_employment<R: Read>(input: R) -> Result<CsvBatch<EmploymentRecord>, csv::Error> {
    let mut rdr = reader(input);
    let headers = rdr.headers()?.clone();
    let mut batch = CsvBatch::default();

    for (i, result) in rdr.records().enumerate() {
        let record = result?;
        let line = line_of(&record, i as u64 + 2);
        let row: EmploymentRow = match record.deserialize(Some(&headers)) {
            Ok(row) => row,
            Err(e) => {
                batch.rejected.push(RejectedRow {
                    line,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        match employment_from_row(row) {
            Ok(rec) => batch.rows.push(rec),
            Err(reason) => batch.rejected.push(RejectedRow { line, reason }),
        }
    }
    Ok(batch)
}

fn employment_from_row(row: EmploymentRow) -> Result<EmploymentRecord, String> {
    let person_id = row.person_id.ok_or("missing person_id")?;
    Ok(EmploymentRecord {
        person_id,
        // kept even when empty; the selector ignores rows without a company
        company_id: row.company_id,
        start_date: parse_date(row.start_date.as_deref())?,
        end_date: parse_date(row.end_date.as_deref())?,
        title: row.title.filter(|t| !t.trim().is_empty()),
    })
}
