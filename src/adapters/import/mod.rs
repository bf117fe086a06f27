//! Source-data import adapters.

pub mod csv_reader;

pub use csv_reader::{CsvBatch, RejectedRow, read_companies, read_employment};
