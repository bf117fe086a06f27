//! Infrastructure adapters. Implement outbound ports.
//!
//! SQLite / in-memory storage, CSV import, terminal progress. Map errors to DomainError.

pub mod import;
pub mod persistence;
pub mod ui;
