//! Application use cases. Orchestrate domain logic via ports.

pub mod graph_builder;
pub mod import_service;
pub mod progress;
pub mod status;

pub use graph_builder::{BuildOptions, DEFAULT_MAX_SIZE, GraphBuilder};
pub use import_service::{FileImport, ImportService};
pub use progress::{CompanyOutcome, ProgressReporter, RunSummary};
pub use status::{GraphStatus, graph_status};
