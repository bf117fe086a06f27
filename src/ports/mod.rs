//! Port traits. API boundaries for the hexagon.
//!
//! - Outbound: Called by application into infrastructure (store, progress display)

pub mod outbound;

pub use outbound::{
    CompanySelectorPort, EdgeWriterPort, EmploymentImportPort, EmploymentReader, GraphStatsPort,
    ProgressSink,
};
