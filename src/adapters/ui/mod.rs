//! Terminal presentation adapters.

pub mod progress;

pub use progress::BarProgress;
