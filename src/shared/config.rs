//! Application configuration. Store location, size tier, run policy.
//!
//! Sources, lowest to highest precedence: optional file named by COWORKER_GRAPH_CONFIG,
//! then `COWORKER_GRAPH_*` environment variables (a `.env` file is loaded first).
//! CLI flags override both.

use crate::adapters::persistence::sqlite_repo::DEFAULT_INSERT_CHUNK_ROWS;
use crate::domain::{DomainError, InvertedWindowPolicy};
use crate::usecases::DEFAULT_MAX_SIZE;
use crate::usecases::progress::{DEFAULT_LARGE_COMPANY_EDGES, DEFAULT_PROGRESS_EVERY};
use serde::Deserialize;

pub const ENV_PREFIX: &str = "COWORKER_GRAPH";

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// Directory holding graph.db. Read from COWORKER_GRAPH_DATA_DIR.
    #[serde(default)]
    pub data_dir: Option<String>,

    /// Default size tier for `build`. Read from COWORKER_GRAPH_MAX_SIZE.
    #[serde(default)]
    pub max_size: Option<usize>,

    /// keep | clamp | suppress. Read from COWORKER_GRAPH_INVERTED_WINDOW.
    #[serde(default)]
    pub inverted_window: Option<String>,

    /// Log a progress line every N companies. Read from COWORKER_GRAPH_PROGRESS_EVERY.
    #[serde(default)]
    pub progress_every: Option<usize>,

    /// Companies adding at least this many edges are always logged.
    /// Read from COWORKER_GRAPH_LARGE_COMPANY_EDGES.
    #[serde(default)]
    pub large_company_edges: Option<usize>,

    /// Rows per multi-row INSERT. Read from COWORKER_GRAPH_INSERT_CHUNK_ROWS.
    #[serde(default)]
    pub insert_chunk_rows: Option<usize>,

    /// Cap on companies per run. Read from COWORKER_GRAPH_MAX_COMPANIES.
    #[serde(default)]
    pub max_companies: Option<usize>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            c = c.add_source(config::File::with_name(&path));
        }
        c = c.add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true));
        c.build()?.try_deserialize()
    }

    /// Returns the data directory. Defaults to ./data.
    pub fn data_dir_or_default(&self) -> String {
        self.data_dir.clone().unwrap_or_else(|| "./data".to_string())
    }

    /// Returns the size tier. Defaults to 500.
    pub fn max_size_or_default(&self) -> usize {
        self.max_size.unwrap_or(DEFAULT_MAX_SIZE)
    }

    /// Returns the inverted-window policy. Defaults to clamp; an unknown value is a config error.
    pub fn inverted_window_policy(&self) -> Result<InvertedWindowPolicy, DomainError> {
        match self.inverted_window.as_deref() {
            Some(s) => s.parse().map_err(DomainError::Config),
            None => Ok(InvertedWindowPolicy::default()),
        }
    }

    pub fn progress_every_or_default(&self) -> usize {
        self.progress_every.unwrap_or(DEFAULT_PROGRESS_EVERY)
    }

    pub fn large_company_edges_or_default(&self) -> usize {
        self.large_company_edges.unwrap_or(DEFAULT_LARGE_COMPANY_EDGES)
    }

    pub fn insert_chunk_rows_or_default(&self) -> usize {
        self.insert_chunk_rows.unwrap_or(DEFAULT_INSERT_CHUNK_ROWS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.data_dir_or_default(), "./data");
        assert_eq!(cfg.max_size_or_default(), 500);
        assert_eq!(cfg.progress_every_or_default(), 100);
        assert_eq!(cfg.insert_chunk_rows_or_default(), 200);
        assert_eq!(
            cfg.inverted_window_policy().unwrap(),
            InvertedWindowPolicy::Clamp
        );
    }

    #[test]
    fn test_bad_policy_is_config_error() {
        let cfg = AppConfig {
            inverted_window: Some("ignore".into()),
            ..AppConfig::default()
        };
        assert!(matches!(
            cfg.inverted_window_policy(),
            Err(DomainError::Config(_))
        ));
    }

    #[test]
    fn test_deserialize_from_source() {
        let cfg: AppConfig = config::Config::builder()
            .set_override("max_size", 1000)
            .unwrap()
            .set_override("inverted_window", "suppress")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(cfg.max_size_or_default(), 1000);
        assert_eq!(
            cfg.inverted_window_policy().unwrap(),
            InvertedWindowPolicy::Suppress
        );
    }
}
