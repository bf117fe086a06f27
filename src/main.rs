//! Wiring & DI. Entry point: parse CLI, load config, bootstrap the store, run one use case.
//! No business logic here.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use coworker_graph::adapters::persistence::SqliteRepo;
use coworker_graph::adapters::ui::BarProgress;
use coworker_graph::domain::{InvertedWindowPolicy, SizeBound};
use coworker_graph::ports::{
    CompanySelectorPort, EdgeWriterPort, EmploymentImportPort, EmploymentReader, ProgressSink,
};
use coworker_graph::shared::AppConfig;
use coworker_graph::usecases::{
    BuildOptions, GraphBuilder, ImportService, ProgressReporter, graph_status,
};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "coworker-graph",
    version,
    about = "Build the co-employment graph from employment history"
)]
struct Cli {
    /// Directory holding graph.db (overrides COWORKER_GRAPH_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create edges for every unprocessed company within the size bound
    Build {
        /// Largest company (distinct employees) to process in this run
        #[arg(long, conflicts_with = "unbounded")]
        max_size: Option<usize>,

        /// Process companies of any size
        #[arg(long)]
        unbounded: bool,

        /// Stop after this many companies
        #[arg(long)]
        limit: Option<usize>,

        /// Non-overlapping tenures: keep | clamp | suppress
        #[arg(long)]
        inverted_window: Option<InvertedWindowPolicy>,

        /// Resolve ongoing tenures to this date instead of today (YYYY-MM-DD)
        #[arg(long)]
        today: Option<NaiveDate>,

        /// Skip the confirmation prompt for unbounded runs
        #[arg(long, short)]
        yes: bool,

        /// Disable the progress bar
        #[arg(long)]
        no_progress: bool,
    },
    /// Load companies and employment rows from CSV
    Import {
        /// CSV with company_id,company_name
        #[arg(long)]
        companies: Option<PathBuf>,

        /// CSV with person_id,company_id,start_date,end_date,title
        #[arg(long)]
        employment: Option<PathBuf>,
    },
    /// Show edge counts and pending companies
    Status {
        /// Bound to split pending companies by
        #[arg(long)]
        max_size: Option<usize>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let env_loaded = dotenv::dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Ok(path) = &env_loaded {
        info!(path = %path.display(), "loaded .env");
    }

    let cfg = AppConfig::load().map_err(|e| anyhow::anyhow!("config: {}", e))?;
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(cfg.data_dir_or_default()));

    let repo = Arc::new(
        SqliteRepo::connect(&data_dir)
            .await
            .map_err(|e| anyhow::anyhow!("SQLite connect failed: {}", e))?
            .with_insert_chunk_rows(cfg.insert_chunk_rows_or_default()),
    );

    match cli.command {
        Commands::Build {
            max_size,
            unbounded,
            limit,
            inverted_window,
            today,
            yes,
            no_progress,
        } => {
            let bound = if unbounded {
                SizeBound::Unbounded
            } else {
                SizeBound::AtMost(max_size.unwrap_or_else(|| cfg.max_size_or_default()))
            };
            if bound == SizeBound::Unbounded && !yes {
                confirm_unbounded()?;
            }
            let policy = match inverted_window {
                Some(p) => p,
                None => cfg.inverted_window_policy()?,
            };
            let options = BuildOptions {
                bound,
                policy,
                max_companies: limit.or(cfg.max_companies),
                today,
            };
            info!(bound = %bound, policy = %policy, db = %repo.db_path().display(), "build");

            let selector: Arc<dyn CompanySelectorPort> = Arc::clone(&repo) as _;
            let reader: Arc<dyn EmploymentReader> = Arc::clone(&repo) as _;
            let writer: Arc<dyn EdgeWriterPort> = Arc::clone(&repo) as _;
            let builder = GraphBuilder::new(selector, reader, writer, options);

            let mut reporter = ProgressReporter::new(
                cfg.progress_every_or_default(),
                cfg.large_company_edges_or_default(),
            );
            if !no_progress && std::io::stderr().is_terminal() {
                let bar: Arc<dyn ProgressSink> = Arc::new(BarProgress::new());
                reporter = reporter.with_sink(bar);
            }

            let summary = builder.run(&mut reporter).await?;
            println!(
                "processed {} companies, added {} edges ({} already present) in {:.1}s",
                summary.companies_processed,
                summary.edges_added,
                summary.edges_already_present,
                summary.elapsed_ms as f64 / 1000.0
            );
        }
        Commands::Import {
            companies,
            employment,
        } => {
            if companies.is_none() && employment.is_none() {
                anyhow::bail!("nothing to import: pass --companies and/or --employment");
            }
            let store: Arc<dyn EmploymentImportPort> = Arc::clone(&repo) as _;
            let service = ImportService::new(store);
            if let Some(path) = companies {
                let r = service.import_companies(&path).await?;
                println!(
                    "companies: {} read, {} saved, {} rejected",
                    r.rows_read, r.rows_saved, r.rows_rejected
                );
            }
            if let Some(path) = employment {
                let r = service.import_employment(&path).await?;
                println!(
                    "employment: {} read, {} saved, {} rejected",
                    r.rows_read, r.rows_saved, r.rows_rejected
                );
            }
        }
        Commands::Status { max_size, json } => {
            let bound = SizeBound::AtMost(max_size.unwrap_or_else(|| cfg.max_size_or_default()));
            let status = graph_status(repo.as_ref(), repo.as_ref(), bound).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("edges:                 {}", status.edges);
                println!("processed companies:   {}", status.processed_companies);
                println!(
                    "pending (size {}):    {} ({} pairs)",
                    bound, status.pending_within_bound, status.pending_pairs_within_bound
                );
                println!(
                    "deferred (above tier): {}{}",
                    status.pending_above_bound,
                    status
                        .largest_pending
                        .map(|n| format!(", largest {} employees", n))
                        .unwrap_or_default()
                );
            }
        }
    }

    Ok(())
}

/// Unbounded runs enumerate every pair of the largest companies; ask before starting one.
fn confirm_unbounded() -> anyhow::Result<()> {
    let answer = inquire::Confirm::new(
        "Unbounded run: companies of any size will be fully enumerated. Continue?",
    )
    .with_default(false)
    .prompt();
    match answer {
        Ok(true) => Ok(()),
        Ok(false) => Err(coworker_graph::domain::DomainError::Aborted(
            "unbounded run declined".into(),
        )
        .into()),
        Err(e) => {
            warn!(error = %e, "cannot prompt for confirmation; pass --yes to run unbounded");
            Err(coworker_graph::domain::DomainError::Aborted(e.to_string()).into())
        }
    }
}
