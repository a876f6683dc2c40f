//! Courier tracking - store visit recorder for courier location streams
//!
//! Reads courier pings, records a visit whenever a courier enters a store's
//! radius and answers travel-history queries over the recorded visits.
//!
//! Module structure:
//! - `domain/` - Core types (Ping, Store, Visit), geo math, errors
//! - `io/` - Adapters (in-memory stores, visit journal, store seed, ping feed)
//! - `services/` - Business logic (VisitRecorder, TravelQueries)
//! - `infra/` - Infrastructure (Config, Metrics)

use anyhow::Context;
use clap::{Parser, Subcommand};
use courier_tracking::domain::geo::DistanceUnit;
use courier_tracking::domain::types::CourierId;
use courier_tracking::infra::{Config, Metrics};
use courier_tracking::io::ping_feed::parse_timestamp;
use courier_tracking::io::{
    load_stores, parse_ping_bytes, InMemoryVisitStore, StaticStoreCatalog, VisitLog,
};
use courier_tracking::services::{TravelQueries, VisitRecorder, VisitRepository};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Courier tracking - store visit recording and travel queries
#[derive(Parser, Debug)]
#[command(name = "courier-tracking", version, about)]
struct Args {
    /// Path to TOML configuration file (falls back to CONFIG_FILE, then config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process JSONL pings from a file (or stdin) until EOF or Ctrl+C
    Ingest {
        /// Ping feed file; reads stdin when omitted
        file: Option<PathBuf>,
    },
    /// List every recorded visit of a courier
    Travels {
        #[arg(long)]
        courier: String,
    },
    /// List a courier's visits at one store within a time range
    Range {
        #[arg(long)]
        courier: String,
        #[arg(long)]
        store: String,
        /// Range start (RFC 3339 or "dd/MM/yyyy HH:mm")
        #[arg(long)]
        start: String,
        /// Range end (RFC 3339 or "dd/MM/yyyy HH:mm")
        #[arg(long)]
        end: String,
    },
    /// Total travel distance of a courier across its visits
    Distance {
        #[arg(long)]
        courier: String,
        /// km or m
        #[arg(long, default_value = "km")]
        unit: DistanceUnit,
    },
    /// List the configured stores
    Stores,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with configurable level via RUST_LOG env var
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    info!(version = %env!("CARGO_PKG_VERSION"), git = %env!("GIT_HASH"), "courier-tracking starting");

    let config = Config::load(args.config.as_deref());
    info!(
        config_file = %config.config_file(),
        radius_m = %config.radius_m(),
        dedup_window_secs = %config.dedup_window_secs(),
        seed_file = %config.stores_seed_file(),
        visit_log = %config.visit_log().unwrap_or("<memory>"),
        "config_loaded"
    );

    let visits = open_visit_store(&config)?;

    match args.command {
        Command::Ingest { file } => ingest(&config, visits, file).await?,
        Command::Travels { courier } => {
            let queries = TravelQueries::new(visits);
            for visit in queries.past_travels(&CourierId::new(courier))? {
                println!("{}", visit.to_json());
            }
        }
        Command::Range { courier, store, start, end } => {
            let start = parse_timestamp(&start).with_context(|| format!("Invalid --start {}", start))?;
            let end = parse_timestamp(&end).with_context(|| format!("Invalid --end {}", end))?;
            let queries = TravelQueries::new(visits);
            for visit in queries.travels_in_range(&CourierId::new(courier), &store, start, end)? {
                println!("{}", visit.to_json());
            }
        }
        Command::Distance { courier, unit } => {
            let queries = TravelQueries::new(visits);
            let total = queries.total_travel_distance(&CourierId::new(courier), unit)?;
            println!("{:.3} {}", total, unit.as_str());
        }
        Command::Stores => {
            let stores = load_stores(config.stores_seed_file()).with_context(|| {
                format!("Failed to load store seed {}", config.stores_seed_file())
            })?;
            for store in stores {
                println!("{}", serde_json::to_string(&store)?);
            }
        }
    }

    Ok(())
}

/// Journal-backed store when configured, otherwise memory only
fn open_visit_store(config: &Config) -> anyhow::Result<Arc<dyn VisitRepository>> {
    match config.visit_log() {
        Some(path) => {
            let log = VisitLog::open(path)
                .with_context(|| format!("Failed to open visit log {}", path))?;
            Ok(Arc::new(log))
        }
        None => {
            warn!("no visit log configured, visits are kept in memory only");
            Ok(Arc::new(InMemoryVisitStore::new()))
        }
    }
}

async fn ingest(
    config: &Config,
    visits: Arc<dyn VisitRepository>,
    file: Option<PathBuf>,
) -> anyhow::Result<()> {
    let stores = load_stores(config.stores_seed_file())
        .with_context(|| format!("Failed to load store seed {}", config.stores_seed_file()))?;

    let metrics = Arc::new(Metrics::new());
    let store_names: Vec<&str> = stores.iter().map(|s| s.name.as_str()).collect();
    metrics.set_stores(&store_names);

    let catalog = Arc::new(StaticStoreCatalog::new(stores));
    let recorder = VisitRecorder::from_config(config, catalog, visits, metrics.clone());

    let reader: Box<dyn AsyncRead + Unpin + Send> = match &file {
        Some(path) => Box::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open ping feed {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdin()),
    };
    let mut lines = BufReader::new(reader).split(b'\n');
    let source = file.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "stdin".into());
    info!(source = %source, "ingest_started");

    let mut report_interval =
        tokio::time::interval(std::time::Duration::from_secs(config.metrics_interval_secs()));
    // First tick completes immediately
    report_interval.tick().await;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut line_no: u64 = 0;
    loop {
        tokio::select! {
            line = lines.next_segment() => {
                let Some(line) = line.context("Failed to read ping feed")? else {
                    break;
                };
                line_no += 1;
                if line.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                match parse_ping_bytes(&line) {
                    // Outcomes are logged and counted by the recorder
                    Ok(ping) => {
                        if let Err(e) = recorder.record_ping(&ping) {
                            if e.is_fatal() {
                                metrics.report().log();
                                return Err(e).context("Visit repository failed, stopping ingest");
                            }
                        }
                    }
                    Err(e) => {
                        metrics.record_invalid_ping();
                        warn!(line = %line_no, error = %e, "ping_invalid");
                    }
                }
            }
            _ = report_interval.tick() => {
                metrics.report().log();
            }
            _ = &mut shutdown => {
                info!("shutdown_signal_received");
                break;
            }
        }
    }

    metrics.report().log();
    info!(
        lines = %line_no,
        visits = %metrics.visits_recorded_total(),
        duplicates = %metrics.duplicates_suppressed_total(),
        "ingest_complete"
    );
    Ok(())
}
