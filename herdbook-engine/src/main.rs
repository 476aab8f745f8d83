//! herdbook - command-line driver for the herdbook engine
//!
//! Reads JSON batches (`{"header": [...], "rows": [[...], ...]}`), runs the
//! requested pipeline stage and prints the result as JSON on stdout. Logs go
//! to stderr.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use herdbook_common::config::{write_toml_config, ConfigResolver, HerdbookConfig};
use herdbook_common::events::EventBus;
use herdbook_engine::ingest::IngestReport;
use herdbook_engine::pedigree::{BatchPredictor, PedigreeRequest, RecordResolver};
use herdbook_engine::sink::{MemorySink, RecordSink};
use herdbook_engine::{EngineSettings, RawBatch};
use serde::Serialize;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for herdbook
#[derive(Parser, Debug)]
#[command(name = "herdbook")]
#[command(about = "Normalize, rank and pedigree-predict dairy-cattle evaluations")]
#[command(version)]
struct Args {
    /// Configuration file (overrides HERDBOOK_CONFIG and the platform default)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest a batch and report accepted records and diagnostics
    Ingest {
        /// JSON batch file
        batch: PathBuf,
    },
    /// Ingest a batch, then score, rank and segment it
    Rank {
        /// JSON batch file
        batch: PathBuf,
    },
    /// Ingest a batch as the ancestor source, then predict each request
    Predict {
        /// JSON batch file with ancestor records
        batch: PathBuf,
        /// JSON array of `{"target", "sire", "mgs", "mggs"}` requests
        requests: PathBuf,
    },
    /// Write the default configuration to a file
    InitConfig {
        /// Destination path
        path: PathBuf,
    },
}

/// `ingest` output: the report plus persistence counts
#[derive(Serialize)]
struct IngestOutput<'a> {
    #[serde(flatten)]
    report: &'a IngestReport,
    persisted: herdbook_engine::sink::PersistSummary,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    if let Command::InitConfig { path } = &args.command {
        write_toml_config(&HerdbookConfig::default(), path)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        println!("{}", path.display());
        return Ok(());
    }

    let resolver = ConfigResolver::new(args.config.clone());
    let config = resolver.load().context("Failed to load configuration")?;

    // Initialize tracing (RUST_LOG overrides the configured level)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting herdbook {}", env!("CARGO_PKG_VERSION"));
    match resolver.resolve_path() {
        Some(path) => info!("Config: {}", path.display()),
        None => info!("Config: built-in defaults"),
    }

    let settings = EngineSettings::from_config(&config)?;
    let events = EventBus::new(256);
    let cancel_token = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(cancel_token.clone()));

    match args.command {
        Command::Ingest { batch } => {
            let batch = read_batch(&batch)?;
            let report = settings
                .ingestor()
                .with_events(events)
                .ingest(&batch, &cancel_token)?;

            let sink = MemorySink::new();
            let persisted = sink.persist(&report.records).await;
            print_json(&IngestOutput {
                report: &report,
                persisted,
            })?;
        }
        Command::Rank { batch } => {
            let batch = read_batch(&batch)?;
            let report = settings
                .ingestor()
                .with_events(events.clone())
                .ingest(&batch, &cancel_token)?;
            let outcome = settings.epoch().with_events(events).run(&report.records)?;
            print_json(&outcome)?;
        }
        Command::Predict { batch, requests } => {
            let batch = read_batch(&batch)?;
            let report = settings
                .ingestor()
                .with_events(events.clone())
                .ingest(&batch, &cancel_token)?;

            let text = std::fs::read_to_string(&requests)
                .with_context(|| format!("Failed to read {}", requests.display()))?;
            let requests: Vec<PedigreeRequest> = serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse {}", requests.display()))?;

            let resolver = Arc::new(RecordResolver::from_records(&report.records));
            let predictor = BatchPredictor::new(resolver, settings.concurrency).with_events(events);
            let prediction = predictor.predict_batch(&requests).await;
            if prediction.failed > 0 {
                warn!(failed = prediction.failed, "Some predictions failed");
            }
            print_json(&prediction)?;
        }
        Command::InitConfig { .. } => {}
    }

    Ok(())
}

fn read_batch(path: &Path) -> Result<RawBatch> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse batch {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Cancel ingestion on Ctrl+C
async fn cancel_on_ctrl_c(token: CancellationToken) {
    if signal::ctrl_c().await.is_ok() {
        warn!("Interrupt received, cancelling");
        token.cancel();
    }
}
