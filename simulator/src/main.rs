//! Satrate Simulator
//!
//! Runs the tracker against a synthetic random-walk quote feed and prints
//! the resulting cross-rate series.

use std::time::Duration;

use clap::Parser;
use satrate_common::{parse_symbol_list, Symbol};
use satrate_tracker::TrackerConfig;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod controller;
mod feed;

use controller::{SimulationController, SimulationSettings};

/// Satrate Simulator CLI
#[derive(Parser, Debug)]
#[command(name = "simulator")]
#[command(about = "Satrate rate tracker simulation environment")]
struct Args {
    /// Comma separated currencies to track
    #[arg(short, long, default_value = "USD,EUR,ETH")]
    symbols: String,

    /// Ingestion ticks to run
    #[arg(short, long, default_value = "20")]
    ticks: u64,

    /// Milliseconds between ingestion ticks
    #[arg(long, default_value = "100")]
    interval_ms: u64,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Maximum price move per quote, in basis points
    #[arg(long, default_value = "50")]
    volatility_bps: u32,

    /// Fraction of quotes that fail
    #[arg(long, default_value = "0.0")]
    failure_rate: f64,

    /// Currency to price
    #[arg(long, default_value = "ETH")]
    priced: String,

    /// Currency to express the price in
    #[arg(long, default_value = "USD")]
    comparison: String,

    /// Maximum number of rates to print
    #[arg(long)]
    limit: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| TrackerConfig::from_env().log_level),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let settings = SimulationSettings {
        tracked: parse_symbol_list(&args.symbols)?,
        ticks: args.ticks,
        interval: Duration::from_millis(args.interval_ms.max(1)),
        seed: args.seed,
        volatility_bps: args.volatility_bps,
        failure_rate: args.failure_rate,
        priced: Symbol::new(&args.priced)?,
        comparison: Symbol::new(&args.comparison)?,
        limit: args.limit,
    };

    info!("Starting Satrate Simulator");
    info!("Tracked: {:?}", settings.tracked);

    let controller = SimulationController::new(settings)?;
    let report = controller.run().await?;

    info!("Simulation complete");
    info!("Ingestion runs: {}", report.metrics.ingest_runs);
    info!("Samples ingested: {}", report.metrics.samples_ingested);
    info!("Failures: {}", report.metrics.ingest_failures);

    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
