//! CLI entry point for calor-daq.
//!
//! Provides three commands:
//! - `run`: ingest newline-delimited JSON payloads from a file or stdin
//! - `simulate`: drive the mock rig through a scripted experiment
//! - `check`: classify a payload capture without ingesting it
//!
//! # Usage
//!
//! ```bash
//! mosquitto_sub -t edukit/suhu | calor-daq run --input -
//! calor-daq simulate --steps 30 --export table.csv --json snapshot.json
//! calor-daq check --input capture.ndjson
//! ```

use anyhow::{Context, Result};
use calor_daq::app_actor::CalorimeterHandle;
use calor_daq::config::{CalorConfig, DEFAULT_CONFIG_PATH};
use calor_daq::core::Calorimeter;
use calor_daq::data::storage::{sink_from_config, spawn_sink_worker};
use calor_daq::reading::{self, Payload};
use calor_daq::simulator::ProbeRig;
use calor_daq::snapshot::{Live, Snapshot};
use calor_daq::{tracing_init, transport};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

#[derive(Parser)]
#[command(name = "calor-daq")]
#[command(about = "Three-probe mixing calorimetry acquisition", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest NDJSON payloads and log the status line periodically
    Run {
        /// Configuration file
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Payload source; `-` reads stdin
        #[arg(long, default_value = "-")]
        input: String,
    },

    /// Run a scripted experiment against the simulated rig
    Simulate {
        /// Configuration file
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Total readings to generate
        #[arg(long, default_value_t = 30)]
        steps: usize,

        /// Delay between readings
        #[arg(long, default_value_t = 100)]
        interval_ms: u64,

        /// Write the final display table as CSV
        #[arg(long)]
        export: Option<PathBuf>,

        /// Dump the final snapshot as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Classify NDJSON payloads by layout and report malformed lines
    Check {
        /// Payload source; `-` reads stdin
        #[arg(long, default_value = "-")]
        input: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, input } => run(&config, &input).await,
        Commands::Simulate {
            config,
            steps,
            interval_ms,
            export,
            json,
        } => {
            let outputs = Outputs {
                table: export.as_deref(),
                json: json.as_deref(),
            };
            simulate(&config, steps, interval_ms, outputs).await
        }
        Commands::Check { input } => check(&input).await,
    }
}

fn load_config(path: &Path) -> Result<CalorConfig> {
    let config = CalorConfig::load_from(path)
        .with_context(|| format!("loading configuration from {}", path.display()))?;
    config.validate()?;
    tracing_init::init_from_config(&config).map_err(anyhow::Error::msg)?;
    tracing::info!(
        name = %config.application.name,
        capacity = config.buffer.capacity,
        specific_heat = config.calorimetry.specific_heat,
        "Configuration loaded"
    );
    Ok(config)
}

fn start(config: &CalorConfig) -> (CalorimeterHandle, JoinHandle<()>) {
    let sink = spawn_sink_worker(sink_from_config(&config.storage));
    CalorimeterHandle::spawn(
        Calorimeter::from_config(config),
        sink,
        config.transport.command_channel_capacity,
    )
}

async fn open_input(input: &str) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    if input == "-" {
        return Ok(Box::new(BufReader::new(tokio::io::stdin())));
    }
    let file = tokio::fs::File::open(input)
        .await
        .with_context(|| format!("opening {input}"))?;
    Ok(Box::new(BufReader::new(file)))
}

async fn run(config_path: &Path, input: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let (handle, actor) = start(&config);
    let reader = open_input(input).await?;

    let transport_handle = handle.clone();
    let mut ingest = tokio::spawn(async move {
        transport::run_line_transport(reader, &transport_handle).await
    });

    let mut poll = tokio::time::interval(Duration::from_millis(config.transport.poll_interval_ms));
    loop {
        tokio::select! {
            _ = poll.tick() => {
                let snapshot = handle.snapshot().await?;
                tracing::info!("{}", snapshot.status_line(&config.transport.topic));
            }
            stopped = &mut ingest => {
                let (stats, reason) = stopped?;
                tracing::info!(accepted = stats.accepted, rejected = stats.rejected, %reason, "Input finished");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                ingest.abort();
                break;
            }
        }
    }

    let snapshot = handle.snapshot().await?;
    println!("{}", snapshot.status_line(&config.transport.topic));
    handle.shutdown().await?;
    actor.await?;
    Ok(())
}

/// Files written at the end of a simulated run.
struct Outputs<'a> {
    table: Option<&'a Path>,
    json: Option<&'a Path>,
}

async fn simulate(
    config_path: &Path,
    steps: usize,
    interval_ms: u64,
    outputs: Outputs<'_>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let (handle, actor) = start(&config);
    let mut rig = ProbeRig::with_vessels(
        0x5EED,
        config.calorimetry.cold_vessel(),
        config.calorimetry.hot_vessel(),
    );
    let interval = Duration::from_millis(interval_ms);
    let measuring = (steps / 3).max(2);
    let mixing = steps.saturating_sub(measuring).max(1);

    tracing::info!(measuring, mixing, "Starting simulated experiment");
    feed(&handle, &mut rig, measuring, interval).await?;

    handle.lock().await?;
    handle.start_mixing().await?;
    rig.start_mixing();
    feed(&handle, &mut rig, mixing, interval).await?;
    handle.stop_and_lock().await?;

    let snapshot = handle.snapshot().await?;
    report(&snapshot, &config.transport.topic);
    if let Some(path) = outputs.table {
        let file = std::fs::File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        snapshot.export_table(file)?;
        tracing::info!(path = %path.display(), rows = snapshot.len(), "Exported table");
    }
    if let Some(path) = outputs.json {
        std::fs::write(path, snapshot.to_json()?)
            .with_context(|| format!("writing {}", path.display()))?;
        tracing::info!(path = %path.display(), "Wrote snapshot");
    }

    handle.unlock().await?;
    handle.reset().await?;
    rig.reset();
    handle.shutdown().await?;
    actor.await?;
    Ok(())
}

async fn feed(
    handle: &CalorimeterHandle,
    rig: &mut ProbeRig,
    count: usize,
    interval: Duration,
) -> Result<()> {
    for _ in 0..count {
        handle.ingest(rig.next_payload()).await?;
        if !interval.is_zero() {
            tokio::time::sleep(interval).await;
        }
    }
    Ok(())
}

fn report(snapshot: &Snapshot, topic: &str) {
    println!("{}", snapshot.status_line(topic));
    match snapshot.live() {
        Live::Ready {
            q_released,
            q_absorbed,
            ..
        } => {
            println!("  Q released: {q_released:.2} J");
            println!("  Q absorbed: {q_absorbed:.2} J");
        }
        Live::NotReady => println!("  Not enough data for a heat estimate"),
    }
}

async fn check(input: &str) -> Result<()> {
    let mut lines = open_input(input).await?.lines();
    let (mut nested, mut single, mut malformed) = (0u64, 0u64, 0u64);
    let mut number = 0u64;

    while let Some(line) = lines.next_line().await? {
        number += 1;
        let payload = line.trim();
        if payload.is_empty() {
            continue;
        }
        match reading::classify(payload.as_bytes(), chrono::Utc::now()) {
            Ok(Payload::Probes(_)) => nested += 1,
            Ok(Payload::Single(_)) => single += 1,
            Err(e) => {
                malformed += 1;
                println!("line {number}: {e}");
            }
        }
    }

    println!("three-probe: {nested}  single-probe: {single}  malformed: {malformed}");
    Ok(())
}
