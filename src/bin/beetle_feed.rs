//! beetle-feed - replay a recorded tracking feed over a telemetry link
//!
//! Stands in for the device: features go into the store, poses are sent to
//! a running beetle-server at a fixed rate.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use beetle_link::config::Config;
use beetle_link::features::FeatureSnapshot;
use beetle_link::transmit::{parse_feed, FeedEvent, ProducerSession, ProducerStatus};
use beetle_link::utils::{format_user_error, init_logging, verbosity_level, LogFormat};

/// Command-line arguments for beetle-feed
#[derive(Parser, Debug)]
#[command(name = "beetle-feed")]
#[command(version, about = "Replay a tracking feed to beetle-server", long_about = None)]
pub struct Args {
    /// Feed file ('F id x y z r g b' and 'P tx ty' lines)
    pub feed: PathBuf,

    /// Server address
    #[arg(short = 'a', long, env = "BEETLE_CONNECT", default_value = "127.0.0.1:4444")]
    pub connect: String,

    /// Pose ticks per second
    #[arg(short, long, default_value_t = 30)]
    pub rate: u32,

    /// Configuration file for [features] and [transmit]
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Include the feature store contents in the report
    #[arg(long)]
    pub snapshot: bool,

    /// Verbose logging (can be specified multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log format
    #[arg(long, value_enum, default_value = "compact")]
    pub log_format: LogFormat,

    /// Write logs to file (in addition to stdout)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// Printed when the replay ends
#[derive(Debug, Serialize)]
struct Report {
    poses: usize,
    features: usize,
    interrupted: bool,
    status: ProducerStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot: Option<FeatureSnapshot>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = init_logging(
        verbosity_level(args.verbose, "info"),
        args.log_format,
        args.log_file.as_deref(),
    )?;

    if let Err(e) = run(args).await {
        eprintln!("{}", format_user_error(&e));
        return Err(e);
    }
    Ok(())
}

async fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default_config()?,
    };

    let text = tokio::fs::read_to_string(&args.feed)
        .await
        .with_context(|| format!("Failed to read feed {}", args.feed.display()))?;
    let events = parse_feed(&text).context("Invalid feed file")?;
    let poses = events
        .iter()
        .filter(|e| matches!(e, FeedEvent::Pose { .. }))
        .count();
    info!(
        "Loaded {} events ({} poses) from {}",
        events.len(),
        poses,
        args.feed.display()
    );

    let stream = TcpStream::connect(&args.connect)
        .await
        .with_context(|| format!("Failed to connect to {}", args.connect))?;
    if let Err(e) = stream.set_nodelay(true) {
        debug!("TCP_NODELAY not set: {}", e);
    }
    info!("Connected to {}", args.connect);

    // The server never talks back; only the write half is used
    let (_read_half, write_half) = stream.into_split();

    let session = ProducerSession::from_config(&config);
    session.attach_link(write_half);
    session.start_recording();

    let interrupted = tokio::select! {
        _ = replay(&session, &events, args.rate) => false,
        _ = interrupt() => true,
    };

    session.finish().await;

    let status = session.status();
    let report = Report {
        poses,
        features: status.feature_count,
        interrupted,
        status,
        snapshot: args.snapshot.then(|| session.snapshot()),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to encode report")?
    );
    Ok(())
}

/// Resolves on Ctrl-C; never, if the signal cannot be watched
async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    warn!("Replay interrupted");
}

async fn replay(session: &ProducerSession, events: &[FeedEvent], rate: u32) {
    let period = Duration::from_secs(1) / rate.max(1);
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    for event in events {
        match *event {
            FeedEvent::Feature {
                id,
                position: [x, y, z],
                color: [r, g, b],
            } => {
                session.on_feature(id, x, y, z, r, g, b);
            }
            FeedEvent::Pose { tx, ty } => {
                ticker.tick().await;
                let outcome = session.on_pose(tx, ty);
                debug!("Pose ({}, {}): {:?}", tx, ty, outcome);
            }
        }
    }
}
