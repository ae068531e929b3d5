//! beetle-server - telemetry receiver
//!
//! Entry point for the server binary.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};

use beetle_link::actuator::open_backend;
use beetle_link::config::{parse_screen_size, Config, PointerKind};
use beetle_link::cursor::ScreenBounds;
use beetle_link::server::BeetleServer;
use beetle_link::utils::{format_user_error, init_logging, verbosity_level, LogFormat};

/// Command-line arguments for beetle-server
#[derive(Parser, Debug)]
#[command(name = "beetle-server")]
#[command(version, about = "Pose telemetry receiver driving the desktop pointer", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, env = "BEETLE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Listen address
    #[arg(short, long, env = "BEETLE_LISTEN_ADDR")]
    pub listen: Option<String>,

    /// Listen port
    #[arg(short, long, env = "BEETLE_PORT")]
    pub port: Option<u16>,

    /// Screen size as WIDTHxHEIGHT (used when the pointer backend reports none)
    #[arg(long, value_parser = parse_screen_size)]
    pub screen: Option<(u32, u32)>,

    /// Drive an in-memory pointer instead of the desktop pointer
    #[arg(long, env = "BEETLE_HEADLESS")]
    pub headless: bool,

    /// Verbose logging (can be specified multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log format
    #[arg(long, value_enum, default_value = "pretty")]
    pub log_format: LogFormat,

    /// Write logs to file (in addition to stdout)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config comes first so [logging] can shape the subscriber
    let config_path = args.config.clone().or_else(Config::default_path);
    let (config, load_error) = match &config_path {
        Some(path) if path.exists() => match Config::load(path) {
            Ok(config) => (config, None),
            Err(e) => (Config::default(), Some(e)),
        },
        _ => (Config::default(), None),
    };

    let level = verbosity_level(args.verbose, &config.logging.level);
    let log_file = args.log_file.clone().or_else(|| {
        config
            .logging
            .log_dir
            .as_ref()
            .map(|dir| dir.join("beetle-server.log"))
    });
    let _log_guard = init_logging(level, args.log_format, log_file.as_deref())?;

    info!("════════════════════════════════════════════════════════");
    info!("  beetle-server v{}", env!("CARGO_PKG_VERSION"));
    info!("  Profile: {}", if cfg!(debug_assertions) { "debug" } else { "release" });
    info!("════════════════════════════════════════════════════════");

    match (&config_path, load_error) {
        (_, Some(e)) => warn!("Failed to load config: {:#}, using defaults", e),
        (Some(path), None) if path.exists() => info!("Configuration loaded from {}", path.display()),
        _ => info!("No config file found, using defaults"),
    }

    let mut config = config.with_overrides(args.listen.clone(), args.port, args.screen);
    if args.headless {
        config.actuator.pointer = PointerKind::Virtual;
    }
    debug!("Config: {:?}", config);

    let bounds = ScreenBounds::new(config.mapper.screen_width, config.mapper.screen_height);
    let pointer = match open_backend(config.actuator.pointer, bounds)
        .await
        .context("Failed to open the pointer backend")
    {
        Ok(pointer) => pointer,
        Err(e) => {
            eprintln!("{}", format_user_error(&e));
            return Err(e);
        }
    };

    let server = match BeetleServer::new(config, pointer) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", format_user_error(&e));
            return Err(e);
        }
    };

    let shutdown = server.shutdown_token();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received");
                shutdown.cancel();
            }
            Err(e) => warn!("Cannot listen for Ctrl-C: {}", e),
        }
    });

    if let Err(e) = server.run().await {
        eprintln!("{}", format_user_error(&e));
        return Err(e);
    }

    let status = server.status().await;
    info!(
        "beetle-server shut down ({} links served, {} rejected)",
        status.links_accepted, status.links_rejected
    );
    Ok(())
}
