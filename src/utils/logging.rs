//! Logging setup shared by the binaries

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Console and file output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    /// Multi-line, human oriented
    #[default]
    Pretty,
    /// One line per event
    Compact,
    /// Newline-delimited JSON
    Json,
}

/// Level from `-v` count, falling back to the configured one
pub fn verbosity_level(verbose: u8, configured: &str) -> &str {
    match verbose {
        0 => configured,
        1 => "debug",
        _ => "trace",
    }
}

/// Filter used when `RUST_LOG` is unset
pub fn default_filter(level: &str) -> String {
    format!("beetle_link={level},beetle_server={level},beetle_feed={level},warn")
}

/// Install the global subscriber
///
/// With `log_file`, events also go to that file through a background
/// writer; keep the returned guard alive until exit or the tail is lost.
pub fn init_logging(
    level: &str,
    format: LogFormat,
    log_file: Option<&Path>,
) -> Result<Option<WorkerGuard>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(level)));

    let (file_writer, guard) = match log_file {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            }
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .with(file_writer.map(|w| {
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(w)
                    .with_ansi(false)
            }))
            .try_init(),
        LogFormat::Compact => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .with(file_writer.map(|w| {
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(w)
                    .with_ansi(false)
            }))
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .with(
                file_writer
                    .map(|w| tracing_subscriber::fmt::layer().with_writer(w).with_ansi(false)),
            )
            .try_init(),
    };
    installed.context("Failed to install log subscriber")?;

    if let Some(path) = log_file {
        tracing::info!("Logging to file: {}", path.display());
    }

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_overrides_configured_level() {
        assert_eq!(verbosity_level(0, "warn"), "warn");
        assert_eq!(verbosity_level(1, "warn"), "debug");
        assert_eq!(verbosity_level(4, "warn"), "trace");
    }

    #[test]
    fn test_default_filter_parses() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            let filter = default_filter(level);
            assert!(filter.starts_with(&format!("beetle_link={level}")));
            assert!(filter.ends_with(",warn"));
            assert!(EnvFilter::try_new(filter).is_ok());
        }
    }
}
