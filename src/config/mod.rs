//! Configuration management
//!
//! Handles loading, validation, and merging of configuration from:
//! - TOML files
//! - Environment variables (through clap)
//! - CLI arguments

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::features::MAX_CAPACITY;

pub mod types;

pub use types::{
    ActuatorConfig, FeaturesConfig, LoggingConfig, MapperConfig, PointerKind, ServerConfig,
    TransmitConfig,
};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Receiving server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Delta-to-position mapping configuration
    #[serde(default)]
    pub mapper: MapperConfig,
    /// Pointer movement configuration
    #[serde(default)]
    pub actuator: ActuatorConfig,
    /// Producer transmission configuration
    #[serde(default)]
    pub transmit: TransmitConfig,
    /// Feature store configuration
    #[serde(default)]
    pub features: FeaturesConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Create default configuration
    pub fn default_config() -> Result<Self> {
        let config = Config::default();
        config.validate()?;
        Ok(config)
    }

    /// Per-user config location (`$XDG_CONFIG_HOME/beetle-link/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("beetle-link").join("config.toml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.server
            .listen_addr
            .parse::<SocketAddr>()
            .context("Invalid listen address")?;

        if self.server.max_line_length < 3 {
            anyhow::bail!(
                "max_line_length ({}) cannot hold a record",
                self.server.max_line_length
            );
        }

        if !self.mapper.gain.is_finite() || self.mapper.gain <= 0.0 {
            anyhow::bail!("Invalid mapper gain: {}", self.mapper.gain);
        }

        if self.mapper.screen_width == 0 || self.mapper.screen_height == 0 {
            anyhow::bail!(
                "Invalid screen size: {}x{}",
                self.mapper.screen_width,
                self.mapper.screen_height
            );
        }

        if self.actuator.fps == 0 || self.actuator.fps > 1000 {
            anyhow::bail!("Invalid actuator fps: {}", self.actuator.fps);
        }

        if self.actuator.min_duration_ms > self.actuator.max_duration_ms {
            anyhow::bail!(
                "min_duration_ms ({}) cannot be greater than max_duration_ms ({})",
                self.actuator.min_duration_ms,
                self.actuator.max_duration_ms
            );
        }

        if !self.actuator.ms_per_pixel.is_finite() || self.actuator.ms_per_pixel < 0.0 {
            anyhow::bail!("Invalid ms_per_pixel: {}", self.actuator.ms_per_pixel);
        }

        if !(0.0..=0.5).contains(&self.actuator.deviation) {
            anyhow::bail!(
                "deviation ({}) must be between 0.0 and 0.5",
                self.actuator.deviation
            );
        }

        if self.transmit.queue_capacity == 0 {
            anyhow::bail!("transmit queue_capacity must be at least 1");
        }

        if self.features.capacity == 0 || self.features.capacity > MAX_CAPACITY {
            anyhow::bail!(
                "features capacity ({}) must be between 1 and {}",
                self.features.capacity,
                MAX_CAPACITY
            );
        }

        if let Some(max) = self.features.max_features {
            if max == 0 || max > self.features.capacity {
                anyhow::bail!(
                    "max_features ({}) must be between 1 and capacity ({})",
                    max,
                    self.features.capacity
                );
            }
        }

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Invalid log level: {}", self.logging.level),
        }

        Ok(())
    }

    /// Override config with CLI arguments
    pub fn with_overrides(
        mut self,
        listen: Option<String>,
        port: Option<u16>,
        screen: Option<(u32, u32)>,
    ) -> Self {
        match (listen, port) {
            (Some(host), Some(port)) => {
                self.server.listen_addr = format!("{}:{}", host, port);
            }
            (Some(host), None) => {
                let port = self
                    .server
                    .listen_addr
                    .parse::<SocketAddr>()
                    .map(|addr| addr.port())
                    .unwrap_or(4444);
                self.server.listen_addr = format!("{}:{}", host, port);
            }
            (None, Some(port)) => {
                if let Ok(mut addr) = self.server.listen_addr.parse::<SocketAddr>() {
                    addr.set_port(port);
                    self.server.listen_addr = addr.to_string();
                }
            }
            (None, None) => {}
        }

        if let Some((width, height)) = screen {
            self.mapper.screen_width = width;
            self.mapper.screen_height = height;
        }

        self
    }

    /// Listen address, already validated
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.server
            .listen_addr
            .parse()
            .context("Invalid listen address")
    }
}

/// Parse a `WIDTHxHEIGHT` screen size argument
pub fn parse_screen_size(value: &str) -> Result<(u32, u32)> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .context("Screen size must look like 1920x1080")?;

    let width: u32 = width.trim().parse().context("Invalid screen width")?;
    let height: u32 = height.trim().parse().context("Invalid screen height")?;

    if width == 0 || height == 0 {
        anyhow::bail!("Screen size must be non-zero: {}", value);
    }

    Ok((width, height))
}
