//! Configuration type definitions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Receiving server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "0.0.0.0:4444")
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Close a link after this many seconds without data (0 = never)
    #[serde(default)]
    pub idle_timeout_secs: u64,

    /// Longest accepted telemetry line in bytes
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
}

fn default_listen_addr() -> String {
    "0.0.0.0:4444".to_string()
}

fn default_max_line_length() -> usize {
    crate::protocol::DEFAULT_MAX_LINE_LENGTH
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            idle_timeout_secs: 0,
            max_line_length: default_max_line_length(),
        }
    }
}

/// Delta-to-position mapping configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapperConfig {
    /// Pixels per pose unit
    #[serde(default = "default_gain")]
    pub gain: f64,

    /// Screen width used when the pointer backend reports none
    #[serde(default = "default_screen_width")]
    pub screen_width: u32,

    /// Screen height used when the pointer backend reports none
    #[serde(default = "default_screen_height")]
    pub screen_height: u32,

    /// Re-read the live pointer position when a link starts
    #[serde(default = "default_true")]
    pub resync_on_session_start: bool,
}

fn default_gain() -> f64 {
    crate::cursor::DEFAULT_GAIN
}
fn default_screen_width() -> u32 {
    1920
}
fn default_screen_height() -> u32 {
    1080
}
fn default_true() -> bool {
    true
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            gain: default_gain(),
            screen_width: default_screen_width(),
            screen_height: default_screen_height(),
            resync_on_session_start: true,
        }
    }
}

/// Where pointer moves are sent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerKind {
    /// Desktop pointer through the RemoteDesktop portal
    #[default]
    Portal,
    /// In-memory pointer for headless runs
    Virtual,
}

/// Pointer movement synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActuatorConfig {
    /// Pointer backend
    #[serde(default)]
    pub pointer: PointerKind,

    /// Pointer updates per second while moving
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Shortest movement duration (ms)
    #[serde(default = "default_min_duration_ms")]
    pub min_duration_ms: u64,

    /// Longest movement duration (ms)
    #[serde(default = "default_max_duration_ms")]
    pub max_duration_ms: u64,

    /// Movement duration per pixel of distance (ms)
    #[serde(default = "default_ms_per_pixel")]
    pub ms_per_pixel: f64,

    /// Sideways bow of the path as a fraction of distance (0.0-0.5)
    #[serde(default = "default_deviation")]
    pub deviation: f64,
}

fn default_fps() -> u32 {
    30
}
fn default_min_duration_ms() -> u64 {
    10
}
fn default_max_duration_ms() -> u64 {
    400
}
fn default_ms_per_pixel() -> f64 {
    1.0
}
fn default_deviation() -> f64 {
    0.08
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            pointer: PointerKind::default(),
            fps: default_fps(),
            min_duration_ms: default_min_duration_ms(),
            max_duration_ms: default_max_duration_ms(),
            ms_per_pixel: default_ms_per_pixel(),
            deviation: default_deviation(),
        }
    }
}

/// Producer-side transmission configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransmitConfig {
    /// Samples buffered between the tracking callback and the transport
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_queue_capacity() -> usize {
    64
}

impl Default for TransmitConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Feature store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    /// Accepted identity range `[0, capacity)`
    #[serde(default = "default_feature_capacity")]
    pub capacity: usize,

    /// Distinct identities kept (defaults to `capacity`)
    #[serde(default)]
    pub max_features: Option<usize>,
}

fn default_feature_capacity() -> usize {
    crate::features::DEFAULT_CAPACITY
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            capacity: default_feature_capacity(),
            max_features: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level ("trace", "debug", "info", "warn", "error")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for log files (None = console only)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
        }
    }
}
