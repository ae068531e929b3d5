//! # beetle-link
//!
//! Pose telemetry link: a mobile tracking device streams relative motion
//! samples over a byte stream, and the desktop peer turns them into smooth
//! pointer motion.
//!
//! # Architecture
//!
//! ```text
//! Producer (device)                          Consumer (desktop)
//!
//! tracking feed ─┬─> FeatureStore            beetle-server
//!                │   (readouts only)           ├─> TelemetryDecoder
//!                │                             ├─> CursorMapper
//!                └─> TelemetryEncoder ──link──>└─> MotionActuator ─> pointer
//! ```
//!
//! # Data Flow
//!
//! **Features:** tracking callback → [`features::SharedFeatureStore`] → status display
//!
//! **Motion:** pose tick → [`transmit::TelemetryEncoder`] → `"<dx> <dy>\n"` →
//! [`protocol::TelemetryDecoder`] → [`cursor::CursorMapper`] →
//! [`actuator::MotionActuator`] → [`actuator::PointerBackend`]

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Pointer movement synthesis and host backends
pub mod actuator;

/// Configuration loading and validation
pub mod config;

/// Delta-to-absolute cursor mapping
pub mod cursor;

/// Tracked feature accumulation
pub mod features;

/// Telemetry wire protocol
pub mod protocol;

/// Receiving server
pub mod server;

/// Producer side: encoder, session, recorded feeds
pub mod transmit;

/// Logging and error formatting for the binaries
pub mod utils;
