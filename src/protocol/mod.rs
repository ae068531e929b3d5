//! Telemetry Wire Protocol
//!
//! Line-oriented text protocol carrying relative motion samples from the
//! device to the desktop peer over any reliable, ordered byte stream.
//!
//! # Format
//!
//! ```text
//! <float> <float>\n
//! ```
//!
//! No header, length prefix or checksum. The newline is the only framing, so
//! a malformed record never desynchronizes the ones after it:
//!
//! ```text
//! bytes ──> TelemetryCodec ──> Record::Sample(dx, dy) ──> consumer
//!               │
//!               └──────────> Record::Malformed(reason) ──> log + drop
//! ```
//!
//! Transport errors are the only thing that ends a stream.

pub mod codec;
pub mod decoder;
pub mod error;
pub mod record;

pub use codec::{Record, TelemetryCodec, DEFAULT_MAX_LINE_LENGTH};
pub use decoder::{DecodeEnd, DecodeStats, TelemetryDecoder};
pub use error::{ProtocolError, Result};
pub use record::{format_record, parse_record, MotionSample};
