//! Telemetry decode loop
//!
//! Pulls records off a transport and hands well-formed samples to the
//! caller. Malformed records are logged and counted, then skipped; the loop
//! only ends when the transport closes or fails.

use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;
use tracing::{debug, warn};

use crate::protocol::codec::{Record, TelemetryCodec};
use crate::protocol::record::MotionSample;

/// Counters for one decode loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// Samples yielded to the consumer
    pub accepted: u64,
    /// Records dropped as malformed
    pub malformed: u64,
    /// Loop ended on a read error rather than a clean close
    pub read_failed: bool,
}

/// Why the decode loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeEnd {
    /// Peer closed the stream
    Closed,
    /// Transport read failed
    ReadError,
}

/// Sample stream over a byte transport
pub struct TelemetryDecoder<R> {
    frames: FramedRead<R, TelemetryCodec>,
    stats: DecodeStats,
    end: Option<DecodeEnd>,
}

impl<R: AsyncRead + Unpin> TelemetryDecoder<R> {
    /// Decode `reader` with the default line limit
    pub fn new(reader: R) -> Self {
        Self::with_codec(reader, TelemetryCodec::new())
    }

    /// Decode `reader` with a custom codec
    pub fn with_codec(reader: R, codec: TelemetryCodec) -> Self {
        Self {
            frames: FramedRead::new(reader, codec),
            stats: DecodeStats::default(),
            end: None,
        }
    }

    /// Next well-formed sample, or `None` once the transport is done
    ///
    /// Cancel-safe: dropping the returned future between records loses no
    /// buffered data.
    pub async fn next_sample(&mut self) -> Option<MotionSample> {
        if self.end.is_some() {
            return None;
        }

        loop {
            match self.frames.next().await {
                Some(Ok(Record::Sample(sample))) => {
                    self.stats.accepted += 1;
                    return Some(sample);
                }
                Some(Ok(Record::Malformed(e))) => {
                    self.stats.malformed += 1;
                    warn!("Dropping record: {}", e);
                }
                Some(Err(e)) => {
                    warn!("Telemetry read failed: {}", e);
                    self.stats.read_failed = true;
                    self.end = Some(DecodeEnd::ReadError);
                    return None;
                }
                None => {
                    debug!("Telemetry stream closed by peer");
                    self.end = Some(DecodeEnd::Closed);
                    return None;
                }
            }
        }
    }

    /// Counters so far
    pub fn stats(&self) -> DecodeStats {
        self.stats
    }

    /// How the loop ended, once it has
    pub fn end(&self) -> Option<DecodeEnd> {
        self.end
    }

    /// Give back the transport; unread buffered bytes are discarded
    pub fn into_inner(self) -> R {
        self.frames.into_inner()
    }
}
