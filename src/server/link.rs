//! One telemetry link
//!
//! Runs the decode loop for an accepted connection and feeds the shared
//! mapper and actuator. When the loop ends, for whatever reason, the mapper
//! goes back to waiting for a baseline, the in-flight move is halted and the
//! transport is shut down.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::actuator::{MotionActuator, PointerBackend};
use crate::cursor::CursorMapper;
use crate::protocol::{DecodeEnd, DecodeStats, MotionSample, TelemetryCodec, TelemetryDecoder};

/// Why a link ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkEnd {
    /// Peer closed the stream
    Closed,
    /// Transport read failed
    ReadError,
    /// Nothing arrived within the idle timeout
    IdleTimeout,
    /// Server shutting down
    Cancelled,
}

/// What one link did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSummary {
    /// Peer description
    pub peer: String,
    /// How it ended
    pub end: LinkEnd,
    /// Samples accepted
    pub accepted: u64,
    /// Records dropped as malformed
    pub malformed: u64,
    /// Targets handed to the actuator
    pub targets: u64,
}

/// Single-link slot and link counters
#[derive(Debug, Default)]
pub(crate) struct LinkSlot {
    active: AtomicBool,
    accepted: AtomicU64,
    rejected: AtomicU64,
}

impl LinkSlot {
    /// Take the slot if free
    pub(crate) fn try_claim(self: &Arc<Self>) -> Option<SlotGuard> {
        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.accepted.fetch_add(1, Ordering::Relaxed);
            Some(SlotGuard(Arc::clone(self)))
        } else {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub(crate) fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub(crate) fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }
}

/// Releases the slot when the link task finishes or unwinds
pub(crate) struct SlotGuard(Arc<LinkSlot>);

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.0.active.store(false, Ordering::Release);
    }
}

/// Everything a link needs from the server
pub(crate) struct LinkContext {
    pub(crate) mapper: Arc<Mutex<CursorMapper>>,
    pub(crate) actuator: Arc<MotionActuator>,
    pub(crate) backend: Arc<dyn PointerBackend>,
    pub(crate) cancel: CancellationToken,
    pub(crate) idle_timeout: Option<Duration>,
    pub(crate) max_line_length: usize,
    pub(crate) resync: bool,
}

/// Next sample, bounded by the idle timeout when one is set
async fn next_sample<R>(
    decoder: &mut TelemetryDecoder<R>,
    idle_timeout: Option<Duration>,
) -> Result<Option<MotionSample>, tokio::time::error::Elapsed>
where
    R: AsyncRead + Unpin,
{
    match idle_timeout {
        Some(limit) => tokio::time::timeout(limit, decoder.next_sample()).await,
        None => Ok(decoder.next_sample().await),
    }
}

pub(crate) async fn run_link<S>(
    mut stream: S,
    peer: String,
    ctx: LinkContext,
    _slot: SlotGuard,
) -> LinkSummary
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    if ctx.resync {
        match ctx.backend.position().await {
            Ok((x, y)) => ctx.mapper.lock().await.resync(x as f64, y as f64),
            Err(e) => debug!("Keeping last cursor position: {}", e),
        }
    }

    info!("Ready to receive data from {}", peer);

    let mut targets = 0u64;
    let (end, stats) = {
        let codec = TelemetryCodec::with_max_line_length(ctx.max_line_length);
        let mut decoder = TelemetryDecoder::with_codec(&mut stream, codec);

        let end = loop {
            let next = tokio::select! {
                _ = ctx.cancel.cancelled() => break LinkEnd::Cancelled,
                next = next_sample(&mut decoder, ctx.idle_timeout) => next,
            };

            match next {
                Ok(Some(sample)) => {
                    let target = ctx.mapper.lock().await.process(sample);
                    if let Some(target) = target {
                        debug!("Pointer target: {:.0}, {:.0}", target.x, target.y);
                        ctx.actuator.move_to(target);
                        targets += 1;
                    }
                }
                Ok(None) => {
                    break match decoder.end() {
                        Some(DecodeEnd::ReadError) => LinkEnd::ReadError,
                        _ => LinkEnd::Closed,
                    };
                }
                Err(_) => {
                    warn!(
                        "No data from {} for {:?}, closing link",
                        peer, ctx.idle_timeout
                    );
                    break LinkEnd::IdleTimeout;
                }
            }
        };

        (end, decoder.stats())
    };

    ctx.mapper.lock().await.reset();
    ctx.actuator.halt();

    if let Err(e) = stream.shutdown().await {
        debug!("Closing {}: {}", peer, e);
    }
    drop(stream);

    let DecodeStats {
        accepted,
        malformed,
        ..
    } = stats;
    info!(
        "Client disconnected: {} ({:?}, {} samples, {} malformed, {} targets)",
        peer, end, accepted, malformed, targets
    );

    LinkSummary {
        peer,
        end,
        accepted,
        malformed,
        targets,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_is_exclusive() {
        let slot = Arc::new(LinkSlot::default());

        let guard = slot.try_claim();
        assert!(guard.is_some());
        assert!(slot.is_active());
        assert!(slot.try_claim().is_none());

        drop(guard);
        assert!(!slot.is_active());
        assert!(slot.try_claim().is_some());
        assert_eq!(slot.accepted(), 2);
        assert_eq!(slot.rejected(), 1);
    }
}
