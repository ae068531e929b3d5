//! Outgoing Telemetry
//!
//! Producer side of the link. Pose ticks arrive on the tracking callback and
//! must never wait on the transport, so [`TelemetryEncoder::emit`] only
//! enqueues; a writer task owns the transport:
//!
//! ```text
//! Tracking callback
//!      │ emit(tx, ty)            (never blocks)
//!      ▼
//! Sample queue (bounded, try_send; newest dropped when full)
//!      │
//!      ▼
//! Writer task ── FramedWrite<TelemetryCodec> ──> transport
//! ```
//!
//! Delivery is at-most-once. There is no retry: a failed write drops that
//! one sample and the writer carries on with the next. The link only goes
//! down when it is detached or shut down.

pub mod feed;
pub mod session;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use futures::SinkExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::codec::FramedWrite;
use tracing::{debug, info, trace, warn};

use crate::protocol::{MotionSample, ProtocolError, TelemetryCodec};

pub use feed::{parse_feed, parse_feed_line, FeedError, FeedEvent};
pub use session::{ProducerSession, ProducerStatus};

/// Default depth of the sample queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// What happened to one emitted sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitOutcome {
    /// Handed to the writer task
    Queued,
    /// Transmission is not armed
    Disarmed,
    /// No link attached
    NotConnected,
    /// Writer is behind; sample dropped
    QueueFull,
    /// NaN or infinite component; sample dropped
    Invalid,
}

/// Encoder counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderStats {
    /// Samples accepted into the queue
    pub queued: u64,
    /// Samples written to the transport
    pub sent: u64,
    /// Dropped because the queue was full
    pub dropped_queue_full: u64,
    /// Dropped because transmission was disarmed
    pub dropped_disarmed: u64,
    /// Dropped because no link was up
    pub dropped_not_connected: u64,
    /// Dropped for a non-finite component
    pub dropped_invalid: u64,
    /// Transport writes that failed
    pub write_failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    queued: AtomicU64,
    sent: AtomicU64,
    dropped_queue_full: AtomicU64,
    dropped_disarmed: AtomicU64,
    dropped_not_connected: AtomicU64,
    dropped_invalid: AtomicU64,
    write_failures: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> EncoderStats {
        EncoderStats {
            queued: self.queued.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
            dropped_queue_full: self.dropped_queue_full.load(Ordering::Relaxed),
            dropped_disarmed: self.dropped_disarmed.load(Ordering::Relaxed),
            dropped_not_connected: self.dropped_not_connected.load(Ordering::Relaxed),
            dropped_invalid: self.dropped_invalid.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
        }
    }
}

/// Attached transport
struct LinkWriter {
    tx: mpsc::Sender<MotionSample>,
    task: JoinHandle<()>,
    connected: Arc<AtomicBool>,
}

/// Formats pose ticks and ships them over the attached link
pub struct TelemetryEncoder {
    armed: AtomicBool,
    link: Mutex<Option<LinkWriter>>,
    counters: Arc<Counters>,
    queue_capacity: usize,
}

impl TelemetryEncoder {
    /// Create a disarmed encoder with no link
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            armed: AtomicBool::new(false),
            link: Mutex::new(None),
            counters: Arc::new(Counters::default()),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Start writing to `writer`, replacing any previous link
    ///
    /// Must be called within a Tokio runtime.
    pub fn attach<W>(&self, writer: W)
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let connected = Arc::new(AtomicBool::new(true));
        let task = tokio::spawn(write_loop(
            writer,
            rx,
            Arc::clone(&connected),
            Arc::clone(&self.counters),
        ));

        let previous = self.link.lock().replace(LinkWriter {
            tx,
            task,
            connected,
        });
        if let Some(previous) = previous {
            debug!("Replacing existing telemetry link");
            previous.connected.store(false, Ordering::Release);
            previous.task.abort();
        }

        info!(
            "Telemetry link attached (queue capacity {})",
            self.queue_capacity
        );
    }

    /// Drop the link immediately; queued samples are discarded
    pub fn detach(&self) {
        if let Some(link) = self.link.lock().take() {
            link.connected.store(false, Ordering::Release);
            link.task.abort();
            info!("Telemetry link detached");
        }
    }

    /// Close the link after the queue drains
    pub async fn shutdown(&self) {
        let link = self.link.lock().take();
        if let Some(LinkWriter { tx, task, .. }) = link {
            drop(tx);
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!("Telemetry writer ended abnormally: {}", e);
                }
            }
        }
    }

    /// Allow samples onto the link
    pub fn arm(&self) {
        if !self.armed.swap(true, Ordering::AcqRel) {
            debug!("Telemetry armed");
        }
    }

    /// Stop sending; samples already queued still go out
    pub fn disarm(&self) {
        if self.armed.swap(false, Ordering::AcqRel) {
            debug!("Telemetry disarmed");
        }
    }

    /// True while armed
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    /// True while a link is attached
    pub fn is_connected(&self) -> bool {
        self.link
            .lock()
            .as_ref()
            .is_some_and(|link| link.connected.load(Ordering::Acquire))
    }

    /// Send one pose tick
    ///
    /// Never blocks. Anything other than [`EmitOutcome::Queued`] means the
    /// sample was dropped.
    pub fn emit(&self, tx: f64, ty: f64) -> EmitOutcome {
        let sample = MotionSample::new(tx, ty);
        let outcome = self.try_emit(sample);

        let counter = match outcome {
            EmitOutcome::Queued => &self.counters.queued,
            EmitOutcome::Disarmed => &self.counters.dropped_disarmed,
            EmitOutcome::NotConnected => &self.counters.dropped_not_connected,
            EmitOutcome::QueueFull => &self.counters.dropped_queue_full,
            EmitOutcome::Invalid => &self.counters.dropped_invalid,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        outcome
    }

    fn try_emit(&self, sample: MotionSample) -> EmitOutcome {
        if !self.is_armed() {
            return EmitOutcome::Disarmed;
        }
        if !sample.is_finite() {
            debug!("Dropping non-finite sample ({}, {})", sample.dx, sample.dy);
            return EmitOutcome::Invalid;
        }

        let link = self.link.lock();
        let Some(link) = link.as_ref() else {
            return EmitOutcome::NotConnected;
        };
        if !link.connected.load(Ordering::Acquire) {
            return EmitOutcome::NotConnected;
        }

        match link.tx.try_send(sample) {
            Ok(()) => EmitOutcome::Queued,
            Err(TrySendError::Full(_)) => {
                trace!("Sample queue full, dropping ({}, {})", sample.dx, sample.dy);
                EmitOutcome::QueueFull
            }
            Err(TrySendError::Closed(_)) => EmitOutcome::NotConnected,
        }
    }

    /// Counters so far
    pub fn stats(&self) -> EncoderStats {
        self.counters.snapshot()
    }
}

impl Default for TelemetryEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl Drop for TelemetryEncoder {
    fn drop(&mut self) {
        if let Some(link) = self.link.get_mut().take() {
            link.task.abort();
        }
    }
}

async fn write_loop<W>(
    writer: W,
    mut rx: mpsc::Receiver<MotionSample>,
    connected: Arc<AtomicBool>,
    counters: Arc<Counters>,
) where
    W: AsyncWrite + Unpin,
{
    let mut sink = FramedWrite::new(writer, TelemetryCodec::new());

    while let Some(sample) = rx.recv().await {
        match sink.send(sample).await {
            Ok(()) => {
                counters.sent.fetch_add(1, Ordering::Relaxed);
            }
            Err(ProtocolError::Io(e)) => {
                counters.write_failures.fetch_add(1, Ordering::Relaxed);
                warn!("Telemetry write failed, dropping sample: {}", e);
                // No retry: the failed record must not ride along with the next one
                sink.write_buffer_mut().clear();
            }
            Err(e) => {
                counters.write_failures.fetch_add(1, Ordering::Relaxed);
                warn!("Dropping sample: {}", e);
            }
        }
    }

    connected.store(false, Ordering::Release);
    if let Err(e) = sink.close().await {
        debug!("Closing telemetry transport: {}", e);
    }
    debug!("Telemetry writer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::AsyncReadExt;

    /// Writer whose every write fails
    struct BrokenPipe;

    impl AsyncWrite for BrokenPipe {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "radio gone")))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    /// Writer whose first write fails, then passes through
    struct FailOnce<W> {
        inner: W,
        failed: bool,
    }

    impl<W: AsyncWrite + Unpin> AsyncWrite for FailOnce<W> {
        fn poll_write(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            if !self.failed {
                self.failed = true;
                return Poll::Ready(Err(io::Error::new(io::ErrorKind::TimedOut, "radio busy")));
            }
            Pin::new(&mut self.inner).poll_write(cx, buf)
        }

        fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Pin::new(&mut self.inner).poll_flush(cx)
        }

        fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Pin::new(&mut self.inner).poll_shutdown(cx)
        }
    }

    /// Writer that never accepts a byte
    struct Stalled;

    impl AsyncWrite for Stalled {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Pending
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Pending
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Pending
        }
    }

    #[tokio::test]
    async fn test_emit_writes_records() {
        let (client, mut server) = tokio::io::duplex(1024);
        let encoder = TelemetryEncoder::new(8);
        encoder.attach(client);
        encoder.arm();

        assert_eq!(encoder.emit(0.0, 0.0), EmitOutcome::Queued);
        assert_eq!(encoder.emit(0.0005, -0.0002), EmitOutcome::Queued);
        encoder.shutdown().await;

        let mut received = String::new();
        server.read_to_string(&mut received).await.unwrap();
        assert_eq!(received, "0.0 0.0\n0.0005 -0.0002\n");
        assert_eq!(encoder.stats().sent, 2);
        assert!(!encoder.is_connected());
    }

    #[tokio::test]
    async fn test_not_connected_is_noop() {
        let encoder = TelemetryEncoder::default();
        encoder.arm();

        assert_eq!(encoder.emit(1.0, 2.0), EmitOutcome::NotConnected);
        assert_eq!(encoder.stats().dropped_not_connected, 1);
    }

    #[tokio::test]
    async fn test_disarmed_samples_never_reach_the_link() {
        let (client, mut server) = tokio::io::duplex(1024);
        let encoder = TelemetryEncoder::new(8);
        encoder.attach(client);

        assert_eq!(encoder.emit(1.0, 1.0), EmitOutcome::Disarmed);
        encoder.arm();
        assert_eq!(encoder.emit(2.0, 2.0), EmitOutcome::Queued);
        encoder.disarm();
        assert_eq!(encoder.emit(3.0, 3.0), EmitOutcome::Disarmed);
        encoder.shutdown().await;

        let mut received = String::new();
        server.read_to_string(&mut received).await.unwrap();
        assert_eq!(received, "2.0 2.0\n");
        assert_eq!(encoder.stats().dropped_disarmed, 2);
    }

    #[tokio::test]
    async fn test_stalled_transport_never_blocks_emit() {
        let encoder = TelemetryEncoder::new(4);
        encoder.attach(Stalled);
        encoder.arm();

        let outcomes: Vec<_> = (0..100).map(|i| encoder.emit(i as f64, 0.0)).collect();

        // Queue depth plus at most one sample held by the writer
        let queued = outcomes.iter().filter(|o| **o == EmitOutcome::Queued).count();
        assert!((4..=5).contains(&queued));
        assert_eq!(outcomes[99], EmitOutcome::QueueFull);
        assert_eq!(encoder.stats().dropped_queue_full as usize, 100 - queued);

        encoder.detach();
        assert!(!encoder.is_connected());
    }

    #[tokio::test]
    async fn test_write_failure_drops_sample_and_continues() {
        let encoder = TelemetryEncoder::new(8);
        encoder.attach(BrokenPipe);
        encoder.arm();

        for i in 1..=3u64 {
            assert_eq!(encoder.emit(i as f64, i as f64), EmitOutcome::Queued);
            for _ in 0..100 {
                if encoder.stats().write_failures == i {
                    break;
                }
                tokio::task::yield_now().await;
            }
            assert_eq!(encoder.stats().write_failures, i);
            assert!(encoder.is_connected());
        }

        assert_eq!(encoder.stats().sent, 0);
        assert_eq!(encoder.stats().dropped_not_connected, 0);
        encoder.detach();
    }

    #[tokio::test]
    async fn test_failed_sample_is_not_resent() {
        let (client, mut server) = tokio::io::duplex(1024);
        let encoder = TelemetryEncoder::new(8);
        encoder.attach(FailOnce {
            inner: client,
            failed: false,
        });
        encoder.arm();

        assert_eq!(encoder.emit(1.0, 1.0), EmitOutcome::Queued);
        assert_eq!(encoder.emit(2.0, 2.0), EmitOutcome::Queued);
        encoder.shutdown().await;

        let mut received = String::new();
        server.read_to_string(&mut received).await.unwrap();
        assert_eq!(received, "2.0 2.0\n");
        let stats = encoder.stats();
        assert_eq!(stats.write_failures, 1);
        assert_eq!(stats.sent, 1);
    }

    #[tokio::test]
    async fn test_non_finite_sample_rejected() {
        let (client, _server) = tokio::io::duplex(64);
        let encoder = TelemetryEncoder::new(8);
        encoder.attach(client);
        encoder.arm();

        assert_eq!(encoder.emit(f64::NAN, 0.0), EmitOutcome::Invalid);
        assert_eq!(encoder.emit(0.0, f64::INFINITY), EmitOutcome::Invalid);
        assert_eq!(encoder.stats().dropped_invalid, 2);
    }
}
