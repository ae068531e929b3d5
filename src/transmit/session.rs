//! Producer recording session
//!
//! Glue between the tracking feed, the feature store and the encoder. A
//! recording clears the store and, when a link is up, arms transmission.
//! Attaching a link mid-recording arms it; losing the link disarms.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWrite;
use tracing::{info, warn};

use crate::config::Config;
use crate::features::{FeatureSnapshot, FeatureStore, SharedFeatureStore};
use crate::transmit::{EmitOutcome, EncoderStats, TelemetryEncoder};

/// Readout for status displays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProducerStatus {
    /// Link attached and healthy
    pub connected: bool,
    /// Samples are being sent
    pub armed: bool,
    /// A recording is in progress
    pub recording: bool,
    /// Distinct features seen this recording
    pub feature_count: usize,
    /// Encoder counters
    pub encoder: EncoderStats,
}

/// Device-side session state
pub struct ProducerSession {
    features: SharedFeatureStore,
    encoder: TelemetryEncoder,
    recording: AtomicBool,
}

impl ProducerSession {
    /// Create an idle session
    pub fn new(features: SharedFeatureStore, encoder: TelemetryEncoder) -> Self {
        Self {
            features,
            encoder,
            recording: AtomicBool::new(false),
        }
    }

    /// Build a session from the `[features]` and `[transmit]` sections
    pub fn from_config(config: &Config) -> Self {
        let capacity = config.features.capacity;
        let max_features = config.features.max_features.unwrap_or(capacity);
        Self::new(
            SharedFeatureStore::new(FeatureStore::with_limits(capacity, max_features)),
            TelemetryEncoder::new(config.transmit.queue_capacity),
        )
    }

    /// Begin a recording with an empty store
    pub fn start_recording(&self) {
        self.features.clear();
        self.recording.store(true, Ordering::Release);

        if self.encoder.is_connected() {
            self.encoder.arm();
            info!("Recording started, transmitting");
        } else {
            warn!("Recording started but link is not connected; poses will not be sent");
        }
    }

    /// End the recording; the store keeps its contents for readout
    pub fn stop_recording(&self) {
        if self.recording.swap(false, Ordering::AcqRel) {
            info!(
                "Recording stopped with {} features",
                self.features.size()
            );
        }
        self.encoder.disarm();
    }

    /// Attach a transport, arming it if a recording is running
    pub fn attach_link<W>(&self, writer: W)
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        self.encoder.attach(writer);
        if self.is_recording() {
            self.encoder.arm();
        }
    }

    /// Drop the transport and disarm
    pub fn detach_link(&self) {
        self.encoder.disarm();
        self.encoder.detach();
    }

    /// Stop recording and flush the link
    pub async fn finish(&self) {
        self.stop_recording();
        self.encoder.shutdown().await;
    }

    /// Tracking callback: one feature sighting
    ///
    /// Returns false when the store refused it.
    #[allow(clippy::too_many_arguments)]
    pub fn on_feature(&self, id: i64, x: f32, y: f32, z: f32, r: f32, g: f32, b: f32) -> bool {
        self.features.upsert(id, x, y, z, r, g, b).is_ok()
    }

    /// Tracking callback: one pose tick
    pub fn on_pose(&self, tx: f64, ty: f64) -> EmitOutcome {
        self.encoder.emit(tx, ty)
    }

    /// True while recording
    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::Acquire)
    }

    /// Shared store handle for readers
    pub fn features(&self) -> &SharedFeatureStore {
        &self.features
    }

    /// Underlying encoder
    pub fn encoder(&self) -> &TelemetryEncoder {
        &self.encoder
    }

    /// Copy of the current store contents
    pub fn snapshot(&self) -> FeatureSnapshot {
        self.features.snapshot()
    }

    /// Connection, armed and recording flags plus counts
    pub fn status(&self) -> ProducerStatus {
        ProducerStatus {
            connected: self.encoder.is_connected(),
            armed: self.encoder.is_armed(),
            recording: self.is_recording(),
            feature_count: self.features.size(),
            encoder: self.encoder.stats(),
        }
    }
}
