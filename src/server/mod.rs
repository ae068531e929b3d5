//! Receiving Server
//!
//! Accepts telemetry links and turns their samples into pointer motion.
//!
//! # Architecture
//!
//! ```text
//! BeetleServer
//!   ├─> Accept loop (one link at a time; extras are closed with a warning)
//!   ├─> Link task (TelemetryDecoder ─> CursorMapper)
//!   └─> MotionActuator (cancel-and-replace pointer paths ─> PointerBackend)
//! ```
//!
//! # Threading Model
//!
//! The mapper sits behind an async mutex, but only the active link ever
//! locks it for writing. The actuator runs its own task and takes targets
//! without blocking the link.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use beetle_link::actuator::VirtualPointer;
//! use beetle_link::config::Config;
//! use beetle_link::cursor::ScreenBounds;
//! use beetle_link::server::BeetleServer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml")?;
//!     let pointer = Arc::new(VirtualPointer::new(ScreenBounds::new(1920, 1080)));
//!     let server = BeetleServer::new(config, pointer)?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

mod link;

pub use link::{LinkEnd, LinkSummary};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::actuator::{ActuatorStats, MotionActuator, MotionProfile, PointerBackend};
use crate::config::Config;
use crate::cursor::{CursorMapper, CursorState, ScreenBounds};
use link::{LinkContext, LinkSlot};

/// Server readout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerStatus {
    /// A link is being served
    pub link_active: bool,
    /// Links served so far
    pub links_accepted: u64,
    /// Connections turned away while a link was active
    pub links_rejected: u64,
    /// Mapper state
    pub cursor: CursorState,
    /// Actuator counters
    pub actuator: ActuatorStats,
}

/// Telemetry receiving server
pub struct BeetleServer {
    config: Config,
    mapper: Arc<Mutex<CursorMapper>>,
    actuator: Arc<MotionActuator>,
    backend: Arc<dyn PointerBackend>,
    slot: Arc<LinkSlot>,
    shutdown: CancellationToken,
}

impl BeetleServer {
    /// Create the server and start its actuator
    ///
    /// Must be called within a Tokio runtime. Screen bounds come from the
    /// backend when it reports them, otherwise from `[mapper]`.
    pub fn new(config: Config, backend: Arc<dyn PointerBackend>) -> Result<Self> {
        config.validate().context("Invalid server configuration")?;

        let bounds = match backend.screen_size() {
            Some((width, height)) => ScreenBounds::new(width, height),
            None => ScreenBounds::new(config.mapper.screen_width, config.mapper.screen_height),
        };
        info!("Screen size: {}x{}", bounds.width(), bounds.height());

        let mapper = CursorMapper::new(bounds, config.mapper.gain, bounds.center());
        let actuator = MotionActuator::spawn(
            Arc::clone(&backend),
            MotionProfile::from(&config.actuator).with_bounds(bounds),
        );

        Ok(Self {
            config,
            mapper: Arc::new(Mutex::new(mapper)),
            actuator: Arc::new(actuator),
            backend,
            slot: Arc::new(LinkSlot::default()),
            shutdown: CancellationToken::new(),
        })
    }

    /// Bind the configured address and serve until shut down
    pub async fn run(&self) -> Result<()> {
        let addr = self.config.listen_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind listen address {}", addr))?;

        self.serve(listener).await
    }

    /// Serve links from an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let local = listener
            .local_addr()
            .context("Failed to read listener address")?;

        info!("════════════════════════════════════════════════════════");
        info!("  Listening on {}", local);
        info!("  Gain: {}", self.config.mapper.gain);
        info!(
            "  Idle timeout: {}",
            match self.idle_timeout() {
                Some(limit) => format!("{:?}", limit),
                None => "off".to_string(),
            }
        );
        info!("════════════════════════════════════════════════════════");
        info!("Waiting for clients...");

        let mut active: Option<JoinHandle<LinkSummary>> = None;
        loop {
            let accepted = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, peer)) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        debug!("TCP_NODELAY not set for {}: {}", peer, e);
                    }
                    if let Some(link) = self.accept_link(stream, peer.to_string()) {
                        active = Some(link);
                    }
                }
                Err(e) => warn!("Accept failed: {}", e),
            }
        }

        info!("Initiating graceful shutdown");
        if let Some(link) = active {
            if let Err(e) = link.await {
                warn!("Link task ended abnormally: {}", e);
            }
        }
        self.actuator.shutdown().await;
        info!("Server shutdown complete");
        Ok(())
    }

    /// Serve one connection, or turn it away if a link is already active
    ///
    /// Returns the link task when the connection was taken.
    pub fn accept_link<S>(&self, stream: S, peer: String) -> Option<JoinHandle<LinkSummary>>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let Some(slot) = self.slot.try_claim() else {
            warn!("Rejecting {}: another client is already connected", peer);
            tokio::spawn(async move {
                let mut stream = stream;
                if let Err(e) = stream.shutdown().await {
                    debug!("Closing rejected {}: {}", peer, e);
                }
            });
            return None;
        };

        info!("Client connected: {}", peer);

        let ctx = LinkContext {
            mapper: Arc::clone(&self.mapper),
            actuator: Arc::clone(&self.actuator),
            backend: Arc::clone(&self.backend),
            cancel: self.shutdown.child_token(),
            idle_timeout: self.idle_timeout(),
            max_line_length: self.config.server.max_line_length,
            resync: self.config.mapper.resync_on_session_start,
        };

        Some(tokio::spawn(link::run_link(stream, peer, ctx, slot)))
    }

    /// Token that stops the accept loop and the active link
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Request shutdown
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Current readout
    pub async fn status(&self) -> ServerStatus {
        ServerStatus {
            link_active: self.slot.is_active(),
            links_accepted: self.slot.accepted(),
            links_rejected: self.slot.rejected(),
            cursor: self.mapper.lock().await.state(),
            actuator: self.actuator.stats(),
        }
    }

    fn idle_timeout(&self) -> Option<Duration> {
        match self.config.server.idle_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}
