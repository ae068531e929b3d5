//! Pointer movement synthesis
//!
//! [`MotionActuator`] owns one worker task that walks the host pointer
//! toward the most recent target along a planned [`Trajectory`].
//!
//! # Cancel and replace
//!
//! Only the newest absolute target matters for a live control signal. A
//! target arriving while a path is in flight abandons that path at the next
//! step and plans a fresh one from wherever the pointer actually is:
//!
//! ```text
//! move_to(A) ──> [plan A] ─step─step─┐
//! move_to(B) ────────────────────────┴──> [plan B] ─step─step─...─ done
//! halt()     ──> current path abandoned, worker idles
//! ```
//!
//! Targets travel through a `watch` channel, so submitting never blocks the
//! caller and intermediate targets collapse into the latest one.

mod backend;
mod error;
#[cfg(feature = "portal")]
mod portal;
mod trajectory;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::PointerKind;
use crate::cursor::{PointerTarget, ScreenBounds};

pub use backend::{PointerBackend, VirtualPointer};
pub use error::{ActuationError, Result};
#[cfg(feature = "portal")]
pub use portal::PortalPointer;
pub use trajectory::{plan, MotionProfile, Trajectory};

#[cfg(test)]
pub(crate) use backend::MockPointerBackend;

/// Open the configured pointer backend
///
/// `fallback` sizes the virtual pointer; the portal reports its own screen.
pub async fn open_backend(
    kind: PointerKind,
    fallback: ScreenBounds,
) -> Result<Arc<dyn PointerBackend>> {
    match kind {
        PointerKind::Virtual => {
            info!(
                "Headless: driving a virtual {}x{} pointer",
                fallback.width(),
                fallback.height()
            );
            Ok(Arc::new(VirtualPointer::new(fallback)))
        }
        #[cfg(feature = "portal")]
        PointerKind::Portal => Ok(Arc::new(PortalPointer::connect().await?)),
        #[cfg(not(feature = "portal"))]
        PointerKind::Portal => Err(ActuationError::Unavailable(
            "built without portal support".to_string(),
        )),
    }
}

/// Actuator counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActuatorStats {
    /// Paths started
    pub started: u64,
    /// Paths that reached their target
    pub completed: u64,
    /// Paths abandoned for a newer target or a halt
    pub interrupted: u64,
    /// Pointer moves the host refused
    pub failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    started: AtomicU64,
    completed: AtomicU64,
    interrupted: AtomicU64,
    failures: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> ActuatorStats {
        ActuatorStats {
            started: self.started.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            interrupted: self.interrupted.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Drives the host pointer toward the latest target
pub struct MotionActuator {
    target_tx: watch::Sender<Option<PointerTarget>>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
    counters: Arc<Counters>,
}

impl MotionActuator {
    /// Start the worker on the current runtime
    ///
    /// Paths stay on the profile's screen, or on the backend's when the
    /// profile names none.
    pub fn spawn(backend: Arc<dyn PointerBackend>, mut profile: MotionProfile) -> Self {
        if profile.bounds.is_none() {
            profile.bounds = backend
                .screen_size()
                .map(|(width, height)| ScreenBounds::new(width, height));
        }

        let (target_tx, target_rx) = watch::channel(None);
        let cancel = CancellationToken::new();
        let counters = Arc::new(Counters::default());

        let worker = Worker {
            backend,
            profile,
            targets: target_rx,
            cancel: cancel.clone(),
            counters: Arc::clone(&counters),
            last_position: None,
        };

        info!(
            "Motion actuator started ({} fps, {:?}-{:?} per move)",
            worker.profile.fps, worker.profile.min_duration, worker.profile.max_duration
        );
        let task = tokio::spawn(worker.run());

        Self {
            target_tx,
            cancel,
            task: Mutex::new(Some(task)),
            counters,
        }
    }

    /// Head for `target`, replacing any move in progress
    pub fn move_to(&self, target: PointerTarget) {
        self.target_tx.send_replace(Some(target));
    }

    /// Abandon the move in progress and idle
    pub fn halt(&self) {
        self.target_tx.send_replace(None);
    }

    /// Most recently requested target
    pub fn pending_target(&self) -> Option<PointerTarget> {
        *self.target_tx.borrow()
    }

    /// Counters so far
    pub fn stats(&self) -> ActuatorStats {
        self.counters.snapshot()
    }

    /// Stop the worker and wait for it to exit
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!("Motion actuator task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for MotionActuator {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// How a path ended
enum PathEnd {
    Completed,
    Replaced(Option<PointerTarget>),
    Failed,
    Shutdown,
}

/// What to do before the next step
enum Step {
    Advance,
    Replaced(Option<PointerTarget>),
    Shutdown,
}

struct Worker {
    backend: Arc<dyn PointerBackend>,
    profile: MotionProfile,
    targets: watch::Receiver<Option<PointerTarget>>,
    cancel: CancellationToken,
    counters: Arc<Counters>,
    last_position: Option<(f64, f64)>,
}

impl Worker {
    async fn run(mut self) {
        let mut next: Option<Option<PointerTarget>> = None;

        loop {
            let target = match next.take() {
                Some(target) => target,
                None => {
                    tokio::select! {
                        _ = self.cancel.cancelled() => break,
                        changed = self.targets.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                    }
                    *self.targets.borrow_and_update()
                }
            };

            let Some(target) = target else {
                trace!("Actuator idle");
                continue;
            };

            match self.follow(target).await {
                PathEnd::Completed => {
                    self.counters.completed.fetch_add(1, Ordering::Relaxed);
                }
                PathEnd::Replaced(target) => {
                    self.counters.interrupted.fetch_add(1, Ordering::Relaxed);
                    next = Some(target);
                }
                PathEnd::Failed => {
                    self.counters.failures.fetch_add(1, Ordering::Relaxed);
                }
                PathEnd::Shutdown => break,
            }
        }

        debug!("Motion actuator stopped");
    }

    /// Best-known actual pointer position
    async fn current_position(&self) -> Option<(f64, f64)> {
        match self.backend.position().await {
            Ok((x, y)) => Some((x as f64, y as f64)),
            Err(e) => {
                debug!("Using last commanded position: {}", e);
                self.last_position
            }
        }
    }

    async fn follow(&mut self, target: PointerTarget) -> PathEnd {
        // With no idea where the pointer is, jump straight to the target
        let path = match self.current_position().await {
            Some(from) => {
                trace!(
                    "Planning ({:.0}, {:.0}) -> ({:.0}, {:.0})",
                    from.0,
                    from.1,
                    target.x,
                    target.y
                );
                plan(from, (target.x, target.y), &self.profile)
            }
            None => Trajectory {
                points: vec![target.to_pixel()],
                step: Duration::ZERO,
            },
        };
        if path.is_empty() {
            return PathEnd::Completed;
        }

        self.counters.started.fetch_add(1, Ordering::Relaxed);

        for &(x, y) in &path.points {
            let step = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Step::Shutdown,
                changed = self.targets.changed() => match changed {
                    Ok(()) => Step::Replaced(*self.targets.borrow_and_update()),
                    Err(_) => Step::Shutdown,
                },
                _ = tokio::time::sleep(path.step) => Step::Advance,
            };

            match step {
                Step::Advance => {}
                Step::Replaced(next) => return PathEnd::Replaced(next),
                Step::Shutdown => return PathEnd::Shutdown,
            }

            if let Err(e) = self.backend.move_to(x, y).await {
                warn!("Pointer move failed: {}", e);
                return PathEnd::Failed;
            }
            self.last_position = Some((x as f64, y as f64));
        }

        PathEnd::Completed
    }
}
