//! Desktop pointer through the XDG RemoteDesktop portal
//!
//! The portal grants pointer injection after the user approves a session.
//! Absolute motion is addressed to a screencast stream, so the session also
//! selects one monitor and the pointer is confined to it.
//!
//! The portal cannot report where the pointer is. [`PortalPointer::position`]
//! always fails and the actuator plans from the last position it commanded.

use ashpd::desktop::remote_desktop::{DeviceType, RemoteDesktop};
use ashpd::desktop::screencast::{CursorMode, Screencast, SourceType};
use ashpd::desktop::{PersistMode, Session};
use async_trait::async_trait;
use tracing::{debug, info, trace};

use crate::actuator::backend::PointerBackend;
use crate::actuator::error::{ActuationError, Result};

fn portal_error(e: ashpd::Error) -> ActuationError {
    ActuationError::Unavailable(format!("desktop portal: {}", e))
}

/// Host pointer driven through a RemoteDesktop portal session
pub struct PortalPointer {
    proxy: RemoteDesktop<'static>,
    session: Session<'static, RemoteDesktop<'static>>,
    stream: u32,
    size: Option<(u32, u32)>,
}

impl PortalPointer {
    /// Open a portal session with pointer access
    ///
    /// Shows the desktop's permission dialog and waits for the user.
    pub async fn connect() -> Result<Self> {
        info!("Requesting pointer access from the desktop portal");

        let proxy = RemoteDesktop::new().await.map_err(portal_error)?;
        let session = proxy.create_session().await.map_err(portal_error)?;

        proxy
            .select_devices(&session, DeviceType::Pointer.into(), None, PersistMode::DoNot)
            .await
            .map_err(portal_error)?;

        let screencast = Screencast::new().await.map_err(portal_error)?;
        screencast
            .select_sources(
                &session,
                CursorMode::Hidden,
                SourceType::Monitor.into(),
                false,
                None,
                PersistMode::DoNot,
            )
            .await
            .map_err(portal_error)?;

        let selected = proxy
            .start(&session, None)
            .await
            .map_err(portal_error)?
            .response()
            .map_err(portal_error)?;

        let (stream, size) = selected
            .streams()
            .and_then(|streams| {
                streams
                    .iter()
                    .next()
                    .map(|s| (s.pipe_wire_node_id(), s.size()))
            })
            .ok_or_else(|| {
                ActuationError::Unavailable(
                    "portal granted no monitor (permission denied?)".to_string(),
                )
            })?;

        let size = size.and_then(|(w, h)| Some((u32::try_from(w).ok()?, u32::try_from(h).ok()?)));
        match size {
            Some((w, h)) => info!("Portal session started on stream {} ({}x{})", stream, w, h),
            None => info!("Portal session started on stream {} (size unknown)", stream),
        }

        Ok(Self {
            proxy,
            session,
            stream,
            size,
        })
    }
}

#[async_trait]
impl PointerBackend for PortalPointer {
    async fn position(&self) -> Result<(i32, i32)> {
        Err(ActuationError::PositionUnavailable(
            "the portal does not report the pointer".to_string(),
        ))
    }

    fn screen_size(&self) -> Option<(u32, u32)> {
        self.size
    }

    async fn move_to(&self, x: i32, y: i32) -> Result<()> {
        if let Some((w, h)) = self.size {
            if x < 0 || y < 0 || x as u32 >= w || y as u32 >= h {
                return Err(ActuationError::Rejected {
                    x,
                    y,
                    reason: format!("outside {}x{} stream", w, h),
                });
            }
        }

        self.proxy
            .notify_pointer_motion_absolute(&self.session, self.stream, x as f64, y as f64)
            .await
            .map_err(|e| {
                debug!("Portal refused pointer motion: {}", e);
                ActuationError::Rejected {
                    x,
                    y,
                    reason: e.to_string(),
                }
            })?;

        trace!(x, y, "Portal pointer moved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires a desktop session with xdg-desktop-portal
    async fn test_portal_pointer_connects() {
        match PortalPointer::connect().await {
            Ok(pointer) => {
                assert!(pointer.position().await.is_err());
            }
            Err(e) => eprintln!("Portal unavailable (expected outside a desktop session): {}", e),
        }
    }
}
