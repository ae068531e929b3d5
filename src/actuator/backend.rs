//! Pointer backends
//!
//! The host's absolute-positioning primitive sits behind [`PointerBackend`].
//! [`VirtualPointer`] keeps the pointer in memory; it drives headless runs
//! and tests, and is what host injectors are checked against.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

use crate::actuator::error::{ActuationError, Result};
use crate::cursor::ScreenBounds;

/// Host pointer control
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PointerBackend: Send + Sync {
    /// Current pointer position in screen pixels
    async fn position(&self) -> Result<(i32, i32)>;

    /// Screen size, when the host knows it
    fn screen_size(&self) -> Option<(u32, u32)>;

    /// Warp the pointer to an absolute position
    async fn move_to(&self, x: i32, y: i32) -> Result<()>;
}

/// In-memory pointer confined to a screen
#[derive(Debug)]
pub struct VirtualPointer {
    bounds: ScreenBounds,
    position: Mutex<(i32, i32)>,
    moves: AtomicU64,
}

impl VirtualPointer {
    /// Pointer at the centre of `bounds`
    pub fn new(bounds: ScreenBounds) -> Self {
        let (x, y) = bounds.center();
        Self::at(bounds, x as i32, y as i32)
    }

    /// Pointer at a given position
    pub fn at(bounds: ScreenBounds, x: i32, y: i32) -> Self {
        Self {
            bounds,
            position: Mutex::new((x, y)),
            moves: AtomicU64::new(0),
        }
    }

    /// Current position without going through the async trait
    pub fn current(&self) -> (i32, i32) {
        *self.position.lock()
    }

    /// Number of accepted moves
    pub fn move_count(&self) -> u64 {
        self.moves.load(Ordering::Relaxed)
    }

    /// Move the pointer as a local user would (outside the pipeline)
    pub fn nudge(&self, x: i32, y: i32) {
        *self.position.lock() = (x, y);
    }
}

#[async_trait]
impl PointerBackend for VirtualPointer {
    async fn position(&self) -> Result<(i32, i32)> {
        Ok(self.current())
    }

    fn screen_size(&self) -> Option<(u32, u32)> {
        Some((self.bounds.width(), self.bounds.height()))
    }

    async fn move_to(&self, x: i32, y: i32) -> Result<()> {
        let max_x = self.bounds.width() as i32 - 1;
        let max_y = self.bounds.height() as i32 - 1;
        if !(0..=max_x).contains(&x) || !(0..=max_y).contains(&y) {
            return Err(ActuationError::Rejected {
                x,
                y,
                reason: format!("outside {}x{} screen", max_x + 1, max_y + 1),
            });
        }

        *self.position.lock() = (x, y);
        self.moves.fetch_add(1, Ordering::Relaxed);
        trace!(x, y, "Virtual pointer moved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_virtual_pointer_moves() {
        let pointer = VirtualPointer::new(ScreenBounds::new(800, 600));
        assert_eq!(pointer.position().await.unwrap(), (400, 300));
        assert_eq!(pointer.screen_size(), Some((800, 600)));

        pointer.move_to(10, 20).await.unwrap();
        assert_eq!(pointer.current(), (10, 20));
        assert_eq!(pointer.move_count(), 1);
    }

    #[tokio::test]
    async fn test_virtual_pointer_rejects_off_screen() {
        let pointer = VirtualPointer::new(ScreenBounds::new(800, 600));

        let result = pointer.move_to(800, 10).await;
        assert!(matches!(result, Err(ActuationError::Rejected { x: 800, .. })));
        assert_eq!(pointer.current(), (400, 300));
        assert_eq!(pointer.move_count(), 0);
    }
}
