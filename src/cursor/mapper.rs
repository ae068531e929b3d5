//! Relative-to-absolute cursor mapping
//!
//! The device reports its pose as a running value; the pointer moves by the
//! change between consecutive reports, scaled by a gain and clamped to the
//! screen:
//!
//! ```text
//! target = position + (sample - last_sample) * gain
//! target = clamp(target, [0, width-1] x [0, height-1])
//! ```
//!
//! The first sample of a link has nothing to diff against. It only seeds
//! the baseline, whatever its value (a pose of exactly `0.0` is a valid
//! baseline).

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::protocol::MotionSample;

/// Pixels per pose unit
pub const DEFAULT_GAIN: f64 = 65_000.0;

/// Screen extent the pointer is confined to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenBounds {
    width: u32,
    height: u32,
}

impl ScreenBounds {
    /// Bounds for a `width` x `height` screen (each at least one pixel)
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Screen width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Screen height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Clamp a point to `[0, width-1] x [0, height-1]`
    pub fn clamp(&self, x: f64, y: f64) -> (f64, f64) {
        let max_x = (self.width - 1) as f64;
        let max_y = (self.height - 1) as f64;
        (x.clamp(0.0, max_x), y.clamp(0.0, max_y))
    }

    /// True when the point lies on the screen
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let max_x = (self.width - 1) as f64;
        let max_y = (self.height - 1) as f64;
        (0.0..=max_x).contains(&x) && (0.0..=max_y).contains(&y)
    }

    /// Screen centre
    pub fn center(&self) -> (f64, f64) {
        (self.width as f64 / 2.0, self.height as f64 / 2.0)
    }
}

/// Absolute pointer destination in screen pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerTarget {
    /// Horizontal position
    pub x: f64,
    /// Vertical position
    pub y: f64,
}

impl PointerTarget {
    /// Create a target
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Nearest whole pixel
    pub fn to_pixel(&self) -> (i32, i32) {
        (self.x.round() as i32, self.y.round() as i32)
    }
}

/// Mapper phase
#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    /// Waiting for the baseline sample
    Uninitialized,
    /// Diffing against the previous sample
    Tracking { last_sample: MotionSample },
}

/// Readout of the mapper state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CursorState {
    /// A baseline sample has been seen on the current link
    pub initialized: bool,
    /// Previous sample, once initialized
    pub last_sample: Option<MotionSample>,
    /// Current absolute pointer position
    pub absolute_position: (f64, f64),
}

/// Stateful delta-to-position transform for one pointer
#[derive(Debug, Clone)]
pub struct CursorMapper {
    bounds: ScreenBounds,
    gain: f64,
    phase: Phase,
    position: (f64, f64),
}

impl CursorMapper {
    /// Create a mapper starting at `start` (clamped to `bounds`)
    pub fn new(bounds: ScreenBounds, gain: f64, start: (f64, f64)) -> Self {
        Self {
            bounds,
            gain,
            phase: Phase::Uninitialized,
            position: bounds.clamp(start.0, start.1),
        }
    }

    /// Create a mapper with [`DEFAULT_GAIN`] starting at the screen centre
    pub fn with_bounds(bounds: ScreenBounds) -> Self {
        Self::new(bounds, DEFAULT_GAIN, bounds.center())
    }

    /// Feed one sample; returns the new target once tracking
    pub fn process(&mut self, sample: MotionSample) -> Option<PointerTarget> {
        match self.phase {
            Phase::Uninitialized => {
                self.phase = Phase::Tracking {
                    last_sample: sample,
                };
                debug!(
                    "Baseline sample ({}, {}), pointer at ({:.1}, {:.1})",
                    sample.dx, sample.dy, self.position.0, self.position.1
                );
                None
            }
            Phase::Tracking { last_sample } => {
                let delta_x = sample.dx - last_sample.dx;
                let delta_y = sample.dy - last_sample.dy;

                let (x, y) = self.bounds.clamp(
                    self.position.0 + delta_x * self.gain,
                    self.position.1 + delta_y * self.gain,
                );

                self.position = (x, y);
                self.phase = Phase::Tracking {
                    last_sample: sample,
                };

                trace!(delta_x, delta_y, x, y, "Mapped sample");
                Some(PointerTarget::new(x, y))
            }
        }
    }

    /// Forget the baseline; the next sample re-seeds it
    ///
    /// The absolute position is kept so a new link continues from where the
    /// pointer was left.
    pub fn reset(&mut self) {
        self.phase = Phase::Uninitialized;
    }

    /// Adopt the live pointer position (e.g. moved by the local user)
    pub fn resync(&mut self, x: f64, y: f64) {
        self.position = self.bounds.clamp(x, y);
        debug!(
            "Cursor resynchronized to ({:.1}, {:.1})",
            self.position.0, self.position.1
        );
    }

    /// Replace the screen bounds, re-clamping the current position
    pub fn set_bounds(&mut self, bounds: ScreenBounds) {
        self.bounds = bounds;
        self.position = bounds.clamp(self.position.0, self.position.1);
    }

    /// True once a baseline has been seen
    pub fn is_initialized(&self) -> bool {
        matches!(self.phase, Phase::Tracking { .. })
    }

    /// Current absolute position
    pub fn position(&self) -> (f64, f64) {
        self.position
    }

    /// Screen bounds
    pub fn bounds(&self) -> ScreenBounds {
        self.bounds
    }

    /// Gain in pixels per pose unit
    pub fn gain(&self) -> f64 {
        self.gain
    }

    /// Readout of the current state
    pub fn state(&self) -> CursorState {
        let last_sample = match self.phase {
            Phase::Uninitialized => None,
            Phase::Tracking { last_sample } => Some(last_sample),
        };

        CursorState {
            initialized: last_sample.is_some(),
            last_sample,
            absolute_position: self.position,
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_targets_always_on_screen(
            width in 1u32..4000,
            height in 1u32..3000,
            start in (-1.0e4f64..1.0e4, -1.0e4f64..1.0e4),
            samples in proptest::collection::vec((-10.0f64..10.0, -10.0f64..10.0), 0..64),
        ) {
            let bounds = ScreenBounds::new(width, height);
            let mut mapper = CursorMapper::new(bounds, DEFAULT_GAIN, start);

            for (i, (dx, dy)) in samples.into_iter().enumerate() {
                let output = mapper.process(MotionSample::new(dx, dy));
                prop_assert_eq!(output.is_none(), i == 0);

                let (x, y) = mapper.position();
                prop_assert!(x >= 0.0 && x <= (width - 1) as f64);
                prop_assert!(y >= 0.0 && y <= (height - 1) as f64);
            }
        }

        #[test]
        fn prop_first_sample_never_moves(
            start in (0.0f64..1000.0, 0.0f64..800.0),
            sample in (-100.0f64..100.0, -100.0f64..100.0),
        ) {
            let mut mapper = CursorMapper::new(ScreenBounds::new(1000, 800), DEFAULT_GAIN, start);
            let before = mapper.position();
            prop_assert!(mapper.process(MotionSample::new(sample.0, sample.1)).is_none());
            prop_assert_eq!(mapper.position(), before);
        }
    }
}
