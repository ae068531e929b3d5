//! Cursor mapping
//!
//! Turns the device's stream of pose samples into absolute pointer targets.
//!
//! # State Machine
//!
//! ```text
//!                 first sample (baseline, no output)
//! UNINITIALIZED ─────────────────────────────────────> TRACKING
//!       ^                                               │  │
//!       │            link closed / reset()              │  │ sample:
//!       └───────────────────────────────────────────────┘  │ emit clamped
//!                                                          │ target
//!                                                          └──┘
//! ```
//!
//! The mapper has exactly one mutator: the link currently feeding it. The
//! absolute position survives a reset so a reconnecting device picks up
//! where the pointer was left.

mod mapper;

pub use mapper::{CursorMapper, CursorState, PointerTarget, ScreenBounds, DEFAULT_GAIN};
