//! Pointer Actuation Error Types

use thiserror::Error;

/// Result type for pointer backend operations
pub type Result<T> = std::result::Result<T, ActuationError>;

/// Pointer actuation errors
///
/// None of these stop the mapping pipeline; the current path is abandoned
/// and the next target is tried normally.
#[derive(Error, Debug)]
pub enum ActuationError {
    /// Host refused the pointer operation
    #[error("Host rejected pointer move to ({x}, {y}): {reason}")]
    Rejected {
        /// Requested x
        x: i32,
        /// Requested y
        y: i32,
        /// Host-supplied reason
        reason: String,
    },

    /// Pointer position could not be queried
    #[error("Pointer position unavailable: {0}")]
    PositionUnavailable(String),

    /// Backend is not usable (session closed, device gone)
    #[error("Pointer backend unavailable: {0}")]
    Unavailable(String),

    /// IO error talking to the host
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
