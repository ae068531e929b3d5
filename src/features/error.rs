//! Feature Store Error Types

use thiserror::Error;

/// Result type for feature store operations
pub type Result<T> = std::result::Result<T, FeatureError>;

/// Reasons an upsert was refused
///
/// Both variants are non-fatal: the store is left untouched and the
/// tracking feed carries on with the next sighting.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureError {
    /// Identity outside `[0, capacity)`
    #[error("Rejected feature identity {id} (valid range 0..{capacity})")]
    RejectedIdentity {
        /// Identity reported by the tracking feed
        id: i64,
        /// Store capacity
        capacity: usize,
    },

    /// New identity arrived while every slot is occupied
    #[error("Feature store capacity exhausted ({capacity} features), dropping id {id}")]
    CapacityExhausted {
        /// Identity that could not be placed
        id: i64,
        /// Store capacity
        capacity: usize,
    },
}
