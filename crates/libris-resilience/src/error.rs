//! Error types for policy construction and configuration.
//!
//! The executor itself never produces errors of its own: whatever the wrapped
//! operation returned is handed back to the caller untouched. The types here
//! only cover building and loading policies.

use std::time::Duration;

/// Result type for policy construction and configuration loading.
pub type Result<T> = std::result::Result<T, PolicyError>;

/// Boxed error returned by `on_retry` callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while building or loading a [`RetryPolicy`](crate::RetryPolicy).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PolicyError {
    /// Jitter factor outside `[0, 1]` (or NaN).
    #[error("jitter factor must be within [0, 1], got {0}")]
    JitterFactorOutOfRange(f64),

    /// `initial_delay` greater than `max_delay`.
    #[error("initial delay ({initial:?}) exceeds max delay ({max:?})")]
    DelayOrder {
        /// Configured initial delay.
        initial: Duration,
        /// Configured cap.
        max: Duration,
    },

    /// Strategy name not recognized.
    #[error("unknown backoff strategy: {0}")]
    UnknownStrategy(String),

    /// Failure kind name not recognized.
    #[error("unknown failure kind: {0}")]
    UnknownFailureKind(String),

    /// Environment variable present but unparseable.
    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv {
        /// Variable name.
        var: String,
        /// Raw value.
        value: String,
    },
}
