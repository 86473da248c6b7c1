#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Retry-with-backoff execution engine for the Libris data-access layer.
//!
//! Given a fallible operation and a declarative [`RetryPolicy`], the engine
//! decides how many times to retry, how long to wait in between, and which
//! failures are worth retrying at all:
//!
//! - **Backoff** via [`calculate_delay`]
//!   - Linear, exponential and Fibonacci growth
//!   - Cap and optional jitter
//! - **Classification** via [`is_retryable`] and the [`Failure`] trait
//!   - Kind tags with an "is-a" hierarchy
//!   - SQLSTATE and message fallback for transient database trouble
//! - **Execution** via [`execute_with_retry`] (blocking) and
//!   [`execute_with_retry_async`] (tokio)
//! - **Presets** via [`PolicyFactory`] and **configuration** via
//!   [`config::RetrySettings`]
//!
//! The engine knows nothing about the operations it wraps. Failures are
//! returned to the caller exactly as the operation produced them.
//!
//! # Examples
//!
//! Using the prelude for convenient imports:
//!
//! ```rust
//! use libris_resilience::prelude::*;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), OperationError> {
//! let policy = RetryPolicy::builder()
//!     .max_retries(3)
//!     .initial_delay(Duration::from_millis(100))
//!     .retry_on(FailureKind::Timeout)
//!     .build()
//!     .expect("valid policy");
//!
//! let result = execute_with_retry_async(|| async {
//!     Ok::<_, OperationError>(42)
//! }, &policy).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod failure;
pub mod retry;


pub use error::{BoxError, PolicyError, Result};
pub use failure::{Failure, FailureKind, OperationError};
pub use retry::{
    BackoffStrategy, PolicyFactory, RetryPolicy, RetryPolicyBuilder, calculate_delay,
    execute_action_with_retry, execute_action_with_retry_async, execute_with_retry,
    execute_with_retry_async, is_retryable,
};

/// Convenient re-exports of commonly used items.
///
/// Import all core abstractions with:
///
/// ```rust
/// use libris_resilience::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::RetrySettings;
    pub use crate::failure::{Failure, FailureKind, OperationError};
    pub use crate::retry::{
        BackoffStrategy, PolicyFactory, RetryPolicy, calculate_delay, execute_action_with_retry,
        execute_action_with_retry_async, execute_with_retry, execute_with_retry_async,
        is_retryable,
    };
}
