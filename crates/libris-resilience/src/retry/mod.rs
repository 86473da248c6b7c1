//! Retry policies, backoff calculation, failure classification and execution.
//!
//! # Key Types
//!
//! - [`RetryPolicy`] - Immutable configuration, built with [`RetryPolicy::builder`]
//! - [`PolicyFactory`] - Pre-tuned policies for database, network and file I/O work
//! - [`calculate_delay`] - Linear, exponential and Fibonacci backoff with cap and jitter
//! - [`is_retryable`] - Kind-based classification with a database fallback
//! - [`execute_with_retry`] / [`execute_with_retry_async`] - The attempt loop
//!
//! # Examples
//!
//! ```rust
//! use libris_resilience::retry::{execute_with_retry_async, PolicyFactory};
//! use libris_resilience::OperationError;
//!
//! # async fn example() -> Result<(), OperationError> {
//! let policy = PolicyFactory::database_policy();
//!
//! let count = execute_with_retry_async(|| async {
//!     // Your database call here
//!     Ok::<_, OperationError>(42)
//! }, &policy).await?;
//! # Ok(())
//! # }
//! ```

mod backoff;
mod classify;
mod executor;
mod factory;
mod policy;

pub use backoff::calculate_delay;
pub use classify::{
    TRANSIENT_MESSAGE_HINTS, TRANSIENT_SQL_STATES, is_retryable, is_transient_database_failure,
};
pub use executor::{
    Attempt, AttemptState, Step, execute_action_with_retry, execute_action_with_retry_async,
    execute_with_retry, execute_with_retry_async,
};
pub use factory::PolicyFactory;
pub use policy::{BackoffStrategy, OnRetry, RetryPolicy, RetryPolicyBuilder};

#[cfg(test)]
pub(crate) use backoff::{apply_jitter, base_delay};
