//! The attempt loop, in blocking and async flavors.
//!
//! Both drivers share [`Attempt`], which owns the per-call state machine:
//!
//! ```text
//!             ┌──────────── ok ────────────▶ Succeeded
//!             │
//! Attempting ─┼── not retryable ──────────▶ FailedNonRetryable
//!      ▲      │
//!      │      ├── retryable, budget spent ▶ FailedExhausted
//!      │      │
//!      │      └── retryable ──▶ Waiting ─┐
//!      └──────────── after delay ────────┘
//! ```
//!
//! The failure returned to the caller is always the one the operation produced
//! on its last attempt.

use super::backoff::calculate_delay;
use super::classify::is_retryable;
use super::policy::RetryPolicy;
use crate::failure::Failure;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;
use tracing::{debug, warn};

/// Where an [`Attempt`] currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    /// The operation is about to run (or running).
    Attempting,
    /// A retryable failure was seen; sleeping before the next attempt.
    Waiting,
    /// The operation returned a value.
    Succeeded,
    /// The classifier rejected the failure.
    FailedNonRetryable,
    /// The failure was retryable but no retries remained.
    FailedExhausted,
}

impl AttemptState {
    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AttemptState::Succeeded
                | AttemptState::FailedNonRetryable
                | AttemptState::FailedExhausted
        )
    }
}

/// What the driver should do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Sleep this long, then call [`Attempt::resume`] and try again.
    Retry(Duration),
    /// Return the failure to the caller.
    GiveUp,
}

/// Per-call retry bookkeeping. Never shared between executor invocations.
#[derive(Debug)]
pub struct Attempt<'p> {
    policy: &'p RetryPolicy,
    index: u32,
    state: AttemptState,
    last_delay: Option<Duration>,
}

impl<'p> Attempt<'p> {
    /// Start at attempt 0 in [`AttemptState::Attempting`].
    pub fn new(policy: &'p RetryPolicy) -> Self {
        Self {
            policy,
            index: 0,
            state: AttemptState::Attempting,
            last_delay: None,
        }
    }

    /// 0-based index of the current attempt.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Current state.
    pub fn state(&self) -> AttemptState {
        self.state
    }

    /// Delay chosen after the most recent failure, if any.
    pub fn last_delay(&self) -> Option<Duration> {
        self.last_delay
    }

    /// Record success.
    pub fn succeed(&mut self) {
        debug_assert_eq!(self.state, AttemptState::Attempting);
        if self.index > 0 {
            debug!(attempts = self.index + 1, "Operation succeeded after retry");
        }
        self.state = AttemptState::Succeeded;
    }

    /// Record a failure and decide what happens next.
    ///
    /// Runs the policy's `on_retry` hook when a retry is granted.
    pub fn fail<E: Failure>(&mut self, failure: &E) -> Step {
        debug_assert_eq!(self.state, AttemptState::Attempting);
        let max_retries = self.policy.max_retries();

        if !is_retryable(failure, self.policy) {
            debug!(
                attempt = self.index,
                kind = %failure.kind(),
                error = %failure,
                "Failure is not retryable"
            );
            self.state = AttemptState::FailedNonRetryable;
            return Step::GiveUp;
        }

        if self.index >= max_retries {
            warn!(
                attempts = self.index + 1,
                max_retries,
                kind = %failure.kind(),
                error = %failure,
                "Retries exhausted"
            );
            self.state = AttemptState::FailedExhausted;
            return Step::GiveUp;
        }

        notify(self.policy, failure, self.index + 1);

        let delay = calculate_delay(self.index, self.policy);
        debug!(
            attempt = self.index,
            max_retries,
            delay_ms = delay.as_millis() as u64,
            kind = %failure.kind(),
            error = %failure,
            "Attempt failed, retrying"
        );
        self.last_delay = Some(delay);
        self.state = AttemptState::Waiting;
        Step::Retry(delay)
    }

    /// Move from [`AttemptState::Waiting`] to the next attempt.
    pub fn resume(&mut self) {
        debug_assert_eq!(self.state, AttemptState::Waiting);
        self.index += 1;
        self.state = AttemptState::Attempting;
    }
}

/// Invoke the retry hook inside its own failure boundary.
fn notify<E: Failure>(policy: &RetryPolicy, failure: &E, retry_number: u32) {
    let Some(callback) = policy.on_retry() else {
        return;
    };
    let failure: &dyn Failure = failure;
    match panic::catch_unwind(AssertUnwindSafe(|| callback(failure, retry_number))) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => warn!(retry_number, error = %err, "on_retry callback failed; ignoring"),
        Err(_) => warn!(retry_number, "on_retry callback panicked; ignoring"),
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// exhausts `policy.max_retries()` retries. Blocks the calling thread while
/// waiting between attempts.
///
/// The error returned is exactly the one the last attempt produced.
///
/// # Examples
///
/// ```rust
/// use libris_resilience::{execute_with_retry, FailureKind, OperationError, RetryPolicy};
/// use std::time::Duration;
///
/// let policy = RetryPolicy::builder()
///     .max_retries(2)
///     .initial_delay(Duration::from_millis(1))
///     .retry_on(FailureKind::Timeout)
///     .build()
///     .unwrap();
///
/// let mut calls = 0;
/// let value = execute_with_retry(
///     || {
///         calls += 1;
///         if calls < 3 {
///             Err(OperationError::Timeout("busy".into()))
///         } else {
///             Ok(calls)
///         }
///     },
///     &policy,
/// )
/// .unwrap();
/// assert_eq!(value, 3);
/// ```
pub fn execute_with_retry<T, E, F>(mut operation: F, policy: &RetryPolicy) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    E: Failure,
{
    let mut attempt = Attempt::new(policy);
    loop {
        match operation() {
            Ok(value) => {
                attempt.succeed();
                return Ok(value);
            }
            Err(err) => match attempt.fail(&err) {
                Step::GiveUp => return Err(err),
                Step::Retry(delay) => {
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                    attempt.resume();
                }
            },
        }
    }
}

/// [`execute_with_retry`] for operations run only for their side effects.
pub fn execute_action_with_retry<E, F>(operation: F, policy: &RetryPolicy) -> Result<(), E>
where
    F: FnMut() -> Result<(), E>,
    E: Failure,
{
    execute_with_retry(operation, policy)
}

/// Async counterpart of [`execute_with_retry`]. Waits with
/// `tokio::time::sleep`, so only the task is suspended.
///
/// `operation` is called once per attempt to produce a fresh future.
///
/// # Examples
///
/// ```rust
/// use libris_resilience::{execute_with_retry_async, OperationError, RetryPolicy};
///
/// # async fn example() -> Result<(), OperationError> {
/// let policy = RetryPolicy::builder().max_retries(1).build().unwrap();
/// let rows = execute_with_retry_async(|| async { Ok::<_, OperationError>(42) }, &policy).await?;
/// assert_eq!(rows, 42);
/// # Ok(())
/// # }
/// ```
pub async fn execute_with_retry_async<T, E, F, Fut>(
    mut operation: F,
    policy: &RetryPolicy,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Failure,
{
    let mut attempt = Attempt::new(policy);
    loop {
        match operation().await {
            Ok(value) => {
                attempt.succeed();
                return Ok(value);
            }
            Err(err) => match attempt.fail(&err) {
                Step::GiveUp => return Err(err),
                Step::Retry(delay) => {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt.resume();
                }
            },
        }
    }
}

/// [`execute_with_retry_async`] for operations run only for their side effects.
pub async fn execute_action_with_retry_async<E, F, Fut>(
    operation: F,
    policy: &RetryPolicy,
) -> Result<(), E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Failure,
{
    execute_with_retry_async(operation, policy).await
}

impl RetryPolicy {
    /// Shorthand for [`execute_with_retry`] with this policy.
    pub fn execute<T, E, F>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        E: Failure,
    {
        execute_with_retry(operation, self)
    }

    /// Shorthand for [`execute_with_retry_async`] with this policy.
    pub async fn execute_async<T, E, F, Fut>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Failure,
    {
        execute_with_retry_async(operation, self).await
    }
}
