//! Immutable retry policy and its builder.

use crate::error::{BoxError, PolicyError, Result};
use crate::failure::{Failure, FailureKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Callback invoked before each wait with the failure and the 1-based retry number.
///
/// Errors returned (and panics raised) by the callback are logged and discarded.
pub type OnRetry = Arc<dyn Fn(&dyn Failure, u32) -> std::result::Result<(), BoxError> + Send + Sync>;

/// How the delay grows between successive retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// `initial * (n + 1)`
    Linear,
    /// `initial * 2^n`
    #[default]
    Exponential,
    /// `initial * fib(n + 1)`
    Fibonacci,
}

impl fmt::Display for BackoffStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackoffStrategy::Linear => "linear",
            BackoffStrategy::Exponential => "exponential",
            BackoffStrategy::Fibonacci => "fibonacci",
        })
    }
}

impl FromStr for BackoffStrategy {
    type Err = PolicyError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(BackoffStrategy::Linear),
            "exponential" => Ok(BackoffStrategy::Exponential),
            "fibonacci" => Ok(BackoffStrategy::Fibonacci),
            _ => Err(PolicyError::UnknownStrategy(s.to_string())),
        }
    }
}

/// Immutable configuration for one class of retried operation.
///
/// A policy is built once (through [`RetryPolicy::builder`] or
/// [`PolicyFactory`](crate::PolicyFactory)) and then shared freely: it is
/// `Send + Sync`, cloning is cheap, and nothing in the engine mutates it.
///
/// # Examples
///
/// ```rust
/// use libris_resilience::{BackoffStrategy, FailureKind, RetryPolicy};
/// use std::time::Duration;
///
/// let policy = RetryPolicy::builder()
///     .max_retries(2)
///     .initial_delay(Duration::from_millis(100))
///     .strategy(BackoffStrategy::Exponential)
///     .retry_on(FailureKind::Timeout)
///     .build()
///     .unwrap();
///
/// assert_eq!(policy.max_retries(), 2);
/// assert!(policy.retryable_kinds().contains(&FailureKind::Timeout));
/// ```
#[derive(Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_delay: Duration,
    max_delay: Duration,
    strategy: BackoffStrategy,
    retryable_kinds: BTreeSet<FailureKind>,
    jitter_enabled: bool,
    jitter_factor: f64,
    on_retry: Option<OnRetry>,
}

pub(crate) const DEFAULT_JITTER_FACTOR: f64 = 0.1;

impl RetryPolicy {
    /// Create a new builder. Unset fields fall back to the defaults listed on
    /// [`RetryPolicyBuilder`].
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::default()
    }

    /// Construct a policy from values already known to satisfy the invariants.
    pub(crate) fn preset(
        max_retries: u32,
        initial_delay: Duration,
        max_delay: Duration,
        strategy: BackoffStrategy,
        retryable_kinds: impl IntoIterator<Item = FailureKind>,
        jitter_enabled: bool,
    ) -> Self {
        debug_assert!(initial_delay <= max_delay);
        Self {
            max_retries,
            initial_delay,
            max_delay,
            strategy,
            retryable_kinds: retryable_kinds.into_iter().collect(),
            jitter_enabled,
            jitter_factor: DEFAULT_JITTER_FACTOR,
            on_retry: None,
        }
    }

    /// Number of additional attempts after the first.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before the first retry (before strategy scaling).
    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Upper bound for any computed delay.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Delay growth rule.
    pub fn strategy(&self) -> BackoffStrategy {
        self.strategy
    }

    /// Kinds eligible for retry. Empty means every failure is retried.
    pub fn retryable_kinds(&self) -> &BTreeSet<FailureKind> {
        &self.retryable_kinds
    }

    /// Whether delays are randomized.
    pub fn jitter_enabled(&self) -> bool {
        self.jitter_enabled
    }

    /// Proportion of the delay that jitter may add or remove.
    pub fn jitter_factor(&self) -> f64 {
        self.jitter_factor
    }

    /// The retry hook, if any.
    pub fn on_retry(&self) -> Option<&OnRetry> {
        self.on_retry.as_ref()
    }

    /// Return a copy of this policy with `callback` installed as the retry hook.
    pub fn with_on_retry<F>(&self, callback: F) -> Self
    where
        F: Fn(&dyn Failure, u32) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        Self {
            on_retry: Some(Arc::new(callback)),
            ..self.clone()
        }
    }
}

impl Default for RetryPolicy {
    /// Same as [`PolicyFactory::default_policy`](crate::PolicyFactory::default_policy).
    fn default() -> Self {
        crate::PolicyFactory::default_policy()
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("initial_delay", &self.initial_delay)
            .field("max_delay", &self.max_delay)
            .field("strategy", &self.strategy)
            .field("retryable_kinds", &self.retryable_kinds)
            .field("jitter_enabled", &self.jitter_enabled)
            .field("jitter_factor", &self.jitter_factor)
            .field("on_retry", &self.on_retry.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

/// Builder for [`RetryPolicy`].
///
/// Defaults: 3 retries, 1s initial delay, 30s cap, exponential growth, no
/// jitter (factor 0.1 once enabled), retry on any failure, no callback.
#[derive(Default)]
pub struct RetryPolicyBuilder {
    max_retries: Option<u32>,
    initial_delay: Option<Duration>,
    max_delay: Option<Duration>,
    strategy: Option<BackoffStrategy>,
    retryable_kinds: BTreeSet<FailureKind>,
    jitter_enabled: bool,
    jitter_factor: Option<f64>,
    on_retry: Option<OnRetry>,
}

impl RetryPolicyBuilder {
    /// Set the number of retries after the first attempt.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Set the delay before the first retry.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = Some(delay);
        self
    }

    /// Set the cap applied to every computed delay.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    /// Set the growth rule.
    pub fn strategy(mut self, strategy: BackoffStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Add one retryable kind.
    pub fn retry_on(mut self, kind: FailureKind) -> Self {
        self.retryable_kinds.insert(kind);
        self
    }

    /// Replace the retryable kinds.
    pub fn retryable_kinds(mut self, kinds: impl IntoIterator<Item = FailureKind>) -> Self {
        self.retryable_kinds = kinds.into_iter().collect();
        self
    }

    /// Enable jitter with the given factor; validated in [`build`](Self::build).
    pub fn jitter(mut self, factor: f64) -> Self {
        self.jitter_enabled = true;
        self.jitter_factor = Some(factor);
        self
    }

    /// Toggle jitter without changing the factor.
    pub fn jitter_enabled(mut self, enabled: bool) -> Self {
        self.jitter_enabled = enabled;
        self
    }

    /// Install the retry hook.
    pub fn on_retry<F>(mut self, callback: F) -> Self
    where
        F: Fn(&dyn Failure, u32) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        self.on_retry = Some(Arc::new(callback));
        self
    }

    /// Validate and build the policy.
    ///
    /// Fails if the jitter factor lies outside `[0, 1]` or the initial delay
    /// exceeds the cap.
    pub fn build(self) -> Result<RetryPolicy> {
        let initial_delay = self.initial_delay.unwrap_or(Duration::from_secs(1));
        let max_delay = self.max_delay.unwrap_or(Duration::from_secs(30));
        let jitter_factor = self.jitter_factor.unwrap_or(DEFAULT_JITTER_FACTOR);

        if !(0.0..=1.0).contains(&jitter_factor) {
            return Err(PolicyError::JitterFactorOutOfRange(jitter_factor));
        }
        if initial_delay > max_delay {
            return Err(PolicyError::DelayOrder {
                initial: initial_delay,
                max: max_delay,
            });
        }

        Ok(RetryPolicy {
            max_retries: self.max_retries.unwrap_or(3),
            initial_delay,
            max_delay,
            strategy: self.strategy.unwrap_or_default(),
            retryable_kinds: self.retryable_kinds,
            jitter_enabled: self.jitter_enabled,
            jitter_factor,
            on_retry: self.on_retry,
        })
    }
}
