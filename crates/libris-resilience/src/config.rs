//! Serializable retry settings, loadable from config files or the environment.

use crate::error::{PolicyError, Result};
use crate::failure::FailureKind;
use crate::retry::{BackoffStrategy, PolicyFactory, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Plain-data form of a [`RetryPolicy`], suitable for TOML/JSON config.
///
/// Missing fields take the values of [`PolicyFactory::default_policy`].
/// Callbacks cannot be expressed here; attach one afterwards with
/// [`RetryPolicy::with_on_retry`].
///
/// ```rust
/// use libris_resilience::{config::RetrySettings, RetryPolicy};
///
/// let settings: RetrySettings = serde_json::from_str(
///     r#"{ "max_retries": 5, "strategy": "linear", "retryable_kinds": ["io"] }"#,
/// ).unwrap();
/// let policy = RetryPolicy::try_from(settings).unwrap();
/// assert_eq!(policy.max_retries(), 5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Initial delay in milliseconds.
    pub initial_delay_ms: u64,
    /// Delay cap in milliseconds.
    pub max_delay_ms: u64,
    /// Growth rule.
    pub strategy: BackoffStrategy,
    /// Kinds eligible for retry; empty retries everything.
    pub retryable_kinds: Vec<FailureKind>,
    /// Whether to randomize delays.
    pub jitter: bool,
    /// Jitter proportion in `[0, 1]`.
    pub jitter_factor: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self::from(&PolicyFactory::default_policy())
    }
}

impl From<&RetryPolicy> for RetrySettings {
    fn from(policy: &RetryPolicy) -> Self {
        Self {
            max_retries: policy.max_retries(),
            initial_delay_ms: policy.initial_delay().as_millis() as u64,
            max_delay_ms: policy.max_delay().as_millis() as u64,
            strategy: policy.strategy(),
            retryable_kinds: policy.retryable_kinds().iter().copied().collect(),
            jitter: policy.jitter_enabled(),
            jitter_factor: policy.jitter_factor(),
        }
    }
}

impl TryFrom<RetrySettings> for RetryPolicy {
    type Error = PolicyError;

    fn try_from(settings: RetrySettings) -> Result<Self> {
        RetryPolicy::builder()
            .max_retries(settings.max_retries)
            .initial_delay(Duration::from_millis(settings.initial_delay_ms))
            .max_delay(Duration::from_millis(settings.max_delay_ms))
            .strategy(settings.strategy)
            .retryable_kinds(settings.retryable_kinds)
            .jitter(settings.jitter_factor)
            .jitter_enabled(settings.jitter)
            .build()
    }
}

impl RetrySettings {
    /// Load settings from environment variables, starting from the defaults.
    ///
    /// This will look for, with `prefix = "LIBRIS_RETRY"`:
    /// - `LIBRIS_RETRY_MAX_RETRIES`
    /// - `LIBRIS_RETRY_INITIAL_DELAY_MS`
    /// - `LIBRIS_RETRY_MAX_DELAY_MS`
    /// - `LIBRIS_RETRY_STRATEGY` (`linear`, `exponential`, `fibonacci`)
    /// - `LIBRIS_RETRY_JITTER` (`true`/`false`/`1`/`0`)
    /// - `LIBRIS_RETRY_JITTER_FACTOR`
    /// - `LIBRIS_RETRY_RETRYABLE_KINDS` (comma-separated, e.g. `timeout,database`)
    ///
    /// Unset variables keep their default; set but malformed ones are an error.
    pub fn from_env(prefix: &str) -> Result<Self> {
        let mut settings = Self::default();

        if let Some(value) = env_var(prefix, "MAX_RETRIES") {
            settings.max_retries = parse_env(prefix, "MAX_RETRIES", &value)?;
        }
        if let Some(value) = env_var(prefix, "INITIAL_DELAY_MS") {
            settings.initial_delay_ms = parse_env(prefix, "INITIAL_DELAY_MS", &value)?;
        }
        if let Some(value) = env_var(prefix, "MAX_DELAY_MS") {
            settings.max_delay_ms = parse_env(prefix, "MAX_DELAY_MS", &value)?;
        }
        if let Some(value) = env_var(prefix, "STRATEGY") {
            settings.strategy = value.parse()?;
        }
        if let Some(value) = env_var(prefix, "JITTER") {
            settings.jitter = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => return Err(invalid(prefix, "JITTER", &value)),
            };
        }
        if let Some(value) = env_var(prefix, "JITTER_FACTOR") {
            settings.jitter_factor = parse_env(prefix, "JITTER_FACTOR", &value)?;
        }
        if let Some(value) = env_var(prefix, "RETRYABLE_KINDS") {
            settings.retryable_kinds = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::parse::<FailureKind>)
                .collect::<Result<Vec<_>>>()?;
        }

        Ok(settings)
    }

    /// Validate and convert into a policy.
    pub fn into_policy(self) -> Result<RetryPolicy> {
        RetryPolicy::try_from(self)
    }
}

fn env_var(prefix: &str, name: &str) -> Option<String> {
    std::env::var(format!("{prefix}_{name}")).ok()
}

fn parse_env<T: std::str::FromStr>(prefix: &str, name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(prefix, name, value))
}

fn invalid(prefix: &str, name: &str, value: &str) -> PolicyError {
    PolicyError::InvalidEnv {
        var: format!("{prefix}_{name}"),
        value: value.to_string(),
    }
}
