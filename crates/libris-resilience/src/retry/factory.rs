//! Pre-tuned policies for the failure domains the data-access layer deals with.

use super::policy::{BackoffStrategy, RetryPolicy};
use crate::error::BoxError;
use crate::failure::{Failure, FailureKind};
use std::time::Duration;
use tracing::warn;

/// Builders for common policies. Stateless; every call returns a fresh policy.
///
/// | policy      | retries | initial | cap    | strategy    | jitter | kinds                                  |
/// |-------------|---------|---------|--------|-------------|--------|----------------------------------------|
/// | default     | 3       | 1s      | 30s    | exponential | yes    | io, timeout, database                  |
/// | database    | 5       | 500ms   | 10s    | exponential | yes    | database, timeout, invalid_operation   |
/// | network     | 3       | 2s      | 20s    | exponential | yes    | network, socket, timeout               |
/// | file I/O    | 5       | 500ms   | 5s     | linear      | no     | io, access_denied                      |
///
/// All but the default policy log each retry through `tracing`.
pub struct PolicyFactory;

impl PolicyFactory {
    /// General-purpose policy for I/O, timeouts and database trouble.
    pub fn default_policy() -> RetryPolicy {
        RetryPolicy::preset(
            3,
            Duration::from_millis(1000),
            Duration::from_millis(30_000),
            BackoffStrategy::Exponential,
            [FailureKind::Io, FailureKind::Timeout, FailureKind::Database],
            true,
        )
    }

    /// Policy for database calls, including connection-pool exhaustion
    /// (reported as [`FailureKind::InvalidOperation`]).
    pub fn database_policy() -> RetryPolicy {
        RetryPolicy::preset(
            5,
            Duration::from_millis(500),
            Duration::from_millis(10_000),
            BackoffStrategy::Exponential,
            [
                FailureKind::Database,
                FailureKind::Timeout,
                FailureKind::InvalidOperation,
            ],
            true,
        )
        .with_on_retry(|failure, attempt| log_retry("database", failure, attempt))
    }

    /// Policy for remote calls.
    pub fn network_policy() -> RetryPolicy {
        RetryPolicy::preset(
            3,
            Duration::from_millis(2000),
            Duration::from_millis(20_000),
            BackoffStrategy::Exponential,
            [FailureKind::Network, FailureKind::Socket, FailureKind::Timeout],
            true,
        )
        .with_on_retry(|failure, attempt| log_retry("network", failure, attempt))
    }

    /// Policy for local file access, where locks and sharing violations clear
    /// quickly and predictably.
    pub fn file_io_policy() -> RetryPolicy {
        RetryPolicy::preset(
            5,
            Duration::from_millis(500),
            Duration::from_millis(5000),
            BackoffStrategy::Linear,
            [FailureKind::Io, FailureKind::AccessDenied],
            false,
        )
        .with_on_retry(|failure, attempt| log_retry("file_io", failure, attempt))
    }

    /// Policy with caller-chosen count, delay, growth and kinds.
    ///
    /// Jitter is enabled only for [`BackoffStrategy::Exponential`]. The cap is
    /// 30s, or `initial_delay` if that is larger.
    ///
    /// ```rust
    /// use libris_resilience::{BackoffStrategy, FailureKind, PolicyFactory};
    /// use std::time::Duration;
    ///
    /// let policy = PolicyFactory::custom_policy(
    ///     4,
    ///     Duration::from_millis(250),
    ///     BackoffStrategy::Fibonacci,
    ///     [FailureKind::Timeout],
    /// );
    /// assert!(!policy.jitter_enabled());
    /// ```
    pub fn custom_policy(
        max_retries: u32,
        initial_delay: Duration,
        strategy: BackoffStrategy,
        retryable_kinds: impl IntoIterator<Item = FailureKind>,
    ) -> RetryPolicy {
        RetryPolicy::preset(
            max_retries,
            initial_delay,
            initial_delay.max(Duration::from_secs(30)),
            strategy,
            retryable_kinds,
            strategy == BackoffStrategy::Exponential,
        )
    }
}

fn log_retry(domain: &'static str, failure: &dyn Failure, attempt: u32) -> Result<(), BoxError> {
    warn!(
        domain,
        attempt,
        kind = %failure.kind(),
        error = %failure,
        "Retrying after transient failure"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::OperationError;

    fn kinds(policy: &RetryPolicy) -> Vec<FailureKind> {
        policy.retryable_kinds().iter().copied().collect()
    }

    #[test]
    fn test_default_policy() {
        let p = PolicyFactory::default_policy();
        assert_eq!(p.max_retries(), 3);
        assert_eq!(p.initial_delay(), Duration::from_secs(1));
        assert_eq!(p.max_delay(), Duration::from_secs(30));
        assert_eq!(p.strategy(), BackoffStrategy::Exponential);
        assert!(p.jitter_enabled());
        assert_eq!(
            kinds(&p),
            vec![FailureKind::Io, FailureKind::Timeout, FailureKind::Database]
        );
        assert!(p.on_retry().is_none());
    }

    #[test]
    fn test_database_policy() {
        let p = PolicyFactory::database_policy();
        assert_eq!(p.max_retries(), 5);
        assert_eq!(p.initial_delay(), Duration::from_millis(500));
        assert_eq!(p.max_delay(), Duration::from_secs(10));
        assert!(p.jitter_enabled());
        assert_eq!(
            kinds(&p),
            vec![
                FailureKind::Timeout,
                FailureKind::Database,
                FailureKind::InvalidOperation
            ]
        );
        assert!(p.on_retry().is_some());
    }

    #[test]
    fn test_network_policy() {
        let p = PolicyFactory::network_policy();
        assert_eq!(p.max_retries(), 3);
        assert_eq!(p.initial_delay(), Duration::from_secs(2));
        assert_eq!(p.max_delay(), Duration::from_secs(20));
        assert_eq!(
            kinds(&p),
            vec![FailureKind::Timeout, FailureKind::Network, FailureKind::Socket]
        );
        assert!(p.on_retry().is_some());
    }

    #[test]
    fn test_file_io_policy() {
        let p = PolicyFactory::file_io_policy();
        assert_eq!(p.max_retries(), 5);
        assert_eq!(p.max_delay(), Duration::from_secs(5));
        assert_eq!(p.strategy(), BackoffStrategy::Linear);
        assert!(!p.jitter_enabled());
        assert_eq!(kinds(&p), vec![FailureKind::Io, FailureKind::AccessDenied]);
    }

    #[test]
    fn test_custom_policy_jitter_only_for_exponential() {
        let exp = PolicyFactory::custom_policy(
            2,
            Duration::from_millis(100),
            BackoffStrategy::Exponential,
            [FailureKind::Timeout],
        );
        assert!(exp.jitter_enabled());

        for strategy in [BackoffStrategy::Linear, BackoffStrategy::Fibonacci] {
            let p = PolicyFactory::custom_policy(2, Duration::from_millis(100), strategy, []);
            assert!(!p.jitter_enabled());
            assert!(p.retryable_kinds().is_empty());
        }
    }

    #[test]
    fn test_custom_policy_cap_never_below_initial() {
        let p = PolicyFactory::custom_policy(
            1,
            Duration::from_secs(45),
            BackoffStrategy::Linear,
            [FailureKind::Io],
        );
        assert_eq!(p.max_delay(), Duration::from_secs(45));

        let p = PolicyFactory::custom_policy(1, Duration::from_secs(1), BackoffStrategy::Linear, []);
        assert_eq!(p.max_delay(), Duration::from_secs(30));
    }

    #[test]
    fn test_logging_callback_never_fails() {
        let p = PolicyFactory::network_policy();
        let callback = p.on_retry().unwrap();
        let err: &dyn Failure = &OperationError::Socket("connection reset by peer".into());
        assert!(callback(err, 1).is_ok());
    }
}
