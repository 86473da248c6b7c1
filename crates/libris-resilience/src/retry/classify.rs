//! Decide whether a failure is eligible for retry under a policy.

use super::policy::RetryPolicy;
use crate::failure::{Failure, FailureKind};

/// SQLSTATE codes for conditions that usually clear up on their own.
///
/// Resource exhaustion (`53xxx`), connection failures (`08xxx`), serialization
/// conflicts, deadlocks, and a server that is still starting up.
pub const TRANSIENT_SQL_STATES: &[&str] = &[
    "53000", // insufficient_resources
    "53200", // out_of_memory
    "53300", // too_many_connections
    "08000", // connection_exception
    "08001", // sqlclient_unable_to_establish_sqlconnection
    "08003", // connection_does_not_exist
    "08004", // sqlserver_rejected_establishment_of_sqlconnection
    "08006", // connection_failure
    "40001", // serialization_failure
    "40P01", // deadlock_detected
    "57P03", // cannot_connect_now
];

/// Lower-case message fragments that mark a database failure as transient.
pub const TRANSIENT_MESSAGE_HINTS: &[&str] = &[
    "timeout",
    "timed out",
    "connection pool",
    "pool exhausted",
    "too many clients",
];

/// Returns `true` if `failure` may be retried under `policy`.
///
/// Rules, first match wins:
///
/// 1. An empty kind list retries everything.
/// 2. The failure's kind is, or specializes, a listed kind.
/// 3. The failure is a database failure that looks transient (see
///    [`is_transient_database_failure`]), whether or not `Database` is listed.
/// 4. Otherwise the failure is not retried.
///
/// # Examples
///
/// ```rust
/// use libris_resilience::{is_retryable, FailureKind, OperationError, RetryPolicy};
///
/// let policy = RetryPolicy::builder()
///     .retry_on(FailureKind::Timeout)
///     .build()
///     .unwrap();
///
/// assert!(is_retryable(&OperationError::Timeout("slow".into()), &policy));
/// assert!(!is_retryable(&OperationError::AccessDenied("nope".into()), &policy));
/// // Deadlocks are retried even though Database is not listed.
/// assert!(is_retryable(
///     &OperationError::database_with_code("40P01", "deadlock detected"),
///     &policy,
/// ));
/// ```
pub fn is_retryable<E: Failure + ?Sized>(failure: &E, policy: &RetryPolicy) -> bool {
    let kinds = policy.retryable_kinds();
    if kinds.is_empty() {
        return true;
    }

    let kind = failure.kind();
    if kinds.iter().any(|listed| kind.is_a(*listed)) {
        return true;
    }

    is_transient_database_failure(failure)
}

/// Best-effort check for transient database trouble.
///
/// A failure qualifies when its kind is a [`FailureKind::Database`] kind and
/// either its SQLSTATE code is in [`TRANSIENT_SQL_STATES`] or its message, or
/// any message down its `source()` chain, contains one of
/// [`TRANSIENT_MESSAGE_HINTS`] (case-insensitive).
///
/// The message match is a loose net: driver wording varies between versions
/// and locales, so prefer reporting SQLSTATE codes through
/// [`Failure::sql_state`] whenever the driver exposes them.
pub fn is_transient_database_failure<E: Failure + ?Sized>(failure: &E) -> bool {
    if !failure.kind().is_a(FailureKind::Database) {
        return false;
    }

    if let Some(code) = failure.sql_state()
        && TRANSIENT_SQL_STATES
            .iter()
            .any(|known| known.eq_ignore_ascii_case(code.trim()))
    {
        return true;
    }

    if message_has_transient_hint(&failure.to_string()) {
        return true;
    }
    let mut source = failure.source();
    while let Some(err) = source {
        if message_has_transient_hint(&err.to_string()) {
            return true;
        }
        source = err.source();
    }
    false
}

fn message_has_transient_hint(message: &str) -> bool {
    let message = message.to_lowercase();
    TRANSIENT_MESSAGE_HINTS
        .iter()
        .any(|hint| message.contains(hint))
}
