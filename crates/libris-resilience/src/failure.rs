//! Failure tags used for retry classification.
//!
//! Every error that flows through the executor implements [`Failure`], which
//! maps it onto a small closed set of [`FailureKind`] tags. Tags form a shallow
//! "is-a" hierarchy (e.g. [`FailureKind::FileNotFound`] is an
//! [`FailureKind::Io`] failure), so a policy that retries `Io` also retries
//! every I/O sub-kind.

use crate::error::PolicyError;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::io;
use std::str::FromStr;

/// Capability tag describing what went wrong, independent of the concrete error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Generic I/O failure.
    Io,
    /// A file or directory was missing.
    FileNotFound,
    /// A stream ended before the expected data arrived.
    EndOfStream,
    /// The operation (or one of its dependencies) timed out.
    Timeout,
    /// Failure reported by a database driver.
    Database,
    /// Database failure raised by the server itself, usually carrying a SQLSTATE code.
    DatabaseServer,
    /// The operation was invoked in an invalid state (e.g. connection pool exhausted).
    InvalidOperation,
    /// An object was used after it was closed or disposed.
    ObjectDisposed,
    /// Higher-level network failure (HTTP, name resolution).
    Network,
    /// Socket-level failure (refused, reset, broken pipe).
    Socket,
    /// The caller lacks permission for the resource.
    AccessDenied,
    /// The operation observed a cancellation request.
    Cancelled,
    /// Anything else.
    Other,
}

impl FailureKind {
    /// All kinds, in declaration order.
    pub const ALL: [FailureKind; 13] = [
        FailureKind::Io,
        FailureKind::FileNotFound,
        FailureKind::EndOfStream,
        FailureKind::Timeout,
        FailureKind::Database,
        FailureKind::DatabaseServer,
        FailureKind::InvalidOperation,
        FailureKind::ObjectDisposed,
        FailureKind::Network,
        FailureKind::Socket,
        FailureKind::AccessDenied,
        FailureKind::Cancelled,
        FailureKind::Other,
    ];

    /// The broader kind this one specializes, if any.
    pub fn parent(self) -> Option<FailureKind> {
        match self {
            FailureKind::FileNotFound | FailureKind::EndOfStream => Some(FailureKind::Io),
            FailureKind::DatabaseServer => Some(FailureKind::Database),
            FailureKind::ObjectDisposed => Some(FailureKind::InvalidOperation),
            _ => None,
        }
    }

    /// Returns `true` if `self` equals `ancestor` or specializes it.
    ///
    /// ```rust
    /// use libris_resilience::FailureKind;
    ///
    /// assert!(FailureKind::FileNotFound.is_a(FailureKind::Io));
    /// assert!(FailureKind::Io.is_a(FailureKind::Io));
    /// assert!(!FailureKind::Io.is_a(FailureKind::FileNotFound));
    /// ```
    pub fn is_a(self, ancestor: FailureKind) -> bool {
        let mut current = Some(self);
        while let Some(kind) = current {
            if kind == ancestor {
                return true;
            }
            current = kind.parent();
        }
        false
    }

    /// Stable snake_case name, matching the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Io => "io",
            FailureKind::FileNotFound => "file_not_found",
            FailureKind::EndOfStream => "end_of_stream",
            FailureKind::Timeout => "timeout",
            FailureKind::Database => "database",
            FailureKind::DatabaseServer => "database_server",
            FailureKind::InvalidOperation => "invalid_operation",
            FailureKind::ObjectDisposed => "object_disposed",
            FailureKind::Network => "network",
            FailureKind::Socket => "socket",
            FailureKind::AccessDenied => "access_denied",
            FailureKind::Cancelled => "cancelled",
            FailureKind::Other => "other",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailureKind {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        FailureKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| PolicyError::UnknownFailureKind(s.to_string()))
    }
}

/// An error the retry engine knows how to classify.
///
/// Implementors map themselves onto a [`FailureKind`]. Database drivers should
/// also report their SQLSTATE code through [`Failure::sql_state`] so transient
/// server conditions (deadlocks, connection limits) can be detected without
/// relying on message text.
pub trait Failure: Error {
    /// The tag this failure belongs to.
    fn kind(&self) -> FailureKind;

    /// Five-character SQLSTATE code, for database failures that carry one.
    fn sql_state(&self) -> Option<&str> {
        None
    }
}

impl Failure for io::Error {
    fn kind(&self) -> FailureKind {
        match self.kind() {
            io::ErrorKind::TimedOut => FailureKind::Timeout,
            io::ErrorKind::PermissionDenied => FailureKind::AccessDenied,
            io::ErrorKind::NotFound => FailureKind::FileNotFound,
            io::ErrorKind::UnexpectedEof => FailureKind::EndOfStream,
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::AddrInUse
            | io::ErrorKind::AddrNotAvailable
            | io::ErrorKind::BrokenPipe => FailureKind::Socket,
            _ => FailureKind::Io,
        }
    }
}

/// Ready-made failure type for callers that do not define their own.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    /// The operation timed out.
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// I/O failure; classified from the underlying [`io::ErrorKind`].
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Database driver failure, optionally with a SQLSTATE code.
    #[error("database error: {message}")]
    Database {
        /// SQLSTATE code reported by the server, if any.
        code: Option<String>,
        /// Driver or server message.
        message: String,
    },

    /// Network failure above the socket layer.
    #[error("network error: {0}")]
    Network(String),

    /// Socket-level failure.
    #[error("socket error: {0}")]
    Socket(String),

    /// Operation attempted in an invalid state.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Permission failure.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// The operation observed cancellation.
    #[error("operation cancelled")]
    Cancelled,

    /// Anything else.
    #[error("{0}")]
    Other(String),
}

impl OperationError {
    /// Database failure without a SQLSTATE code.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            code: None,
            message: message.into(),
        }
    }

    /// Database failure reported by the server with a SQLSTATE code.
    pub fn database_with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Database {
            code: Some(code.into()),
            message: message.into(),
        }
    }
}

impl Failure for OperationError {
    fn kind(&self) -> FailureKind {
        match self {
            Self::Timeout(_) => FailureKind::Timeout,
            Self::Io(err) => Failure::kind(err),
            Self::Database { code: Some(_), .. } => FailureKind::DatabaseServer,
            Self::Database { code: None, .. } => FailureKind::Database,
            Self::Network(_) => FailureKind::Network,
            Self::Socket(_) => FailureKind::Socket,
            Self::InvalidOperation(_) => FailureKind::InvalidOperation,
            Self::AccessDenied(_) => FailureKind::AccessDenied,
            Self::Cancelled => FailureKind::Cancelled,
            Self::Other(_) => FailureKind::Other,
        }
    }

    fn sql_state(&self) -> Option<&str> {
        match self {
            Self::Database { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}
