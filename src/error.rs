//! # Error types used by the transports and the hub boundary.
//!
//! A single enum, [`TransportError`], covers the closed set of failure
//! conditions a transport can surface:
//!
//! - [`TransportError::Closed`]: sentinel for operations on a shut-down transport.
//! - [`TransportError::InvalidDsn`]: malformed or unsupported transport DSN.
//! - [`TransportError::Storage`]: a storage transaction failed; the update
//!   was neither persisted nor dispatched.
//! - [`TransportError::Encoding`]: JSON (de)serialization failed.
//!
//! The type provides `as_label()` for stable log/metric labels and
//! `is_closed()` for the common sentinel check.

use thiserror::Error;

/// # Errors produced by transports.
///
/// Configuration and persistence errors propagate to the caller; per-subscriber
/// failures never surface here, they disconnect the affected pipe only.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TransportError {
    /// Operation attempted on a transport whose shutdown has begun.
    #[error("transport is closed")]
    Closed,

    /// The transport DSN could not be parsed or names no known transport.
    #[error("invalid transport DSN {dsn:?}: {reason}")]
    InvalidDsn {
        /// The DSN as supplied by the caller.
        dsn: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The storage primitive rejected a transaction.
    #[error("storage failure: {0}")]
    Storage(#[from] redb::Error),

    /// Encoding or decoding the update wire form failed.
    #[error("encoding failure: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl TransportError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TransportError::Closed => "transport_closed",
            TransportError::InvalidDsn { .. } => "invalid_transport_dsn",
            TransportError::Storage(_) => "transport_storage",
            TransportError::Encoding(_) => "transport_encoding",
        }
    }

    /// True for the closed-transport sentinel.
    pub fn is_closed(&self) -> bool {
        matches!(self, TransportError::Closed)
    }

    pub(crate) fn invalid_dsn(dsn: impl Into<String>, reason: impl ToString) -> Self {
        TransportError::InvalidDsn {
            dsn: dsn.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<redb::DatabaseError> for TransportError {
    fn from(err: redb::DatabaseError) -> Self {
        TransportError::Storage(err.into())
    }
}

impl From<redb::TransactionError> for TransportError {
    fn from(err: redb::TransactionError) -> Self {
        TransportError::Storage(err.into())
    }
}

impl From<redb::TableError> for TransportError {
    fn from(err: redb::TableError) -> Self {
        TransportError::Storage(err.into())
    }
}

impl From<redb::StorageError> for TransportError {
    fn from(err: redb::StorageError) -> Self {
        TransportError::Storage(err.into())
    }
}

impl From<redb::CommitError> for TransportError {
    fn from(err: redb::CommitError) -> Self {
        TransportError::Storage(err.into())
    }
}
