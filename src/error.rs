// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Error types for the replication tool.
//!
//! Errors are categorized by where they are handled. Only some of them abort
//! a run; the rest are recovered at the component that produced them.
//!
//! # Error Categories
//!
//! | Error Type | Aborts run | Description |
//! |------------|------------|-------------|
//! | `Config` | Yes (before any network call) | Missing include/exclude file, bad URL, bad timeout |
//! | `Network` | Yes | Instance unreachable, timeout, non-success HTTP status |
//! | `Internal` | Yes | Unexpected response body from the server |
//! | `InvalidState` | Yes | Run executed twice |
//! | `MalformedRecord` | No | `_replicator` document matches no known shape |
//! | `InvalidDatabaseName` | No | Name fails the CouchDB naming rule |
//!
//! # Abort Behavior
//!
//! Use [`ReplicationError::aborts_run()`] to decide whether the pipeline must
//! stop. Nothing is retried; work already dispatched is not rolled back.

use thiserror::Error;

/// Result type alias for replication operations.
pub type Result<T> = std::result::Result<T, ReplicationError>;

/// Errors that can occur while planning or dispatching replication.
#[derive(Error, Debug)]
pub enum ReplicationError {
    /// Invalid or missing configuration.
    ///
    /// Raised before any network access. Fix the input and rerun.
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP transport or status failure against a CouchDB instance.
    ///
    /// Carries the operation name (e.g. `list_databases`) and the instance
    /// host so the operator can tell which call failed.
    #[error("Network error ({operation} on {host}): {message}")]
    Network {
        operation: String,
        host: String,
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// A `_replicator` document that is neither structured nor
    /// embedded-credential shaped.
    #[error("Malformed replication document {id}: {reason}")]
    MalformedRecord { id: String, reason: String },

    /// Database name that does not match `^[a-z][a-z0-9_$()+\-/]*$`.
    #[error("Invalid database name: {0:?}")]
    InvalidDatabaseName(String),

    /// Run state machine violation (e.g. executing a run twice).
    #[error("Invalid state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },

    /// Unexpected response from the server.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReplicationError {
    /// Create a network error from a reqwest error.
    pub fn network(
        operation: impl Into<String>,
        host: impl Into<String>,
        source: reqwest::Error,
    ) -> Self {
        let message = if source.is_timeout() {
            format!("request timed out: {}", source)
        } else {
            source.to_string()
        };
        Self::Network {
            operation: operation.into(),
            host: host.into(),
            message,
            source: Some(source),
        }
    }

    /// Create a network error without source (e.g. a non-success status).
    pub fn network_msg(
        operation: impl Into<String>,
        host: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Network {
            operation: operation.into(),
            host: host.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a malformed-record error.
    pub fn malformed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Check if this error must stop the pipeline.
    pub fn aborts_run(&self) -> bool {
        match self {
            Self::Config(_) => true,
            Self::Network { .. } => true,
            Self::InvalidState { .. } => true,
            Self::Internal(_) => true,
            Self::MalformedRecord { .. } => false, // skipped by the normalizer
            Self::InvalidDatabaseName(_) => false, // rejected per name
        }
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Network { .. } => "network",
            Self::MalformedRecord { .. } => "malformed_record",
            Self::InvalidDatabaseName(_) => "invalid_database_name",
            Self::InvalidState { .. } => "invalid_state",
            Self::Internal(_) => "internal",
        }
    }
}
