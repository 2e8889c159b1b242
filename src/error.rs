//! Error types for the DPL array adapter.
//!
//! Provides structured error types for the transport layer, the command API
//! and the backend orchestration layer.

use thiserror::Error;

/// Unified error type for the adapter
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Transport Errors
    // =========================================================================
    #[error("array rejected credentials (HTTP 401)")]
    Unauthorized,

    #[error("array transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("array service unavailable after {attempts} attempts")]
    ServiceUnavailable { attempts: u32 },

    // =========================================================================
    // Protocol Errors
    // =========================================================================
    #[error("undecodable array response: {0}")]
    Protocol(String),

    // =========================================================================
    // Backend Errors
    // =========================================================================
    #[error("array operation failed: {operation} {entity}: {reason}")]
    BackendOperationFailed {
        operation: String,
        entity: String,
        reason: String,
    },

    #[error("snapshot for volume {volume} not found in snapshot {snapshot} of group {group}")]
    SnapshotNotFoundInGroup {
        volume: String,
        group: String,
        snapshot: String,
    },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for the orchestration-layer failure variant.
    pub fn backend(
        operation: impl Into<String>,
        entity: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Error::BackendOperationFailed {
            operation: operation.into(),
            entity: entity.into(),
            reason: reason.into(),
        }
    }

    /// Check if this error is transient from the caller's point of view.
    ///
    /// Authentication failures and malformed responses are not; a saturated
    /// or unreachable array may recover.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Transport(_) | Error::ServiceUnavailable { .. }
        )
    }
}

/// Result type alias for the adapter
pub type Result<T> = std::result::Result<T, Error>;
