//! Unified error type for the document store boundary
//!
//! Write-path errors are caught and logged by the service; read-path errors
//! propagate up to the service which resolves them to default statistics.
//! Permission failures must stay distinguishable from availability failures
//! in logs, so they are separate variants.

use thiserror::Error;

/// Error raised by a document store operation
#[derive(Error, Debug)]
pub enum StoreError {
    /// The caller is not allowed to touch this document (missing or stale
    /// auth, security rules not deployed)
    #[error("permission denied on {key}")]
    PermissionDenied { key: String },

    /// The backend could not be reached or refused the operation
    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },

    /// A document or value could not be serialized for persistence
    #[error("malformed document at {key}: {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A fetch did not settle within the configured bound
    #[error("fetch timeout after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
}

impl StoreError {
    /// Create a permission error for a document key
    pub fn permission_denied(key: impl Into<String>) -> Self {
        Self::PermissionDenied { key: key.into() }
    }

    /// Create an availability error
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Create a fetch timeout error
    pub fn timeout(timeout_secs: u64) -> Self {
        Self::Timeout { timeout_secs }
    }

    /// Whether this failure is an authorization problem rather than an
    /// operational one
    pub fn is_permission(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }

    /// Whether retrying later could plausibly succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout { .. })
    }
}
