//! Error types for adapters and engines.

use thiserror::Error;

/// Errors reported by a resource adapter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdapterError {
    /// The remote resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The provider rejected the request as malformed or invalid.
    #[error("bad request ({code}): {message}")]
    BadRequest { code: String, message: String },

    /// Conflict with the current remote state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Credentials rejected.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The call did not complete in time.
    #[error("timed out: {0}")]
    Timeout(String),

    /// Any other provider-side failure.
    #[error("service error {status} ({code}): {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
    },

    /// Internal adapter failure.
    #[error("internal: {0}")]
    Internal(String),
}

impl AdapterError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AdapterError::NotFound(_))
    }

    pub fn is_bad_request(&self) -> bool {
        matches!(self, AdapterError::BadRequest { .. })
    }

    /// Provider error code, if the provider supplied one.
    pub fn code(&self) -> Option<&str> {
        match self {
            AdapterError::BadRequest { code, .. } | AdapterError::Service { code, .. } => {
                Some(code)
            }
            _ => None,
        }
    }
}

/// Errors returned by the reconcile and delete engines.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// The object handed to a reconciler is not the kind it manages.
    #[error("spec mismatch: expected {expected}, got {found}")]
    SpecMismatch { expected: String, found: String },

    /// The object's spec could not be decoded into the kind's spec type.
    #[error("invalid {kind} spec: {source}")]
    Decode {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

impl EngineError {
    pub fn adapter(&self) -> Option<&AdapterError> {
        match self {
            EngineError::Adapter(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type for adapter operations.
pub type Result<T> = std::result::Result<T, AdapterError>;
