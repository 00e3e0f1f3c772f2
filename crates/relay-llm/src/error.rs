use relay_auth::AuthError;
use relay_config::{BackendKind, ConfigError};
use thiserror::Error;

/// Errors that can occur during a `chat` call
#[derive(Debug, Error)]
pub enum LlmError {
    /// No credential source produced a usable token
    #[error("resolving credentials: {0}")]
    Credential(#[from] AuthError),

    /// The backend could not be reached, rejected the call, or sent an unreadable body
    #[error("{} API call: {message}", .backend.api_name())]
    BackendCall {
        /// Backend that failed
        backend: BackendKind,
        /// HTTP status, when the backend answered at all
        status: Option<u16>,
        /// Transport error or response body
        message: String,
    },

    /// Adapter could not be built from the given configuration
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Caller cancelled the request
    #[error("request cancelled")]
    Cancelled,

    /// Caller deadline elapsed before the backend answered
    #[error("request deadline exceeded")]
    DeadlineExceeded,
}

impl LlmError {
    pub(crate) fn backend(backend: BackendKind, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::BackendCall {
            backend,
            status,
            message: message.into(),
        }
    }

    /// HTTP status returned by the backend, if any
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::BackendCall { status, .. } => *status,
            _ => None,
        }
    }
}
