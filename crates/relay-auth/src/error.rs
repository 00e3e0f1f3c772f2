use crate::CredentialSource;

/// Credential resolution errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Every applicable source was exhausted without a usable token
    #[error("no {provider} credential found (last source tried: {last_source})")]
    CredentialNotFound {
        /// Credential identity that was requested
        provider: String,
        /// Last source consulted before giving up
        last_source: CredentialSource,
    },

    /// OAuth refresh round-trip failed
    #[error("refreshing {provider} token: {message}")]
    RefreshFailed {
        /// Credential identity being refreshed
        provider: String,
        /// Upstream or transport failure
        message: String,
    },

    /// Identity token acquisition failed (recovered by falling through)
    #[error("{source_name} token for scope {scope}: {message}")]
    IdentityTokenFailed {
        /// Identity provider that failed
        source_name: String,
        /// Scope that was requested
        scope: String,
        /// Upstream or transport failure
        message: String,
    },

    /// Persisted credential file could not be read or written
    #[error("credential store {path}: {message}")]
    Store {
        /// Store location
        path: String,
        /// I/O or format failure
        message: String,
    },

    /// Platform keychain query failed to run
    #[error("keychain lookup for service {service}: {message}")]
    Keychain {
        /// Service being queried
        service: String,
        /// Process failure
        message: String,
    },
}

impl AuthError {
    pub(crate) fn identity(source_name: &str, scope: &str, message: impl Into<String>) -> Self {
        Self::IdentityTokenFailed {
            source_name: source_name.to_owned(),
            scope: scope.to_owned(),
            message: message.into(),
        }
    }

    pub(crate) fn store(path: &std::path::Path, message: impl ToString) -> Self {
        Self::Store {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }
}
