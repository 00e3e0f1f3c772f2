//! Credential resolution for relay backends
//!
//! [`CredentialResolver`] walks an ordered chain of sources (direct secret,
//! platform keychain, identity provider, persisted OAuth credential) and
//! returns the first usable token. Ambient state is reached only through the
//! injected [`SecretSource`], [`CredentialStore`], [`TokenRefresher`] and
//! [`IdentityTokenProvider`] collaborators.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod credential;
mod error;
pub mod identity;
pub mod keychain;
mod locks;
pub mod oauth;
mod resolver;
mod secrets;
mod store;
mod trace;

pub use credential::{AuthMethod, Credential, CredentialSource, REFRESH_WINDOW, ResolvedCredential};
pub use error::AuthError;
pub use identity::{AccessToken, IdentityChain, IdentityTokenProvider};
pub use keychain::KeychainLookup;
pub use locks::RefreshLocks;
pub use oauth::{OAuthClient, OAuthRefresher, TokenRefresher};
pub use resolver::{CredentialResolver, default_secret_env};
pub use secrets::{SecretSource, SystemSecrets};
pub use store::{CredentialStore, FileCredentialStore};
