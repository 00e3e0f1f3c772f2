use std::fmt;

use jiff::{SignedDuration, Timestamp};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};

/// An OAuth credential is refreshed once it is this close to expiry
pub const REFRESH_WINDOW: SignedDuration = SignedDuration::from_secs(5 * 60);

/// How a credential was originally issued
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthMethod {
    /// Long-lived API key
    #[default]
    #[serde(rename = "api_key")]
    ApiKey,
    /// Delegated OAuth access token with an optional refresh token
    #[serde(rename = "oauth")]
    OAuth,
    /// Short-lived token minted for a managed identity
    #[serde(rename = "managed_identity")]
    ManagedIdentity,
}

/// Authentication artifact as persisted in the credential store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    /// Bearer token or API key
    #[serde(serialize_with = "expose")]
    pub access_token: SecretString,
    /// OAuth refresh token
    #[serde(default, skip_serializing_if = "Option::is_none", serialize_with = "expose_optional")]
    pub refresh_token: Option<SecretString>,
    /// Secondary identifier sent alongside the token (e.g. ChatGPT account)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default)]
    pub auth_method: AuthMethod,
    /// Absolute expiry; `None` means the token does not expire
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
}

impl Credential {
    /// Static API key credential
    pub fn api_key(key: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::from(key.into()),
            refresh_token: None,
            account_id: None,
            auth_method: AuthMethod::ApiKey,
            expires_at: None,
        }
    }

    /// Whether this is an OAuth credential within [`REFRESH_WINDOW`] of expiry at `now`
    pub fn needs_refresh(&self, now: Timestamp) -> bool {
        self.auth_method == AuthMethod::OAuth
            && self
                .expires_at
                .is_some_and(|expires_at| expires_at.duration_since(now) <= REFRESH_WINDOW)
    }

    /// Whether the refresh step can run at all
    pub fn can_refresh(&self) -> bool {
        self.refresh_token
            .as_ref()
            .is_some_and(|t| !t.expose_secret().is_empty())
    }
}

/// Which rung of the resolution chain produced a credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Direct secret environment variable
    Environment,
    /// Platform keychain
    Keychain,
    /// Managed identity or another ambient identity provider
    Identity,
    /// Persisted OAuth credential that was refreshed during resolution
    RefreshedStore,
    /// Persisted credential returned as-is
    Store,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Environment => "environment",
            Self::Keychain => "keychain",
            Self::Identity => "identity provider",
            Self::RefreshedStore => "credential store (refreshed)",
            Self::Store => "credential store",
        })
    }
}

/// Result of one resolution, owned by the caller for the duration of a request
#[derive(Debug, Clone)]
pub struct ResolvedCredential {
    /// Token to attach to the backend request
    pub token: SecretString,
    /// Secondary identifier, when the source provides one
    pub account_id: Option<String>,
    pub method: AuthMethod,
    pub source: CredentialSource,
}

impl ResolvedCredential {
    pub(crate) fn from_credential(credential: Credential, source: CredentialSource) -> Self {
        Self {
            token: credential.access_token,
            account_id: credential.account_id.filter(|id| !id.is_empty()),
            method: credential.auth_method,
            source,
        }
    }
}

#[allow(clippy::ref_option)]
fn expose_optional<S: Serializer>(secret: &Option<SecretString>, serializer: S) -> Result<S::Ok, S::Error> {
    match secret {
        Some(secret) => serializer.serialize_some(secret.expose_secret()),
        None => serializer.serialize_none(),
    }
}

fn expose<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oauth(expires_at: Option<Timestamp>) -> Credential {
        Credential {
            access_token: SecretString::from("access"),
            refresh_token: Some(SecretString::from("refresh")),
            account_id: Some("acct".to_owned()),
            auth_method: AuthMethod::OAuth,
            expires_at,
        }
    }

    #[test]
    fn refresh_window_is_five_minutes() {
        let now = Timestamp::now();
        let soon = now.checked_add(SignedDuration::from_secs(4 * 60)).unwrap();
        let later = now.checked_add(SignedDuration::from_secs(10 * 60)).unwrap();
        let past = now.checked_sub(SignedDuration::from_secs(60)).unwrap();

        assert!(oauth(Some(soon)).needs_refresh(now));
        assert!(oauth(Some(past)).needs_refresh(now));
        assert!(!oauth(Some(later)).needs_refresh(now));
        assert!(!oauth(None).needs_refresh(now));
    }

    #[test]
    fn api_keys_never_need_refresh() {
        let mut credential = Credential::api_key("sk-test");
        credential.expires_at = Some(Timestamp::UNIX_EPOCH);
        assert!(!credential.needs_refresh(Timestamp::now()));
    }

    #[test]
    fn serializes_secrets_in_clear_for_the_store() {
        let credential = oauth(Some("2030-01-01T00:00:00Z".parse().unwrap()));
        let json = serde_json::to_value(&credential).unwrap();

        assert_eq!(json["access_token"], "access");
        assert_eq!(json["refresh_token"], "refresh");
        assert_eq!(json["auth_method"], "oauth");
        assert_eq!(json["expires_at"], "2030-01-01T00:00:00Z");

        let back: Credential = serde_json::from_value(json).unwrap();
        assert_eq!(back.access_token.expose_secret(), "access");
        assert_eq!(back.auth_method, AuthMethod::OAuth);
    }

    #[test]
    fn debug_output_redacts_tokens() {
        let rendered = format!("{:?}", oauth(None));
        assert!(!rendered.contains("access\""));
        assert!(!rendered.contains("\"refresh\""));
    }

    #[test]
    fn empty_account_id_is_dropped() {
        let mut credential = Credential::api_key("k");
        credential.account_id = Some(String::new());
        let resolved = ResolvedCredential::from_credential(credential, CredentialSource::Store);
        assert!(resolved.account_id.is_none());
    }
}
