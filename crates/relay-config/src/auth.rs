use std::path::PathBuf;

use serde::Deserialize;

/// Credential resolution settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Trace every credential source attempt and its outcome
    #[serde(default)]
    pub verbose: bool,
    /// Environment variable holding a direct secret, overriding the backend default
    #[serde(default)]
    pub secret_env: Option<String>,
    /// Location of the persisted credential file (defaults to `~/.relay/auth.json`)
    #[serde(default)]
    pub credentials_path: Option<PathBuf>,
    /// Platform keychain lookup
    #[serde(default)]
    pub keychain: KeychainConfig,
}

/// Platform keychain lookup settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeychainConfig {
    /// Services to query, highest priority first (backend default when unset)
    #[serde(default)]
    pub services: Option<Vec<String>>,
    /// Keychain account name to match
    #[serde(default)]
    pub account: Option<String>,
}
