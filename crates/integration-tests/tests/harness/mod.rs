//! Shared fixtures for relay integration tests
//!
//! Each test binary compiles this module separately and uses a different
//! subset of it.

#![allow(dead_code)]

pub mod config;
pub mod mock_backend;
pub mod secrets;

use std::sync::Arc;

use relay_auth::CredentialResolver;
use relay_config::Config;
use relay_llm::ProviderAdapter;

/// Adapter whose resolver reads ambient secrets from `secrets`
pub fn adapter(config: &Config, secrets: secrets::StaticSecrets) -> ProviderAdapter {
    let http = reqwest::Client::new();
    let resolver = CredentialResolver::for_backend(config, &http, Arc::new(secrets));
    ProviderAdapter::with_resolver(config, http, resolver).expect("valid test config")
}
