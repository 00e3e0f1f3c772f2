//! Configuration for the relay LLM gateway
//!
//! Settings come either from a TOML file with `{{ env.VAR }}` placeholders or
//! directly from environment variables. Once loaded they are never mutated.

#![allow(clippy::must_use_candidate)]

pub mod auth;
mod env;
mod error;
pub mod llm;
mod loader;
pub mod logging;

use serde::Deserialize;

pub use auth::*;
pub use error::ConfigError;
pub use llm::*;
pub use logging::*;

/// Top-level relay configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Backend selection and per-backend settings
    #[serde(default)]
    pub llm: LlmConfig,
    /// Credential resolution settings
    #[serde(default)]
    pub auth: AuthConfig,
    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}
