//! Anthropic Messages API backend

use async_trait::async_trait;
use relay_auth::{AuthMethod, ResolvedCredential};
use relay_config::{BackendKind, LlmConfig};
use reqwest::Client;
use secrecy::ExposeSecret;

use super::{Backend, endpoint, execute};
use crate::convert::AnthropicTranslator;
use crate::error::LlmError;
use crate::types::{ChatRequest, LlmResponse};

/// Default Anthropic API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";

/// Model used when neither the request nor the config names one
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";

/// Anthropic API version header value
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Beta flag required when authenticating with an OAuth access token
const OAUTH_BETA: &str = "oauth-2025-04-20";

/// Anthropic Messages API backend
pub struct AnthropicBackend {
    client: Client,
    base_url: String,
    default_model: String,
    translator: AnthropicTranslator,
}

impl AnthropicBackend {
    pub fn new(client: Client, config: &LlmConfig) -> Self {
        Self {
            client,
            base_url: config
                .base_url
                .as_ref()
                .map_or_else(|| DEFAULT_BASE_URL.to_owned(), ToString::to_string),
            default_model: config
                .default_model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            translator: AnthropicTranslator::new(config.temperature_enabled()),
        }
    }
}

#[async_trait]
impl Backend for AnthropicBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Anthropic
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    async fn send(
        &self,
        request: &ChatRequest,
        model: &str,
        credential: &ResolvedCredential,
    ) -> Result<LlmResponse, LlmError> {
        let builder = self
            .client
            .post(endpoint(&self.base_url, "messages"))
            .header("anthropic-version", ANTHROPIC_VERSION);

        let token = credential.token.expose_secret();
        let builder = match credential.method {
            AuthMethod::ApiKey => builder.header("x-api-key", token),
            AuthMethod::OAuth | AuthMethod::ManagedIdentity => {
                builder.bearer_auth(token).header("anthropic-beta", OAUTH_BETA)
            }
        };

        execute(BackendKind::Anthropic, &self.translator, builder, request, model).await
    }
}
