//! Azure `OpenAI` chat completions backend

use async_trait::async_trait;
use relay_auth::{AuthMethod, ResolvedCredential};
use relay_config::{AzureConfig, BackendKind, LlmConfig};
use reqwest::Client;
use secrecy::ExposeSecret;

use super::{Backend, endpoint, execute};
use crate::convert::ChatCompletionsTranslator;
use crate::error::LlmError;
use crate::types::{ChatRequest, LlmResponse};

/// Azure `OpenAI` deployment backend
///
/// The deployment is addressed by URL path and the API version travels as a
/// query parameter, never as a header.
pub struct AzureBackend {
    client: Client,
    url: String,
    api_version: String,
    default_model: String,
    translator: ChatCompletionsTranslator,
}

impl AzureBackend {
    pub fn new(client: Client, config: &LlmConfig, azure: &AzureConfig) -> Self {
        let path = format!("openai/deployments/{}/chat/completions", azure.deployment);
        Self {
            client,
            url: endpoint(azure.endpoint.as_str(), &path),
            api_version: azure.api_version.clone(),
            default_model: config
                .default_model
                .clone()
                .unwrap_or_else(|| azure.deployment.clone()),
            translator: ChatCompletionsTranslator::new(config.temperature_enabled()),
        }
    }

    /// Chat completions URL without the `api-version` query
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Backend for AzureBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Azure
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
            .post(&self.url)
            .query(&[("api-version", self.api_version.as_str())]);

        let token = credential.token.expose_secret();
        let builder = match credential.method {
            AuthMethod::ApiKey => builder.header("api-key", token),
            AuthMethod::OAuth | AuthMethod::ManagedIdentity => builder.bearer_auth(token),
        };

        execute(BackendKind::Azure, &self.translator, builder, request, model).await
    }
}
