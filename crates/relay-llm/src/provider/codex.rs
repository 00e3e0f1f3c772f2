//! ChatGPT Codex backend speaking the Responses API

use async_trait::async_trait;
use relay_auth::ResolvedCredential;
use relay_config::{BackendKind, LlmConfig};
use reqwest::Client;
use secrecy::ExposeSecret;

use super::{Backend, endpoint, execute};
use crate::convert::ResponsesTranslator;
use crate::error::LlmError;
use crate::types::{ChatRequest, LlmResponse};

/// Default Codex base URL
pub const DEFAULT_BASE_URL: &str = "https://chatgpt.com/backend-api/codex";

/// Model used when neither the request nor the config names one
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Header carrying the ChatGPT account the OAuth token belongs to
const ACCOUNT_HEADER: &str = "chatgpt-account-id";

/// Codex Responses API backend
pub struct CodexBackend {
    client: Client,
    base_url: String,
    default_model: String,
    translator: ResponsesTranslator,
}

impl CodexBackend {
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
            translator: ResponsesTranslator::new(config.temperature_enabled()),
        }
    }
}

#[async_trait]
impl Backend for CodexBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Codex
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
        let mut builder = self
            .client
            .post(endpoint(&self.base_url, "responses"))
            .bearer_auth(credential.token.expose_secret());

        if let Some(account_id) = &credential.account_id {
            builder = builder.header(ACCOUNT_HEADER, account_id);
        }

        execute(BackendKind::Codex, &self.translator, builder, request, model).await
    }
}
