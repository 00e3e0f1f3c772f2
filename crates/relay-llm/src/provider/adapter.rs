use relay_auth::CredentialResolver;
use relay_config::{BackendKind, Config, ConfigError};
use reqwest::Client;

use super::{AnthropicBackend, AzureBackend, Backend, CodexBackend};
use crate::context::ChatContext;
use crate::error::LlmError;
use crate::types::{ChatRequest, LlmResponse};

/// Provider-agnostic entry point for one configured backend
///
/// The backend is fixed at construction. Every [`chat`](Self::chat) call
/// resolves a fresh credential, translates the request, sends it and
/// normalizes the reply.
pub struct ProviderAdapter {
    backend: Box<dyn Backend>,
    resolver: CredentialResolver,
}

impl ProviderAdapter {
    /// Build from configuration, reading secrets from the process environment
    pub fn from_config(config: &Config) -> Result<Self, LlmError> {
        let http = Client::new();
        let resolver = CredentialResolver::from_config(config, &http);
        Self::with_resolver(config, http, resolver)
    }

    /// Build with an explicit HTTP client and credential resolver
    pub fn with_resolver(config: &Config, http: Client, resolver: CredentialResolver) -> Result<Self, LlmError> {
        config.validate()?;
        let llm = &config.llm;

        let backend: Box<dyn Backend> = match llm.backend {
            BackendKind::Anthropic => Box::new(AnthropicBackend::new(http, llm)),
            BackendKind::Codex => Box::new(CodexBackend::new(http, llm)),
            BackendKind::Azure => {
                let azure = llm.azure.as_ref().ok_or_else(|| ConfigError::Incomplete {
                    section: "Azure OpenAI",
                    missing: vec!["llm.azure".to_owned()],
                })?;
                Box::new(AzureBackend::new(http, llm, azure))
            }
        };

        tracing::info!(
            backend = %llm.backend,
            default_model = backend.default_model(),
            credential = resolver.provider(),
            "provider adapter ready"
        );

        Ok(Self { backend, resolver })
    }

    /// Backend this adapter talks to
    pub fn kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Model used when a request leaves `model` empty
    pub fn default_model(&self) -> &str {
        self.backend.default_model()
    }

    /// Send one conversation turn and return the normalized reply
    ///
    /// Credential resolution and the HTTP call both run under `ctx`, so
    /// cancellation or an elapsed deadline aborts whichever is in progress.
    pub async fn chat(&self, ctx: &ChatContext, request: &ChatRequest) -> Result<LlmResponse, LlmError> {
        ctx.run(async {
            let credential = self.resolver.resolve().await?;

            let model = if request.model.is_empty() {
                self.backend.default_model()
            } else {
                request.model.as_str()
            };

            tracing::debug!(
                backend = %self.kind(),
                model,
                source = %credential.source,
                messages = request.messages.len(),
                tools = request.tools.len(),
                "sending chat request"
            );

            self.backend.send(request, model, &credential).await
        })
        .await
    }
}
