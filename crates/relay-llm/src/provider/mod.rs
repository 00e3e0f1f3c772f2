//! Backend transports and the provider adapter
//!
//! Each backend pairs a [`Translator`] with the endpoint URL and credential
//! headers its API expects. [`ProviderAdapter`] picks one at construction
//! and never switches.

pub mod adapter;
pub mod anthropic;
pub mod azure;
pub mod codex;

use async_trait::async_trait;
use relay_auth::ResolvedCredential;
use relay_config::BackendKind;

use crate::convert::Translator;
use crate::error::LlmError;
use crate::types::{ChatRequest, LlmResponse};

pub use adapter::ProviderAdapter;
pub use anthropic::AnthropicBackend;
pub use azure::AzureBackend;
pub use codex::CodexBackend;

/// One backend API reachable over HTTP
#[async_trait]
pub trait Backend: Send + Sync {
    /// Protocol family of this backend
    fn kind(&self) -> BackendKind;

    /// Model used when the request does not name one
    fn default_model(&self) -> &str;

    /// Send one request authenticated with `credential`
    async fn send(
        &self,
        request: &ChatRequest,
        model: &str,
        credential: &ResolvedCredential,
    ) -> Result<LlmResponse, LlmError>;
}

/// Join a base URL and a path without doubling the slash
pub(crate) fn endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    format!("{base}/{path}")
}

/// Serialize, send, check status, decode and normalize one exchange
pub(crate) async fn execute<T: Translator>(
    kind: BackendKind,
    translator: &T,
    builder: reqwest::RequestBuilder,
    request: &ChatRequest,
    model: &str,
) -> Result<LlmResponse, LlmError> {
    let wire_request = translator.build(request, model);

    let response = builder.json(&wire_request).send().await.map_err(|e| {
        tracing::error!(backend = %kind, error = %e, "upstream request failed");
        LlmError::backend(kind, None, e.to_string())
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(backend = %kind, status = %status, "upstream returned error");
        return Err(LlmError::backend(
            kind,
            Some(status.as_u16()),
            format!("backend returned {status}: {body}"),
        ));
    }

    let wire_response: T::Response = response.json().await.map_err(|e| {
        LlmError::backend(
            kind,
            Some(status.as_u16()),
            format!("failed to parse response: {e}"),
        )
    })?;

    let parsed = translator.parse(&wire_response);
    tracing::debug!(
        backend = %kind,
        model,
        finish_reason = %parsed.finish_reason,
        tool_calls = parsed.tool_calls.len(),
        "backend call completed"
    );
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_trims_trailing_slash() {
        assert_eq!(endpoint("https://api.anthropic.com/v1/", "messages"), "https://api.anthropic.com/v1/messages");
        assert_eq!(
            endpoint("https://chatgpt.com/backend-api/codex", "responses"),
            "https://chatgpt.com/backend-api/codex/responses"
        );
    }
}
