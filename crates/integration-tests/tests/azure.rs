//! Azure OpenAI chat completions backend against mock endpoints

mod harness;

use std::sync::Arc;
use std::time::Duration;

use harness::config::ConfigBuilder;
use harness::mock_backend::MockBackend;
use harness::secrets::StaticSecrets;
use relay_auth::identity::{ManagedIdentityCredential, ManagedIdentityEndpoint};
use relay_auth::{CredentialResolver, OAuthRefresher};
use relay_llm::{ChatContext, ChatOptions, ChatRequest, FinishReason, LlmError, Message, ProviderAdapter};
use serde_json::json;
use tokio_util::sync::CancellationToken;

const SCOPE: &str = "https://cognitiveservices.azure.com/.default";

fn completion_body() -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": "Hello from Azure" },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 4, "completion_tokens": 3, "total_tokens": 7 }
    })
}

#[tokio::test]
async fn api_key_goes_in_header_and_version_in_query() {
    let mock = MockBackend::start(completion_body()).await.unwrap();
    let config = ConfigBuilder::azure(&mock.base_url(), "gpt-4o-prod").build();
    let adapter = harness::adapter(&config, StaticSecrets::new().with_var("AZURE_OPENAI_API_KEY", "azure-key"));
    assert_eq!(adapter.default_model(), "gpt-4o-prod");

    let request = ChatRequest::new(vec![Message::system("Be kind."), Message::user("hi")]).with_options(ChatOptions {
        max_tokens: Some(128),
        temperature: Some(0.3),
    });
    let response = adapter.chat(&ChatContext::new(), &request).await.unwrap();

    let sent = mock.only_request();
    assert_eq!(sent.path, "/openai/deployments/gpt-4o-prod/chat/completions");
    assert_eq!(sent.query.as_deref(), Some("api-version=2024-10-21"));
    assert_eq!(sent.header("api-version"), None);
    assert_eq!(sent.header("api-key"), Some("azure-key"));
    assert_eq!(sent.header("authorization"), None);

    let body = sent.json();
    assert_eq!(body["model"], "gpt-4o-prod");
    assert_eq!(body["max_completion_tokens"], 128);
    assert!(body.get("temperature").is_none());
    assert_eq!(
        body["messages"],
        json!([{ "role": "system", "content": "Be kind." }, { "role": "user", "content": "hi" }])
    );

    assert_eq!(response.content, "Hello from Azure");
    assert_eq!(response.finish_reason, FinishReason::Stop);
    assert_eq!(response.usage.map(|u| u.total_tokens), Some(7));
}

#[tokio::test]
async fn temperature_is_forwarded_when_enabled() {
    let mock = MockBackend::start(completion_body()).await.unwrap();
    let config = ConfigBuilder::azure(&mock.base_url(), "gpt-4o-prod")
        .with_temperature(true)
        .build();
    let adapter = harness::adapter(&config, StaticSecrets::new().with_var("AZURE_OPENAI_API_KEY", "azure-key"));

    let request = ChatRequest::new(vec![Message::user("hi")]).with_options(ChatOptions {
        max_tokens: None,
        temperature: Some(0.3),
    });
    adapter.chat(&ChatContext::new(), &request).await.unwrap();

    assert_eq!(mock.only_request().json()["temperature"], 0.3);
}

#[tokio::test]
async fn managed_identity_token_is_sent_as_bearer() {
    let imds = MockBackend::start(json!({
        "access_token": "mi-token",
        "expires_on": "1999999999",
        "token_type": "Bearer"
    }))
    .await
    .unwrap();
    let mock = MockBackend::start(completion_body()).await.unwrap();

    let http = reqwest::Client::new();
    let identity = ManagedIdentityCredential::new(
        http.clone(),
        ManagedIdentityEndpoint::Imds(format!("{}/metadata/identity/oauth2/token", imds.base_url())),
        None,
    );
    let resolver = CredentialResolver::new(
        "openai",
        Arc::new(StaticSecrets::new()),
        None,
        Arc::new(OAuthRefresher::new(http.clone())),
    )
    .with_secret_env("AZURE_OPENAI_API_KEY")
    .with_identity(Arc::new(identity), SCOPE);

    let config = ConfigBuilder::azure(&mock.base_url(), "gpt-4o-prod").build();
    let adapter = ProviderAdapter::with_resolver(&config, http, resolver).unwrap();

    adapter
        .chat(&ChatContext::new(), &ChatRequest::new(vec![Message::user("hi")]))
        .await
        .unwrap();

    let token_request = imds.only_request();
    assert_eq!(token_request.path, "/metadata/identity/oauth2/token");
    assert_eq!(token_request.header("metadata"), Some("true"));
    let query = token_request.query.unwrap_or_default();
    assert!(query.contains("resource=https%3A%2F%2Fcognitiveservices.azure.com"), "{query}");
    assert!(query.contains("api-version=2018-02-01"), "{query}");

    let sent = mock.only_request();
    assert_eq!(sent.header("authorization"), Some("Bearer mi-token"));
    assert_eq!(sent.header("api-key"), None);
}

#[tokio::test]
async fn empty_choices_normalize_to_error() {
    let mock = MockBackend::start(json!({ "id": "chatcmpl-2", "choices": [] })).await.unwrap();
    let config = ConfigBuilder::azure(&mock.base_url(), "gpt-4o-prod").build();
    let adapter = harness::adapter(&config, StaticSecrets::new().with_var("AZURE_OPENAI_API_KEY", "azure-key"));

    let response = adapter
        .chat(&ChatContext::new(), &ChatRequest::new(vec![Message::user("hi")]))
        .await
        .unwrap();

    assert_eq!(response.content, "");
    assert!(response.tool_calls.is_empty());
    assert_eq!(response.finish_reason, FinishReason::Error);
    assert_eq!(response.usage, None);
}

#[tokio::test]
async fn server_error_is_prefixed() {
    let mock = MockBackend::start_with_status(
        axum::http::StatusCode::TOO_MANY_REQUESTS,
        json!({ "error": { "code": "429", "message": "Rate limit reached" } }),
    )
    .await
    .unwrap();
    let config = ConfigBuilder::azure(&mock.base_url(), "gpt-4o-prod").build();
    let adapter = harness::adapter(&config, StaticSecrets::new().with_var("AZURE_OPENAI_API_KEY", "azure-key"));

    let err = adapter
        .chat(&ChatContext::new(), &ChatRequest::new(vec![Message::user("hi")]))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(429));
    assert!(err.to_string().starts_with("Azure OpenAI API call: "), "{err}");
}

#[tokio::test]
async fn cancellation_aborts_in_flight_request() {
    let mock = MockBackend::start_delayed(completion_body(), Duration::from_secs(10)).await.unwrap();
    let config = ConfigBuilder::azure(&mock.base_url(), "gpt-4o-prod").build();
    let adapter = harness::adapter(&config, StaticSecrets::new().with_var("AZURE_OPENAI_API_KEY", "azure-key"));

    let token = CancellationToken::new();
    let ctx = ChatContext::new().with_cancellation(token.clone());
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();
    });

    let started = std::time::Instant::now();
    let err = adapter
        .chat(&ctx, &ChatRequest::new(vec![Message::user("hi")]))
        .await
        .unwrap_err();

    assert!(matches!(err, LlmError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn deadline_aborts_in_flight_request() {
    let mock = MockBackend::start_delayed(completion_body(), Duration::from_secs(10)).await.unwrap();
    let config = ConfigBuilder::azure(&mock.base_url(), "gpt-4o-prod").build();
    let adapter = harness::adapter(&config, StaticSecrets::new().with_var("AZURE_OPENAI_API_KEY", "azure-key"));

    let ctx = ChatContext::new().with_timeout(Duration::from_millis(100));
    let err = adapter
        .chat(&ctx, &ChatRequest::new(vec![Message::user("hi")]))
        .await
        .unwrap_err();

    assert!(matches!(err, LlmError::DeadlineExceeded));
}
