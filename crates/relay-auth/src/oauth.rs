use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jiff::{SignedDuration, Timestamp};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::{AuthError, AuthMethod, Credential};

/// Lifetime assumed when the token endpoint omits `expires_in`
const DEFAULT_EXPIRES_IN: i64 = 3600;

/// Exchanges a refresh token for a fresh access token
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Refresh `current`, returning the credential to persist
    async fn refresh(&self, provider: &str, current: &Credential) -> Result<Credential, AuthError>;
}

/// How the token endpoint expects its parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRequestEncoding {
    /// `application/x-www-form-urlencoded`
    Form,
    /// `application/json`
    Json,
}

/// Public OAuth client registration for one provider
#[derive(Debug, Clone)]
pub struct OAuthClient {
    pub token_url: String,
    pub client_id: String,
    pub scope: Option<String>,
    pub encoding: TokenRequestEncoding,
}

impl OAuthClient {
    /// ChatGPT sign-in used by the Codex backend
    pub fn openai() -> Self {
        Self {
            token_url: "https://auth.openai.com/oauth/token".to_owned(),
            client_id: "app_EMoamEEZ73f0CkXaXp7hrann".to_owned(),
            scope: Some("openid profile email offline_access".to_owned()),
            encoding: TokenRequestEncoding::Form,
        }
    }

    /// Claude console sign-in
    pub fn anthropic() -> Self {
        Self {
            token_url: "https://console.anthropic.com/v1/oauth/token".to_owned(),
            client_id: "9d1c250a-e61b-44d9-88ed-5944d1962f5e".to_owned(),
            scope: None,
            encoding: TokenRequestEncoding::Json,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    id_token: Option<String>,
}

/// HTTP refresher with one registered client per provider
#[derive(Clone)]
pub struct OAuthRefresher {
    http: reqwest::Client,
    clients: HashMap<String, OAuthClient>,
}

impl OAuthRefresher {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            clients: HashMap::new(),
        }
    }

    /// Refresher knowing the `openai` and `anthropic` clients
    pub fn with_default_clients(http: reqwest::Client) -> Self {
        Self::new(http)
            .with_client("openai", OAuthClient::openai())
            .with_client("anthropic", OAuthClient::anthropic())
    }

    #[must_use]
    pub fn with_client(mut self, provider: impl Into<String>, client: OAuthClient) -> Self {
        self.clients.insert(provider.into(), client);
        self
    }
}

#[async_trait]
impl TokenRefresher for OAuthRefresher {
    async fn refresh(&self, provider: &str, current: &Credential) -> Result<Credential, AuthError> {
        let failed = |message: String| AuthError::RefreshFailed {
            provider: provider.to_owned(),
            message,
        };

        let client = self
            .clients
            .get(provider)
            .ok_or_else(|| failed("no OAuth client registered".to_owned()))?;

        let refresh_token = current
            .refresh_token
            .as_ref()
            .ok_or_else(|| failed("credential has no refresh token".to_owned()))?;

        let mut params = vec![
            ("grant_type", "refresh_token"),
            ("client_id", client.client_id.as_str()),
            ("refresh_token", refresh_token.expose_secret()),
        ];
        if let Some(scope) = &client.scope {
            params.push(("scope", scope.as_str()));
        }

        let request = self.http.post(&client.token_url).timeout(Duration::from_secs(30));
        let request = match client.encoding {
            TokenRequestEncoding::Form => request.form(&params),
            TokenRequestEncoding::Json => request.json(&params.into_iter().collect::<HashMap<_, _>>()),
        };

        let response = request.send().await.map_err(|e| failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(failed(format!("token endpoint returned {status}: {body}")));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| failed(format!("failed to parse token response: {e}")))?;

        Ok(refreshed_credential(current, token, Timestamp::now()))
    }
}

fn refreshed_credential(current: &Credential, token: TokenResponse, now: Timestamp) -> Credential {
    let lifetime = SignedDuration::from_secs(token.expires_in.unwrap_or(DEFAULT_EXPIRES_IN));

    let account_id = token
        .id_token
        .as_deref()
        .and_then(account_id_from_id_token)
        .or_else(|| current.account_id.clone());

    Credential {
        access_token: SecretString::from(token.access_token),
        // Providers that do not rotate refresh tokens omit them
        refresh_token: token
            .refresh_token
            .filter(|t| !t.is_empty())
            .map(SecretString::from)
            .or_else(|| current.refresh_token.clone()),
        account_id,
        auth_method: AuthMethod::OAuth,
        expires_at: now.checked_add(lifetime).ok(),
    }
}

/// Read the ChatGPT account claim from an unverified ID token payload
fn account_id_from_id_token(id_token: &str) -> Option<String> {
    let payload = id_token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;

    claims
        .get("chatgpt_account_id")
        .or_else(|| claims.pointer("/https:~1~1api.openai.com~1auth/chatgpt_account_id"))
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned)
}
