//! Identity-token providers for the Azure OpenAI backend
//!
//! [`IdentityChain::azure`] builds the fixed priority order: a user-assigned
//! managed identity when a client id is configured, then the default chain of
//! environment service principal, system-assigned managed identity and the
//! Azure CLI login.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tokio::process::Command;

use crate::AuthError;
use crate::secrets::SecretSource;

/// Instance metadata service token endpoint
pub const IMDS_TOKEN_URL: &str = "http://169.254.169.254/metadata/identity/oauth2/token";

const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";
const IDENTITY_TIMEOUT: Duration = Duration::from_secs(5);

/// Short-lived bearer token minted for a scope
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: SecretString,
    pub expires_at: Option<Timestamp>,
}

/// Something that can mint a bearer token for a permission scope
#[async_trait]
pub trait IdentityTokenProvider: Send + Sync {
    /// Human-readable provider name for traces and errors
    fn name(&self) -> &str;

    /// Obtain a token for `scope` (e.g. `https://cognitiveservices.azure.com/.default`)
    async fn token(&self, scope: &str) -> Result<AccessToken, AuthError>;
}

/// Where managed identity tokens are served from on this host
#[derive(Debug, Clone)]
pub enum ManagedIdentityEndpoint {
    /// Virtual machine instance metadata service
    Imds(String),
    /// App Service / Functions / Container Apps identity endpoint
    AppService {
        endpoint: String,
        header: SecretString,
    },
}

impl ManagedIdentityEndpoint {
    /// App Service endpoint when `IDENTITY_ENDPOINT` and `IDENTITY_HEADER` are set, IMDS otherwise
    pub fn detect(secrets: &dyn SecretSource) -> Self {
        let var = |name: &str| secrets.env_var(name).filter(|v| !v.is_empty());

        match (var("IDENTITY_ENDPOINT"), var("IDENTITY_HEADER")) {
            (Some(endpoint), Some(header)) => Self::AppService {
                endpoint,
                header: SecretString::from(header),
            },
            _ => Self::Imds(IMDS_TOKEN_URL.to_owned()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ManagedIdentityResponse {
    access_token: String,
    #[serde(default)]
    expires_on: Option<Value>,
}

/// Managed identity, user-assigned when a client id is given
pub struct ManagedIdentityCredential {
    http: reqwest::Client,
    endpoint: ManagedIdentityEndpoint,
    client_id: Option<String>,
    name: String,
}

impl ManagedIdentityCredential {
    pub fn new(http: reqwest::Client, endpoint: ManagedIdentityEndpoint, client_id: Option<String>) -> Self {
        let name = match &client_id {
            Some(id) => format!("user-assigned managed identity {id}"),
            None => "system-assigned managed identity".to_owned(),
        };

        Self {
            http,
            endpoint,
            client_id,
            name,
        }
    }
}

#[async_trait]
impl IdentityTokenProvider for ManagedIdentityCredential {
    fn name(&self) -> &str {
        &self.name
    }

    async fn token(&self, scope: &str) -> Result<AccessToken, AuthError> {
        let resource = scope.strip_suffix("/.default").unwrap_or(scope);
        let mut query = vec![("resource", resource)];
        if let Some(client_id) = &self.client_id {
            query.push(("client_id", client_id.as_str()));
        }

        let request = match &self.endpoint {
            ManagedIdentityEndpoint::Imds(url) => {
                query.push(("api-version", "2018-02-01"));
                self.http.get(url).header("Metadata", "true")
            }
            ManagedIdentityEndpoint::AppService { endpoint, header } => {
                query.push(("api-version", "2019-08-01"));
                self.http.get(endpoint).header("X-IDENTITY-HEADER", header.expose_secret())
            }
        };

        let response = request
            .query(&query)
            .timeout(IDENTITY_TIMEOUT)
            .send()
            .await
            .map_err(|e| AuthError::identity(&self.name, scope, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::identity(
                &self.name,
                scope,
                format!("identity endpoint returned {status}: {body}"),
            ));
        }

        let token: ManagedIdentityResponse = response
            .json()
            .await
            .map_err(|e| AuthError::identity(&self.name, scope, format!("failed to parse token response: {e}")))?;

        Ok(AccessToken {
            token: SecretString::from(token.access_token),
            expires_at: token.expires_on.as_ref().and_then(epoch_seconds),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ClientCredentialsResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Service principal from `AZURE_TENANT_ID`, `AZURE_CLIENT_ID` and `AZURE_CLIENT_SECRET`
pub struct ClientSecretCredential {
    http: reqwest::Client,
    authority: String,
    tenant_id: String,
    client_id: String,
    client_secret: SecretString,
}

impl ClientSecretCredential {
    /// Service principal from the environment, `None` unless all three variables are set
    pub fn from_env(http: reqwest::Client, secrets: &dyn SecretSource) -> Option<Self> {
        let var = |name: &str| secrets.env_var(name).filter(|v| !v.is_empty());

        Some(Self {
            tenant_id: var("AZURE_TENANT_ID")?,
            client_id: var("AZURE_CLIENT_ID")?,
            client_secret: SecretString::from(var("AZURE_CLIENT_SECRET")?),
            authority: var("AZURE_AUTHORITY_HOST")
                .unwrap_or_else(|| DEFAULT_AUTHORITY.to_owned())
                .trim_end_matches('/')
                .to_owned(),
            http,
        })
    }
}

#[async_trait]
impl IdentityTokenProvider for ClientSecretCredential {
    fn name(&self) -> &str {
        "environment service principal"
    }

    async fn token(&self, scope: &str) -> Result<AccessToken, AuthError> {
        let url = format!("{}/{}/oauth2/v2.0/token", self.authority, self.tenant_id);
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
            ("scope", scope),
        ];

        let response = self
            .http
            .post(url)
            .form(&form)
            .timeout(IDENTITY_TIMEOUT)
            .send()
            .await
            .map_err(|e| AuthError::identity(self.name(), scope, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::identity(
                self.name(),
                scope,
                format!("token endpoint returned {status}: {body}"),
            ));
        }

        let token: ClientCredentialsResponse = response
            .json()
            .await
            .map_err(|e| AuthError::identity(self.name(), scope, format!("failed to parse token response: {e}")))?;

        Ok(AccessToken {
            token: SecretString::from(token.access_token),
            expires_at: token
                .expires_in
                .and_then(|secs| Timestamp::now().checked_add(SignedDuration::from_secs(secs)).ok()),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliToken {
    access_token: String,
    #[serde(default, rename = "expires_on")]
    expires_on: Option<Value>,
}

/// Developer login through `az account get-access-token`
#[derive(Debug, Clone, Copy, Default)]
pub struct AzureCliCredential;

#[async_trait]
impl IdentityTokenProvider for AzureCliCredential {
    fn name(&self) -> &str {
        "azure cli"
    }

    async fn token(&self, scope: &str) -> Result<AccessToken, AuthError> {
        let output = Command::new("az")
            .args(["account", "get-access-token", "--scope", scope, "--output", "json"])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| AuthError::identity(self.name(), scope, format!("failed to run az: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AuthError::identity(self.name(), scope, stderr.trim().to_owned()));
        }

        let token: CliToken = serde_json::from_slice(&output.stdout)
            .map_err(|e| AuthError::identity(self.name(), scope, format!("unexpected az output: {e}")))?;

        Ok(AccessToken {
            token: SecretString::from(token.access_token),
            expires_at: token.expires_on.as_ref().and_then(epoch_seconds),
        })
    }
}

/// Ordered identity providers; the first token wins
pub struct IdentityChain {
    providers: Vec<Box<dyn IdentityTokenProvider>>,
}

impl IdentityChain {
    pub fn new(providers: Vec<Box<dyn IdentityTokenProvider>>) -> Self {
        Self { providers }
    }

    /// Azure priority order for an optional user-assigned identity
    pub fn azure(http: &reqwest::Client, secrets: &dyn SecretSource, client_id: Option<&str>) -> Self {
        let endpoint = ManagedIdentityEndpoint::detect(secrets);
        let mut providers: Vec<Box<dyn IdentityTokenProvider>> = Vec::new();

        if let Some(client_id) = client_id {
            providers.push(Box::new(ManagedIdentityCredential::new(
                http.clone(),
                endpoint.clone(),
                Some(client_id.to_owned()),
            )));
        }

        if let Some(principal) = ClientSecretCredential::from_env(http.clone(), secrets) {
            providers.push(Box::new(principal));
        }
        providers.push(Box::new(ManagedIdentityCredential::new(http.clone(), endpoint, None)));
        providers.push(Box::new(AzureCliCredential));

        Self { providers }
    }

    /// Provider names in the order they are tried
    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }
}

#[async_trait]
impl IdentityTokenProvider for IdentityChain {
    fn name(&self) -> &str {
        "identity chain"
    }

    async fn token(&self, scope: &str) -> Result<AccessToken, AuthError> {
        let mut failures = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            match provider.token(scope).await {
                Ok(token) => return Ok(token),
                Err(e) => failures.push(e.to_string()),
            }
        }

        Err(AuthError::identity(
            self.name(),
            scope,
            if failures.is_empty() {
                "no identity providers configured".to_owned()
            } else {
                failures.join("; ")
            },
        ))
    }
}

/// Epoch seconds sent either as a JSON number or a numeric string
fn epoch_seconds(value: &Value) -> Option<Timestamp> {
    let seconds = match value {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    Timestamp::from_second(seconds).ok()
}
