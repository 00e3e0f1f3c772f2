use serde_json::Value;

use crate::CredentialSource;
use crate::secrets::SecretSource;
use crate::trace::{SourceTrace, preview};

/// Keychain services holding an Anthropic API key, highest priority first
pub const ANTHROPIC_SERVICES: [&str; 3] = ["Anthropic", "Agency", "Claude Code"];

/// Keychain service holding Claude Code's JSON credential blob
pub const ANTHROPIC_STRUCTURED_SERVICE: &str = "Claude Code-credentials";

/// Every Anthropic API key starts with this
pub const ANTHROPIC_KEY_PREFIX: &str = "sk-ant-";

/// Which keychain items to probe and what a usable value looks like
#[derive(Debug, Clone, Default)]
pub struct KeychainLookup {
    /// Plain secret services, highest priority first
    pub services: Vec<String>,
    /// Account to match, any account when `None`
    pub account: Option<String>,
    /// Required token prefix; values without it are skipped
    pub prefix: Option<String>,
    /// Service whose value is JSON with an embedded `apiKey`
    pub structured_service: Option<String>,
}

impl KeychainLookup {
    /// Anthropic defaults, optionally overriding the service list
    pub fn anthropic(services: Option<Vec<String>>, account: Option<String>) -> Self {
        Self {
            services: services.unwrap_or_else(|| ANTHROPIC_SERVICES.map(str::to_owned).to_vec()),
            account,
            prefix: Some(ANTHROPIC_KEY_PREFIX.to_owned()),
            structured_service: Some(ANTHROPIC_STRUCTURED_SERVICE.to_owned()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty() && self.structured_service.is_none()
    }

    pub(crate) async fn find(&self, secrets: &dyn SecretSource, trace: SourceTrace<'_>) -> Option<String> {
        let account = self.account.as_deref();

        for service in &self.services {
            match secrets.keychain_password(service, account).await {
                Ok(Some(value)) if self.accepts(&value) => {
                    trace.attempt(CredentialSource::Keychain, format_args!("found key in service '{service}'"));
                    return Some(value);
                }
                Ok(Some(value)) => trace.attempt(
                    CredentialSource::Keychain,
                    format_args!(
                        "service '{service}' holds a value that is not a valid key (starts with: {}), skipping",
                        preview(&value)
                    ),
                ),
                Ok(None) => trace.attempt(CredentialSource::Keychain, format_args!("service '{service}' not found")),
                Err(e) => trace.attempt(CredentialSource::Keychain, format_args!("{e}")),
            }
        }

        let service = self.structured_service.as_deref()?;
        match secrets.keychain_password(service, account).await {
            Ok(Some(raw)) => {
                let key = extract_api_key(&raw).filter(|key| self.accepts(key));
                if key.is_some() {
                    trace.attempt(CredentialSource::Keychain, format_args!("found key in service '{service}'"));
                } else {
                    trace.attempt(CredentialSource::Keychain, format_args!("service '{service}' holds no api key"));
                }
                key
            }
            Ok(None) => {
                trace.attempt(CredentialSource::Keychain, format_args!("service '{service}' not found"));
                None
            }
            Err(e) => {
                trace.attempt(CredentialSource::Keychain, format_args!("{e}"));
                None
            }
        }
    }

    fn accepts(&self, value: &str) -> bool {
        self.prefix.as_deref().is_none_or(|prefix| value.starts_with(prefix))
    }
}

/// Pull an API key out of the JSON blob, from `apiKey` or `anthropic.apiKey`
fn extract_api_key(raw: &str) -> Option<String> {
    let data: Value = serde_json::from_str(raw).ok()?;

    data.get("apiKey")
        .or_else(|| data.pointer("/anthropic/apiKey"))
        .and_then(Value::as_str)
        .filter(|key| !key.is_empty())
        .map(str::to_owned)
}
