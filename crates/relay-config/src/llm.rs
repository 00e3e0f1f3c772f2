use serde::Deserialize;
use url::Url;

use crate::ConfigError;

/// Backend protocol family, fixed for the lifetime of an adapter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Anthropic Messages API authenticated with an API key or OAuth token
    #[default]
    Anthropic,
    /// ChatGPT Codex Responses API authenticated with an OAuth token
    Codex,
    /// Azure OpenAI chat completions authenticated with an identity token
    Azure,
}

impl BackendKind {
    /// Parse the value of `RELAY_BACKEND`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for unknown backend names
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "codex" | "openai" => Ok(Self::Codex),
            "azure" => Ok(Self::Azure),
            other => Err(ConfigError::invalid(
                "RELAY_BACKEND",
                format!("unknown backend `{other}` (expected anthropic, codex or azure)"),
            )),
        }
    }

    /// Key under which this backend's credential is persisted
    pub const fn credential_key(self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::Codex | Self::Azure => "openai",
        }
    }

    /// Human-facing API name used to prefix backend call errors
    pub const fn api_name(self) -> &'static str {
        match self {
            Self::Anthropic => "claude",
            Self::Codex => "codex",
            Self::Azure => "Azure OpenAI",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Anthropic => "anthropic",
            Self::Codex => "codex",
            Self::Azure => "azure",
        })
    }
}

/// LLM backend configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    /// Backend protocol to talk to
    #[serde(default)]
    pub backend: BackendKind,
    /// Model used when the caller does not name one
    #[serde(default)]
    pub default_model: Option<String>,
    /// Base URL override (mock servers, proxies)
    #[serde(default)]
    pub base_url: Option<Url>,
    /// Whether a caller-supplied temperature may be forwarded
    ///
    /// Unset means the backend default: allowed for Anthropic and Codex,
    /// suppressed for Azure deployments that only accept the default value.
    #[serde(default)]
    pub supports_temperature: Option<bool>,
    /// Azure OpenAI bundle, required when `backend = "azure"`
    #[serde(default)]
    pub azure: Option<AzureConfig>,
}

impl LlmConfig {
    /// Effective temperature capability for the configured backend
    pub fn temperature_enabled(&self) -> bool {
        self.supports_temperature
            .unwrap_or(!matches!(self.backend, BackendKind::Azure))
    }
}

/// Azure OpenAI deployment with identity-based authentication
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "AzureSettings")]
pub struct AzureConfig {
    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`
    pub endpoint: Url,
    /// Deployment name, also used as the default model
    pub deployment: String,
    /// Value of the mandatory `api-version` query parameter
    pub api_version: String,
    /// Token scope requested from the identity provider
    pub scope: String,
    /// Client ID of a user-assigned managed identity
    pub managed_identity_client_id: Option<String>,
    /// Trace every credential source attempt
    pub verbose: bool,
}

/// Where a partially-populated Azure bundle came from, used to name missing settings
#[derive(Debug, Clone, Copy)]
pub(crate) enum SettingNames {
    /// `AZURE_OPENAI_*` environment variables
    Environment,
    /// `[llm.azure]` table of a config file
    File,
}

const REQUIRED_AZURE: [(&str, &str); 4] = [
    ("endpoint", "AZURE_OPENAI_ENDPOINT"),
    ("deployment", "AZURE_OPENAI_DEPLOYMENT"),
    ("api_version", "AZURE_OPENAI_API_VERSION"),
    ("scope", "AZURE_OPENAI_SCOPE"),
];

/// Raw Azure settings before all-or-nothing validation
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AzureSettings {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub deployment: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub managed_identity_client_id: Option<String>,
    #[serde(default)]
    pub verbose: bool,
}

impl AzureSettings {
    /// Whether any required setting is present at all
    pub fn is_present(&self) -> bool {
        self.required().iter().any(Option::is_some)
    }

    fn required(&self) -> [Option<&str>; 4] {
        [
            non_empty(self.endpoint.as_deref()),
            non_empty(self.deployment.as_deref()),
            non_empty(self.api_version.as_deref()),
            non_empty(self.scope.as_deref()),
        ]
    }

    pub(crate) fn into_config(self, names: SettingNames) -> Result<AzureConfig, ConfigError> {
        let missing: Vec<String> = self
            .required()
            .iter()
            .zip(REQUIRED_AZURE)
            .filter(|(value, _)| value.is_none())
            .map(|(_, (file_key, env_key))| match names {
                SettingNames::Environment => env_key.to_owned(),
                SettingNames::File => format!("llm.azure.{file_key}"),
            })
            .collect();

        let owned = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        let (Some(endpoint), Some(deployment), Some(api_version), Some(scope)) = (
            owned(self.endpoint),
            owned(self.deployment),
            owned(self.api_version),
            owned(self.scope),
        ) else {
            return Err(ConfigError::Incomplete {
                section: "Azure OpenAI",
                missing,
            });
        };

        let endpoint_key = match names {
            SettingNames::Environment => "AZURE_OPENAI_ENDPOINT",
            SettingNames::File => "llm.azure.endpoint",
        };
        let endpoint = Url::parse(endpoint.trim()).map_err(|e| ConfigError::invalid(endpoint_key, e.to_string()))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ConfigError::invalid(endpoint_key, "endpoint must be an http(s) URL"));
        }

        Ok(AzureConfig {
            endpoint,
            deployment: deployment.trim().to_owned(),
            api_version: api_version.trim().to_owned(),
            scope: scope.trim().to_owned(),
            managed_identity_client_id: self.managed_identity_client_id.filter(|id| !id.trim().is_empty()),
            verbose: self.verbose,
        })
    }
}

impl TryFrom<AzureSettings> for AzureConfig {
    type Error = ConfigError;

    fn try_from(settings: AzureSettings) -> Result<Self, Self::Error> {
        settings.into_config(SettingNames::File)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(endpoint: &str, deployment: &str, api_version: &str, scope: &str) -> AzureSettings {
        let opt = |v: &str| (!v.is_empty()).then(|| v.to_owned());
        AzureSettings {
            endpoint: opt(endpoint),
            deployment: opt(deployment),
            api_version: opt(api_version),
            scope: opt(scope),
            ..AzureSettings::default()
        }
    }

    #[test]
    fn partial_bundle_names_every_missing_variable() {
        let err = settings("https://res.openai.azure.com", "gpt-4o", "", "")
            .into_config(SettingNames::Environment)
            .unwrap_err();

        let ConfigError::Incomplete { missing, .. } = &err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(missing, &["AZURE_OPENAI_API_VERSION", "AZURE_OPENAI_SCOPE"]);
        assert!(err.to_string().contains("AZURE_OPENAI_API_VERSION, AZURE_OPENAI_SCOPE"));
    }

    #[test]
    fn file_bundle_uses_table_keys() {
        let err = settings("", "gpt-4o", "2024-02-15-preview", "")
            .into_config(SettingNames::File)
            .unwrap_err();
        assert!(err.to_string().contains("llm.azure.endpoint, llm.azure.scope"));
    }

    #[test]
    fn blank_values_count_as_missing() {
        let bundle = settings("   ", "", "", "");
        assert!(!bundle.is_present());
    }

    #[test]
    fn rejects_non_http_endpoint() {
        let err = settings("ftp://res", "d", "v", "s")
            .into_config(SettingNames::Environment)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "AZURE_OPENAI_ENDPOINT"));
    }

    #[test]
    fn temperature_defaults_follow_backend() {
        let mut config = LlmConfig::default();
        assert!(config.temperature_enabled());

        config.backend = BackendKind::Azure;
        assert!(!config.temperature_enabled());

        config.supports_temperature = Some(true);
        assert!(config.temperature_enabled());
    }

    #[test]
    fn parses_backend_names() {
        assert_eq!(BackendKind::parse("Codex").unwrap(), BackendKind::Codex);
        assert_eq!(BackendKind::parse("claude").unwrap(), BackendKind::Anthropic);
        assert!(BackendKind::parse("bedrock").is_err());
    }
}
