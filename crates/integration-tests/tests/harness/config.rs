//! Programmatic configuration builder for integration tests

use std::path::Path;

use relay_config::{AzureConfig, BackendKind, Config, LlmConfig};

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Backend pointed at a mock server, with no stored credentials
    pub fn new(backend: BackendKind, base_url: &str) -> Self {
        Self {
            config: Config {
                llm: LlmConfig {
                    backend,
                    base_url: Some(base_url.parse().expect("valid URL")),
                    ..LlmConfig::default()
                },
                ..Config::default()
            },
        }
    }

    /// Azure deployment served by the mock at `endpoint`
    pub fn azure(endpoint: &str, deployment: &str) -> Self {
        Self {
            config: Config {
                llm: LlmConfig {
                    backend: BackendKind::Azure,
                    azure: Some(AzureConfig {
                        endpoint: endpoint.parse().expect("valid URL"),
                        deployment: deployment.to_owned(),
                        api_version: "2024-10-21".to_owned(),
                        scope: "https://cognitiveservices.azure.com/.default".to_owned(),
                        managed_identity_client_id: None,
                        verbose: false,
                    }),
                    ..LlmConfig::default()
                },
                ..Config::default()
            },
        }
    }

    /// Persisted credential file location
    pub fn with_credentials_path(mut self, path: &Path) -> Self {
        self.config.auth.credentials_path = Some(path.to_owned());
        self
    }

    pub fn with_default_model(mut self, model: &str) -> Self {
        self.config.llm.default_model = Some(model.to_owned());
        self
    }

    pub fn with_temperature(mut self, supported: bool) -> Self {
        self.config.llm.supports_temperature = Some(supported);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
