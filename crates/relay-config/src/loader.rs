use std::path::{Path, PathBuf};

use url::Url;

use crate::llm::SettingNames;
use crate::{AuthConfig, AzureSettings, BackendKind, Config, ConfigError, KeychainConfig, LlmConfig, LogFormat, LoggingConfig};

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders against the process
    /// environment, then deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, expansion fails, the TOML
    /// does not match the schema, or validation fails
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Self::parse(&raw, |name| std::env::var(name).ok())
    }

    /// Parse TOML text, resolving placeholders through `lookup`
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`] minus the file access
    pub fn parse<F>(raw: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let expanded = crate::env::expand_placeholders(raw, lookup)?;
        let config: Self = toml::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from process environment variables
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Incomplete` when the Azure bundle is partially
    /// set, or `ConfigError::Invalid` for malformed values
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Same as [`Config::from_env`]
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());
        let flag = |name: &str| get(name).is_some_and(|v| is_truthy(&v));

        let azure_settings = AzureSettings {
            endpoint: get("AZURE_OPENAI_ENDPOINT"),
            deployment: get("AZURE_OPENAI_DEPLOYMENT"),
            api_version: get("AZURE_OPENAI_API_VERSION"),
            scope: get("AZURE_OPENAI_SCOPE"),
            managed_identity_client_id: get("AZURE_OPENAI_MANAGED_IDENTITY_CLIENT_ID"),
            verbose: flag("AZURE_OPENAI_VERBOSE"),
        };

        let backend = match get("RELAY_BACKEND") {
            Some(name) => BackendKind::parse(&name)?,
            None if azure_settings.is_present() => BackendKind::Azure,
            None => BackendKind::default(),
        };

        let azure = if azure_settings.is_present() || backend == BackendKind::Azure {
            Some(azure_settings.into_config(SettingNames::Environment)?)
        } else {
            None
        };

        let base_url = get("RELAY_BASE_URL")
            .map(|raw| Url::parse(&raw).map_err(|e| ConfigError::invalid("RELAY_BASE_URL", e.to_string())))
            .transpose()?;

        let format = match get("RELAY_LOG_FORMAT").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::invalid(
                    "RELAY_LOG_FORMAT",
                    format!("expected `text` or `json`, got `{other}`"),
                ));
            }
        };

        let config = Self {
            llm: LlmConfig {
                backend,
                default_model: get("RELAY_MODEL"),
                base_url,
                supports_temperature: get("AZURE_OPENAI_TEMPERATURE").map(|v| is_truthy(&v)),
                azure,
            },
            auth: AuthConfig {
                verbose: flag("RELAY_VERBOSE"),
                secret_env: None,
                credentials_path: get("RELAY_CREDENTIALS_PATH").map(PathBuf::from),
                keychain: KeychainConfig {
                    services: None,
                    account: get("RELAY_KEYCHAIN_ACCOUNT"),
                },
            },
            logging: LoggingConfig {
                filter: get("RELAY_LOG").unwrap_or_else(|| LoggingConfig::default().filter),
                format,
            },
        };

        tracing::debug!(
            backend = %config.llm.backend,
            azure = config.llm.azure.is_some(),
            "configuration read from environment"
        );

        config.validate()?;
        Ok(config)
    }

    /// Whether credential resolution should trace its attempts
    pub fn verbose(&self) -> bool {
        self.auth.verbose || self.llm.azure.as_ref().is_some_and(|a| a.verbose)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if the selected backend lacks its required settings
    /// or a setting holds an unusable value
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.backend == BackendKind::Azure && self.llm.azure.is_none() {
            return Err(AzureSettings::default()
                .into_config(SettingNames::File)
                .err()
                .unwrap_or_else(|| ConfigError::invalid("llm.azure", "required for the azure backend")));
        }

        if self.llm.default_model.as_deref().is_some_and(|m| m.trim().is_empty()) {
            return Err(ConfigError::invalid("llm.default_model", "must not be empty"));
        }

        if let Some(services) = &self.auth.keychain.services
            && services.iter().any(|s| s.trim().is_empty())
        {
            return Err(ConfigError::invalid("auth.keychain.services", "service names must not be empty"));
        }

        if self.auth.secret_env.as_deref().is_some_and(|v| v.trim().is_empty()) {
            return Err(ConfigError::invalid("auth.secret_env", "must not be empty"));
        }

        Ok(())
    }
}

fn is_truthy(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn empty_environment_selects_anthropic() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.llm.backend, BackendKind::Anthropic);
        assert!(config.llm.azure.is_none());
        assert!(!config.verbose());
    }

    #[test]
    fn complete_azure_bundle_selects_azure() {
        let config = Config::from_lookup(lookup(&[
            ("AZURE_OPENAI_ENDPOINT", "https://res.openai.azure.com/"),
            ("AZURE_OPENAI_DEPLOYMENT", "gpt-52-chat"),
            ("AZURE_OPENAI_API_VERSION", "2024-02-15-preview"),
            ("AZURE_OPENAI_SCOPE", "https://cognitiveservices.azure.com/.default"),
            ("AZURE_OPENAI_MANAGED_IDENTITY_CLIENT_ID", "12345678-1234-1234-1234-123456789abc"),
            ("AZURE_OPENAI_VERBOSE", "true"),
        ]))
        .unwrap();

        assert_eq!(config.llm.backend, BackendKind::Azure);
        let azure = config.llm.azure.as_ref().unwrap();
        assert_eq!(azure.deployment, "gpt-52-chat");
        assert_eq!(
            azure.managed_identity_client_id.as_deref(),
            Some("12345678-1234-1234-1234-123456789abc")
        );
        assert!(config.verbose());
        assert!(!config.llm.temperature_enabled());
    }

    #[test]
    fn partial_azure_bundle_fails_naming_missing_fields() {
        let err = Config::from_lookup(lookup(&[
            ("AZURE_OPENAI_ENDPOINT", "https://res.openai.azure.com"),
            ("AZURE_OPENAI_DEPLOYMENT", "gpt-4o"),
        ]))
        .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("AZURE_OPENAI_API_VERSION"), "{message}");
        assert!(message.contains("AZURE_OPENAI_SCOPE"), "{message}");
        assert!(!message.contains("AZURE_OPENAI_ENDPOINT"), "{message}");
    }

    #[test]
    fn explicit_azure_backend_without_bundle_lists_all_fields() {
        let err = Config::from_lookup(lookup(&[("RELAY_BACKEND", "azure")])).unwrap_err();
        let ConfigError::Incomplete { missing, .. } = err else {
            panic!("expected incomplete bundle");
        };
        assert_eq!(missing.len(), 4);
    }

    #[test]
    fn reads_process_environment() {
        temp_env::with_vars(
            [
                ("RELAY_BACKEND", Some("codex")),
                ("RELAY_MODEL", Some("gpt-5-codex")),
                ("RELAY_LOG_FORMAT", Some("json")),
                ("AZURE_OPENAI_ENDPOINT", None),
                ("AZURE_OPENAI_DEPLOYMENT", None),
                ("AZURE_OPENAI_API_VERSION", None),
                ("AZURE_OPENAI_SCOPE", None),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.llm.backend, BackendKind::Codex);
                assert_eq!(config.llm.default_model.as_deref(), Some("gpt-5-codex"));
                assert_eq!(config.logging.format, LogFormat::Json);
            },
        );
    }

    #[test]
    fn rejects_unknown_log_format() {
        let err = Config::from_lookup(lookup(&[("RELAY_LOG_FORMAT", "xml")])).unwrap_err();
        assert!(err.to_string().contains("RELAY_LOG_FORMAT"));
    }

    #[test]
    fn parses_toml_with_placeholders() {
        let raw = indoc(
            r#"
            [llm]
            backend = "azure"

            [llm.azure]
            endpoint = "{{ env.ENDPOINT }}"
            deployment = "gpt-4o"
            api_version = "2024-02-15-preview"
            scope = "{{ env.SCOPE | default("https://cognitiveservices.azure.com/.default") }}"

            [auth]
            verbose = true

            [auth.keychain]
            services = ["Anthropic"]
            "#,
        );

        let config = Config::parse(&raw, lookup(&[("ENDPOINT", "https://res.openai.azure.com")])).unwrap();
        let azure = config.llm.azure.unwrap();
        assert_eq!(azure.endpoint.as_str(), "https://res.openai.azure.com/");
        assert_eq!(azure.scope, "https://cognitiveservices.azure.com/.default");
        assert!(config.auth.verbose);
    }

    #[test]
    fn toml_azure_table_reports_missing_keys() {
        let raw = "[llm]\nbackend = \"azure\"\n\n[llm.azure]\ndeployment = \"gpt-4o\"\n";
        let err = Config::parse(raw, lookup(&[])).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("llm.azure.endpoint"), "{message}");
        assert!(message.contains("llm.azure.scope"), "{message}");
    }

    #[test]
    fn azure_backend_without_table_is_rejected() {
        let err = Config::parse("[llm]\nbackend = \"azure\"\n", lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Incomplete { .. }));
    }

    #[test]
    fn rejects_blank_keychain_service() {
        let raw = "[auth.keychain]\nservices = [\"Anthropic\", \" \"]\n";
        let err = Config::parse(raw, lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("auth.keychain.services"));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.toml");
        std::fs::write(&path, "[llm]\nbackend = \"codex\"\ndefault_model = \"gpt-4o\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.llm.backend, BackendKind::Codex);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Config::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    /// Strip the common leading indentation of a raw string literal
    fn indoc(raw: &str) -> String {
        let indent = raw
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| l.len() - l.trim_start().len())
            .min()
            .unwrap_or(0);
        raw.lines()
            .map(|l| l.get(indent..).unwrap_or(""))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
