/// Errors raised while loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Part of an all-or-nothing settings bundle is missing
    #[error("missing required {section} settings: {}", missing.join(", "))]
    Incomplete {
        /// Bundle that was partially configured
        section: &'static str,
        /// Every setting that is absent or empty
        missing: Vec<String>,
    },

    /// A setting is present but not acceptable
    #[error("invalid setting `{key}`: {reason}")]
    Invalid {
        /// Name of the offending setting
        key: String,
        /// Why the value was rejected
        reason: String,
    },

    /// `{{ env.VAR }}` expansion failed
    #[error("config variable expansion failed: {0}")]
    Expansion(String),

    /// Config file could not be read
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// File that was requested
        path: String,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ConfigError {
    pub(crate) fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
