//! In-memory ambient secrets

use std::collections::HashMap;

use async_trait::async_trait;
use relay_auth::{AuthError, SecretSource};

/// Environment variables from a map and no platform keychain
#[derive(Debug, Default)]
pub struct StaticSecrets {
    vars: HashMap<String, String>,
}

impl StaticSecrets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var(mut self, name: &str, value: &str) -> Self {
        self.vars.insert(name.to_owned(), value.to_owned());
        self
    }
}

#[async_trait]
impl SecretSource for StaticSecrets {
    fn env_var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }

    fn has_keychain(&self) -> bool {
        false
    }

    async fn keychain_password(&self, _service: &str, _account: Option<&str>) -> Result<Option<String>, AuthError> {
        Ok(None)
    }
}
