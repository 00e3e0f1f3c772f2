use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::AuthError;

/// Ambient secret access: process environment and platform keychain
///
/// Injected into the resolver so tests can substitute deterministic fakes.
#[async_trait]
pub trait SecretSource: Send + Sync {
    /// Value of an environment variable, `None` when unset
    fn env_var(&self, name: &str) -> Option<String>;

    /// Whether a platform keychain exists on this host
    fn has_keychain(&self) -> bool;

    /// Password stored under `service` (and `account`, when given)
    ///
    /// A missing item is `Ok(None)`; only a failure to run the query is an error.
    async fn keychain_password(&self, service: &str, account: Option<&str>) -> Result<Option<String>, AuthError>;
}

/// Real process environment plus the macOS `security` tool
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSecrets;

#[async_trait]
impl SecretSource for SystemSecrets {
    fn env_var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn has_keychain(&self) -> bool {
        cfg!(target_os = "macos")
    }

    async fn keychain_password(&self, service: &str, account: Option<&str>) -> Result<Option<String>, AuthError> {
        let mut command = Command::new("security");
        command.args(["find-generic-password", "-s", service, "-w"]);
        if let Some(account) = account {
            command.args(["-a", account]);
        }

        let output = command
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| AuthError::Keychain {
                service: service.to_owned(),
                message: e.to_string(),
            })?;

        // Non-zero exit means the item does not exist
        if !output.status.success() {
            return Ok(None);
        }

        let value = String::from_utf8_lossy(&output.stdout).trim().to_owned();
        Ok((!value.is_empty()).then_some(value))
    }
}
