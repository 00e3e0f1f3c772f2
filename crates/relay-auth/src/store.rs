use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::{AuthError, Credential};

/// Persistence for credentials keyed by provider
///
/// Implementations are not required to be transactional; callers that
/// read-modify-write go through [`crate::RefreshLocks`].
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load the credential stored for `provider`, if any
    async fn load(&self, provider: &str) -> Result<Option<Credential>, AuthError>;

    /// Replace the credential stored for `provider`
    async fn save(&self, provider: &str, credential: &Credential) -> Result<(), AuthError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    credentials: BTreeMap<String, Credential>,
}

/// JSON credential file, `~/.relay/auth.json` by default
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default store location under the user's home directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".relay").join("auth.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<StoreFile, AuthError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) if raw.trim().is_empty() => Ok(StoreFile::default()),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| AuthError::store(&self.path, e)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(StoreFile::default()),
            Err(e) => Err(AuthError::store(&self.path, e)),
        }
    }

    async fn write(&self, file: &StoreFile) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AuthError::store(&self.path, e))?;
        }

        let json = serde_json::to_vec_pretty(file).map_err(|e| AuthError::store(&self.path, e))?;

        // Write-then-rename so readers never observe a truncated file
        let tmp = self.path.with_extension("json.tmp");
        if let Err(e) = tokio::fs::remove_file(&tmp).await
            && e.kind() != ErrorKind::NotFound
        {
            return Err(AuthError::store(&tmp, e));
        }

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut out = options.open(&tmp).await.map_err(|e| AuthError::store(&tmp, e))?;
        out.write_all(&json).await.map_err(|e| AuthError::store(&tmp, e))?;
        out.flush().await.map_err(|e| AuthError::store(&tmp, e))?;
        drop(out);

        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| AuthError::store(&self.path, e))
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self, provider: &str) -> Result<Option<Credential>, AuthError> {
        Ok(self.read().await?.credentials.remove(provider))
    }

    async fn save(&self, provider: &str, credential: &Credential) -> Result<(), AuthError> {
        let mut file = self.read().await?;
        file.credentials.insert(provider.to_owned(), credential.clone());
        self.write(&file).await
    }
}
