use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-credential-identity mutual exclusion around check, refresh and persist
#[derive(Debug, Clone, Default)]
pub struct RefreshLocks {
    inner: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl RefreshLocks {
    /// Process-wide lock table shared by every resolver
    pub fn global() -> Self {
        static GLOBAL: OnceLock<RefreshLocks> = OnceLock::new();
        GLOBAL.get_or_init(Self::default).clone()
    }

    /// Wait for exclusive access to `identity`
    pub async fn lock(&self, identity: &str) -> OwnedMutexGuard<()> {
        let mutex = Arc::clone(&self.inner.entry(identity.to_owned()).or_default());
        mutex.lock_owned().await
    }
}
