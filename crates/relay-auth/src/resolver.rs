use std::sync::Arc;

use jiff::Timestamp;
use relay_config::{BackendKind, Config};
use secrecy::{ExposeSecret, SecretString};

use crate::identity::{IdentityChain, IdentityTokenProvider};
use crate::keychain::KeychainLookup;
use crate::oauth::{OAuthRefresher, TokenRefresher};
use crate::secrets::{SecretSource, SystemSecrets};
use crate::store::{CredentialStore, FileCredentialStore};
use crate::trace::SourceTrace;
use crate::{AuthError, AuthMethod, Credential, CredentialSource, RefreshLocks, ResolvedCredential};

/// Default direct-secret variable for each backend
pub fn default_secret_env(backend: BackendKind) -> Option<&'static str> {
    match backend {
        BackendKind::Anthropic => Some("ANTHROPIC_API_KEY"),
        BackendKind::Codex => None,
        BackendKind::Azure => Some("AZURE_OPENAI_API_KEY"),
    }
}

struct IdentitySource {
    provider: Arc<dyn IdentityTokenProvider>,
    scope: String,
}

/// Ordered, fallthrough credential lookup for one credential identity
///
/// Every call to [`CredentialResolver::resolve`] walks the chain again; nothing
/// is cached in memory between calls.
pub struct CredentialResolver {
    provider: String,
    secrets: Arc<dyn SecretSource>,
    secret_env: Option<String>,
    keychain: Option<KeychainLookup>,
    identity: Option<IdentitySource>,
    store: Option<Arc<dyn CredentialStore>>,
    refresher: Arc<dyn TokenRefresher>,
    locks: RefreshLocks,
    verbose: bool,
}

impl CredentialResolver {
    /// Resolver for `provider` with only the store and refresh rungs
    pub fn new(
        provider: impl Into<String>,
        secrets: Arc<dyn SecretSource>,
        store: Option<Arc<dyn CredentialStore>>,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Self {
        Self {
            provider: provider.into(),
            secrets,
            secret_env: None,
            keychain: None,
            identity: None,
            store,
            refresher,
            locks: RefreshLocks::global(),
            verbose: false,
        }
    }

    /// Resolver for the configured backend using the real environment and keychain
    pub fn from_config(config: &Config, http: &reqwest::Client) -> Self {
        Self::for_backend(config, http, Arc::new(SystemSecrets))
    }

    /// Resolver for the configured backend reading ambient secrets through `secrets`
    pub fn for_backend(config: &Config, http: &reqwest::Client, secrets: Arc<dyn SecretSource>) -> Self {
        let backend = config.llm.backend;
        let auth = &config.auth;

        let store_path = auth.credentials_path.clone().or_else(FileCredentialStore::default_path);
        let store = store_path.map(|path| Arc::new(FileCredentialStore::new(path)) as Arc<dyn CredentialStore>);

        let mut resolver = Self::new(
            backend.credential_key(),
            Arc::clone(&secrets),
            store,
            Arc::new(OAuthRefresher::with_default_clients(http.clone())),
        )
        .verbose(config.verbose());

        if let Some(name) = auth.secret_env.as_deref().or_else(|| default_secret_env(backend)) {
            resolver = resolver.with_secret_env(name);
        }

        let keychain = match backend {
            BackendKind::Anthropic => Some(KeychainLookup::anthropic(
                auth.keychain.services.clone(),
                auth.keychain.account.clone(),
            )),
            BackendKind::Codex | BackendKind::Azure => auth.keychain.services.clone().map(|services| KeychainLookup {
                services,
                account: auth.keychain.account.clone(),
                ..KeychainLookup::default()
            }),
        };
        if let Some(keychain) = keychain {
            resolver = resolver.with_keychain(keychain);
        }

        if backend == BackendKind::Azure
            && let Some(azure) = &config.llm.azure
        {
            let chain = IdentityChain::azure(http, secrets.as_ref(), azure.managed_identity_client_id.as_deref());
            resolver = resolver.with_identity(Arc::new(chain), azure.scope.clone());
        }

        resolver
    }

    #[must_use]
    pub fn with_secret_env(mut self, name: impl Into<String>) -> Self {
        self.secret_env = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_keychain(mut self, lookup: KeychainLookup) -> Self {
        self.keychain = Some(lookup);
        self
    }

    #[must_use]
    pub fn with_identity(mut self, provider: Arc<dyn IdentityTokenProvider>, scope: impl Into<String>) -> Self {
        self.identity = Some(IdentitySource {
            provider,
            scope: scope.into(),
        });
        self
    }

    #[must_use]
    pub fn with_locks(mut self, locks: RefreshLocks) -> Self {
        self.locks = locks;
        self
    }

    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Credential identity this resolver serves, e.g. `openai`
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Walk the resolution chain; the first usable credential wins
    ///
    /// # Errors
    ///
    /// - `CredentialNotFound` when every source is exhausted
    /// - `RefreshFailed` when a stored OAuth credential could not be refreshed
    /// - `Store` when the credential file cannot be read or written
    pub async fn resolve(&self) -> Result<ResolvedCredential, AuthError> {
        let trace = SourceTrace {
            verbose: self.verbose,
            provider: &self.provider,
        };
        let mut last_source = CredentialSource::Environment;

        if let Some(name) = &self.secret_env {
            match self.secrets.env_var(name).filter(|v| !v.trim().is_empty()) {
                Some(value) => {
                    trace.attempt(CredentialSource::Environment, format_args!("using {name}"));
                    return Ok(ResolvedCredential {
                        token: SecretString::from(value),
                        account_id: None,
                        method: AuthMethod::ApiKey,
                        source: CredentialSource::Environment,
                    });
                }
                None => trace.attempt(CredentialSource::Environment, format_args!("{name} is not set")),
            }
        }

        if let Some(keychain) = self.keychain.as_ref().filter(|k| !k.is_empty()) {
            last_source = CredentialSource::Keychain;
            if self.secrets.has_keychain() {
                if let Some(key) = keychain.find(self.secrets.as_ref(), trace).await {
                    return Ok(ResolvedCredential {
                        token: SecretString::from(key),
                        account_id: None,
                        method: AuthMethod::ApiKey,
                        source: CredentialSource::Keychain,
                    });
                }
            } else {
                trace.attempt(CredentialSource::Keychain, "no platform keychain on this host, skipping");
            }
        }

        if let Some(identity) = &self.identity {
            last_source = CredentialSource::Identity;
            match identity.provider.token(&identity.scope).await {
                Ok(token) => {
                    trace.attempt(
                        CredentialSource::Identity,
                        format_args!("retrieved token for scope {}", identity.scope),
                    );
                    return Ok(ResolvedCredential {
                        token: token.token,
                        account_id: None,
                        method: AuthMethod::ManagedIdentity,
                        source: CredentialSource::Identity,
                    });
                }
                Err(e) => trace.attempt(CredentialSource::Identity, format_args!("{e}, falling through")),
            }
        }

        let Some(store) = &self.store else {
            return Err(self.not_found(last_source));
        };

        let Some(credential) = store.load(&self.provider).await? else {
            trace.attempt(CredentialSource::Store, "no stored credential");
            return Err(self.not_found(CredentialSource::Store));
        };

        if credential.needs_refresh(Timestamp::now()) && credential.can_refresh() {
            return self.refresh_stored(store.as_ref(), trace).await;
        }

        if credential.access_token.expose_secret().is_empty() {
            trace.attempt(CredentialSource::Store, "stored credential has no access token");
            return Err(self.not_found(CredentialSource::Store));
        }

        trace.attempt(CredentialSource::Store, "using stored credential");
        Ok(ResolvedCredential::from_credential(credential, CredentialSource::Store))
    }

    async fn refresh_stored(
        &self,
        store: &dyn CredentialStore,
        trace: SourceTrace<'_>,
    ) -> Result<ResolvedCredential, AuthError> {
        let _guard = self.locks.lock(&self.provider).await;

        // Another caller may have refreshed while this one waited
        let Some(current) = store.load(&self.provider).await? else {
            return Err(self.not_found(CredentialSource::Store));
        };
        if !(current.needs_refresh(Timestamp::now()) && current.can_refresh()) {
            trace.attempt(CredentialSource::Store, "using credential refreshed by a concurrent caller");
            return Ok(ResolvedCredential::from_credential(current, CredentialSource::Store));
        }

        let refreshed: Credential = match self.refresher.refresh(&self.provider, &current).await {
            Ok(refreshed) => refreshed,
            Err(e) => {
                trace.attempt(CredentialSource::RefreshedStore, format_args!("{e}"));
                return Err(e);
            }
        };

        store.save(&self.provider, &refreshed).await?;
        trace.attempt(CredentialSource::RefreshedStore, "refreshed and persisted OAuth token");

        Ok(ResolvedCredential::from_credential(refreshed, CredentialSource::RefreshedStore))
    }

    fn not_found(&self, last_source: CredentialSource) -> AuthError {
        AuthError::CredentialNotFound {
            provider: self.provider.clone(),
            last_source,
        }
    }
}
