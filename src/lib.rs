//! CarbonCare Rust Client Library
//!
//! A typed client for the CarbonCare missions and rewards backend, providing
//! the signed-in session, missions, digital assets, the points wallet and the
//! rewards catalog, each cached in memory and kept in step with the server.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod fetch;
pub mod i18n;
pub mod missions;
pub mod navigation;
pub mod nfts;
pub mod notify;
pub mod rewards;
pub mod storage;
pub mod wallet;

use std::sync::{Arc, Weak};
use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::auth::SessionStore;
use crate::cache::QueryCache;
use crate::config::AppConfig;
use crate::dashboard::DashboardSummary;
use crate::error::Result;
use crate::i18n::Language;
use crate::missions::MissionStore;
use crate::navigation::Navigator;
use crate::nfts::NftStore;
use crate::notify::Notifier;
use crate::rewards::RewardStore;
use crate::storage::{CredentialStore, MemoryStore};
use crate::wallet::WalletStore;

/// The main entry point for the CarbonCare client
///
/// Owns the API client and every store. All of them share one credential
/// store, navigator, notifier and query cache.
pub struct CarbonCare {
    config: AppConfig,
    credentials: Arc<dyn CredentialStore>,
    navigator: Arc<Navigator>,
    notifier: Arc<Notifier>,
    cache: Arc<QueryCache>,
    api: Arc<ApiClient>,
    auth: Arc<SessionStore>,
    missions: Arc<MissionStore>,
    nfts: Arc<NftStore>,
    wallet: Arc<WalletStore>,
    rewards: Arc<RewardStore>,
}

impl CarbonCare {
    /// Create a new client keeping credentials in memory
    ///
    /// # Example
    ///
    /// ```no_run
    /// use carboncare_client::{CarbonCare, config::AppConfig};
    ///
    /// # async fn run() -> carboncare_client::error::Result<()> {
    /// let client = CarbonCare::new(AppConfig::new("http://localhost:8080"))?;
    /// client.auth().restore().await;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(config: AppConfig) -> Result<Self> {
        Self::with_store(config, Arc::new(MemoryStore::new()))
    }

    /// Create a new client over a custom credential store
    ///
    /// # Example
    ///
    /// ```no_run
    /// use std::sync::Arc;
    /// use carboncare_client::{CarbonCare, config::AppConfig, storage::FileStore};
    ///
    /// let store = Arc::new(FileStore::new("/tmp/carboncare/credentials.json"));
    /// let client = CarbonCare::with_store(AppConfig::from_env(), store).unwrap();
    /// ```
    pub fn with_store(config: AppConfig, credentials: Arc<dyn CredentialStore>) -> Result<Self> {
        config.log_summary();

        let navigator = Arc::new(Navigator::new());
        let notifier = Arc::new(Notifier::new());
        let cache = Arc::new(QueryCache::new(config.retry));
        let api = Arc::new(ApiClient::new(&config, credentials.clone(), navigator.clone())?);
        debug!(base_url = %api.base_url(), "client created");

        let auth = Arc::new(SessionStore::new(
            api.clone(),
            credentials.clone(),
            navigator.clone(),
            notifier.clone(),
            cache.clone(),
        ));
        let missions = Arc::new(MissionStore::new(
            api.clone(),
            credentials.clone(),
            cache.clone(),
            notifier.clone(),
        ));
        let nfts = Arc::new(NftStore::new(
            api.clone(),
            credentials.clone(),
            cache.clone(),
            notifier.clone(),
        ));
        let wallet = Arc::new(WalletStore::new(
            api.clone(),
            credentials.clone(),
            cache.clone(),
            notifier.clone(),
        ));
        let rewards = Arc::new(RewardStore::new(
            api.clone(),
            credentials.clone(),
            cache.clone(),
            notifier.clone(),
        ));

        // The stores own the API client, so the hook only holds weak references.
        let signed_out = SignedOut {
            auth: Arc::downgrade(&auth),
            missions: Arc::downgrade(&missions),
            nfts: Arc::downgrade(&nfts),
            wallet: Arc::downgrade(&wallet),
            rewards: Arc::downgrade(&rewards),
            cache: Arc::downgrade(&cache),
        };
        api.on_unauthorized(move || signed_out.apply());

        Ok(Self {
            config,
            credentials,
            navigator,
            notifier,
            cache,
            api,
            auth,
            missions,
            nfts,
            wallet,
            rewards,
        })
    }

    /// Get a reference to the session store for login and registration
    pub fn auth(&self) -> &SessionStore {
        &self.auth
    }

    pub fn missions(&self) -> &MissionStore {
        &self.missions
    }

    pub fn nfts(&self) -> &NftStore {
        &self.nfts
    }

    pub fn wallet(&self) -> &WalletStore {
        &self.wallet
    }

    pub fn rewards(&self) -> &RewardStore {
        &self.rewards
    }

    /// The underlying HTTP client
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    /// Queue of success and error notifications raised by the stores
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The persisted interface language, English when unset
    pub async fn language(&self) -> Result<Language> {
        Language::load(self.credentials.as_ref()).await
    }

    pub async fn set_language(&self, language: Language) -> Result<()> {
        language.save(self.credentials.as_ref()).await
    }

    /// Sign out and drop every cached collection
    pub async fn logout(&self) -> Result<()> {
        let result = self.auth.logout().await;
        self.reset_stores();
        result
    }

    fn reset_stores(&self) {
        self.missions.reset();
        self.nfts.reset();
        self.wallet.reset();
        self.rewards.reset();
    }

    /// Refetch every query that was never fetched or has been invalidated.
    ///
    /// Failures are already reported through the notifier; the first one is
    /// returned after every store has had its turn.
    pub async fn sync(&self) -> Result<()> {
        let results = [
            self.auth.refresh_stale().await,
            self.missions.refresh_stale().await,
            self.nfts.refresh_stale().await,
            self.wallet.refresh_stale().await,
            self.rewards.refresh_stale().await,
        ];

        let mut first = None;
        for result in results {
            if let Err(err) = result {
                warn!(error = %err, "sync failed");
                first.get_or_insert(err);
            }
        }
        first.map_or(Ok(()), Err)
    }

    /// Dashboard counts from what is cached right now; no requests are made
    pub fn dashboard(&self) -> DashboardSummary {
        DashboardSummary::compute(
            self.auth.user().as_ref(),
            &self.missions.user_missions(),
            &self.nfts.user_nfts(),
        )
    }
}

/// Tears down in-memory state after the server rejects the token
struct SignedOut {
    auth: Weak<SessionStore>,
    missions: Weak<MissionStore>,
    nfts: Weak<NftStore>,
    wallet: Weak<WalletStore>,
    rewards: Weak<RewardStore>,
    cache: Weak<QueryCache>,
}

impl SignedOut {
    fn apply(&self) {
        if let Some(auth) = self.auth.upgrade() {
            auth.expire();
        }
        if let Some(cache) = self.cache.upgrade() {
            cache.clear();
        }
        if let Some(missions) = self.missions.upgrade() {
            missions.reset();
        }
        if let Some(nfts) = self.nfts.upgrade() {
            nfts.reset();
        }
        if let Some(wallet) = self.wallet.upgrade() {
            wallet.reset();
        }
        if let Some(rewards) = self.rewards.upgrade() {
            rewards.reset();
        }
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::CarbonCare;
    pub use crate::auth::{Session, SessionStatus, User};
    pub use crate::config::{AppConfig, Environment};
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::i18n::Language;
    pub use crate::navigation::Route;
    pub use crate::storage::{CredentialStore, FileStore, MemoryStore};
}
