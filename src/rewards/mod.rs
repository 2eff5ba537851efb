//! Rewards catalog and point redemption

mod types;

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

use crate::api::ApiClient;
use crate::cache::{MutationFlag, QueryCache, QueryKey};
use crate::error::{Error, Result};
use crate::notify::Notifier;
use crate::storage::{persisted_user_id, CredentialStore};

pub use types::*;

#[derive(Debug, Clone, Default)]
pub struct RewardState {
    pub catalog: Vec<RewardCatalogItem>,
    pub user_rewards: Vec<Reward>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Catalog browsing and redemption
pub struct RewardStore {
    api: Arc<ApiClient>,
    credentials: Arc<dyn CredentialStore>,
    cache: Arc<QueryCache>,
    notifier: Arc<Notifier>,
    state: RwLock<RewardState>,
    redeeming: MutationFlag,
}

impl RewardStore {
    pub(crate) fn new(
        api: Arc<ApiClient>,
        credentials: Arc<dyn CredentialStore>,
        cache: Arc<QueryCache>,
        notifier: Arc<Notifier>,
    ) -> Self {
        Self {
            api,
            credentials,
            cache,
            notifier,
            state: RwLock::new(RewardState::default()),
            redeeming: MutationFlag::default(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, RewardState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RewardState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> RewardState {
        self.read().clone()
    }

    pub fn catalog(&self) -> Vec<RewardCatalogItem> {
        self.read().catalog.clone()
    }

    pub fn user_rewards(&self) -> Vec<Reward> {
        self.read().user_rewards.clone()
    }

    pub fn catalog_item(&self, catalog_id: u64) -> Option<RewardCatalogItem> {
        self.read().catalog.iter().find(|i| i.id == catalog_id).cloned()
    }

    pub fn is_redeeming(&self) -> bool {
        self.redeeming.is_running()
    }

    /// Fetch the catalog; public, no sign-in needed
    pub async fn fetch_catalog(&self) -> Result<Vec<RewardCatalogItem>> {
        let Some(guard) = self.cache.begin(QueryKey::RewardCatalog) else {
            return Ok(self.catalog());
        };
        self.write().loading = true;

        let result = self
            .cache
            .run(QueryKey::RewardCatalog, || {
                self.api.get::<Vec<RewardCatalogItem>>("/rewards/catalog")
            })
            .await;

        let mut state = self.write();
        state.loading = false;
        match result {
            Ok(catalog) => {
                debug!(count = catalog.len(), "reward catalog loaded");
                if guard.succeed() {
                    state.catalog = catalog;
                    state.error = None;
                }
                Ok(state.catalog.clone())
            }
            Err(err) => {
                state.error = Some(err.to_string());
                drop(state);
                guard.fail(&err);
                self.notifier.error("Failed to load rewards");
                Err(err)
            }
        }
    }

    /// Fetch rewards granted to the signed-in user
    pub async fn fetch_user_rewards(&self) -> Result<Vec<Reward>> {
        let user_id = match persisted_user_id(self.credentials.as_ref()).await {
            Ok(Some(user_id)) => user_id,
            Ok(None) => {
                debug!("no user id, user rewards query disabled");
                return Ok(self.user_rewards());
            }
            Err(err) => {
                self.notifier.error("Failed to load your rewards");
                return Err(err);
            }
        };
        let Some(guard) = self.cache.begin(QueryKey::UserRewards) else {
            return Ok(self.user_rewards());
        };

        let path = format!("/rewards/user/{}", user_id);
        let result = self
            .cache
            .run(QueryKey::UserRewards, || self.api.get::<Vec<Reward>>(&path))
            .await;

        match result {
            Ok(rewards) => {
                let mut state = self.write();
                if guard.succeed() {
                    state.user_rewards = rewards;
                }
                Ok(state.user_rewards.clone())
            }
            Err(err) => {
                guard.fail(&err);
                self.notifier.error("Failed to load your rewards");
                Err(err)
            }
        }
    }

    /// Redeem a catalog item with the signed-in user's points.
    ///
    /// Stock and balances are server-owned; on success the catalog, the
    /// user's rewards, the wallet and the profile are all marked for refetch.
    pub async fn redeem(&self, catalog_id: u64) -> Result<RedeemResponse> {
        let path = format!("/rewards/catalog/{}/redeem", catalog_id);
        let result = self
            .redeeming
            .track(async {
                let user_id = persisted_user_id(self.credentials.as_ref())
                    .await?
                    .ok_or(Error::NotLoggedIn)?;
                self.api
                    .post::<_, RedeemResponse>(&path, &RedeemRequest { user_id })
                    .await
            })
            .await;

        match result {
            Ok(reply) => {
                info!(catalog_id, status = %reply.status, "reward redeemed");
                self.cache.invalidate_all(&[
                    QueryKey::RewardCatalog,
                    QueryKey::UserRewards,
                    QueryKey::Wallet,
                    QueryKey::Profile,
                ]);
                self.notifier.success("Reward redeemed!");
                Ok(reply)
            }
            Err(err) => {
                self.notifier.error(err.user_message("Failed to redeem reward"));
                Err(err)
            }
        }
    }

    pub async fn refresh_stale(&self) -> Result<()> {
        if self.cache.needs_fetch(QueryKey::RewardCatalog) {
            self.fetch_catalog().await?;
        }
        if self.cache.needs_fetch(QueryKey::UserRewards) {
            self.fetch_user_rewards().await?;
        }
        Ok(())
    }

    pub fn reset(&self) {
        *self.write() = RewardState::default();
    }
}
