//! Digital assets owned by the signed-in user

mod types;

use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

use crate::api::ApiClient;
use crate::cache::{MutationFlag, QueryCache, QueryKey};
use crate::error::Result;
use crate::notify::Notifier;
use crate::storage::{persisted_user_id, CredentialStore};

pub use types::*;

/// Cached asset collection
#[derive(Debug, Clone, Default)]
pub struct NftState {
    pub user_nfts: Vec<Nft>,
    pub loading: bool,
    pub error: Option<String>,
}

/// The user's assets and the claim flow
pub struct NftStore {
    api: Arc<ApiClient>,
    credentials: Arc<dyn CredentialStore>,
    cache: Arc<QueryCache>,
    notifier: Arc<Notifier>,
    state: RwLock<NftState>,
    claiming: MutationFlag,
}

impl NftStore {
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
            state: RwLock::new(NftState::default()),
            claiming: MutationFlag::default(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, NftState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, NftState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> NftState {
        self.read().clone()
    }

    pub fn user_nfts(&self) -> Vec<Nft> {
        self.read().user_nfts.clone()
    }

    pub fn nft(&self, nft_id: &str) -> Option<Nft> {
        self.read().user_nfts.iter().find(|n| n.id == nft_id).cloned()
    }

    /// Cached assets of one rarity
    pub fn by_rarity(&self, rarity: &Rarity) -> Vec<Nft> {
        self.read()
            .user_nfts
            .iter()
            .filter(|n| &n.rarity == rarity)
            .cloned()
            .collect()
    }

    pub fn is_claiming(&self) -> bool {
        self.claiming.is_running()
    }

    /// Fetch the signed-in user's assets; disabled without a persisted user id
    pub async fn fetch_user_nfts(&self) -> Result<Vec<Nft>> {
        let user_id = match persisted_user_id(self.credentials.as_ref()).await {
            Ok(Some(user_id)) => user_id,
            Ok(None) => {
                debug!("no user id, user NFTs query disabled");
                return Ok(self.user_nfts());
            }
            Err(err) => {
                self.notifier.error("Failed to load NFTs");
                return Err(err);
            }
        };
        let Some(guard) = self.cache.begin(QueryKey::UserNfts) else {
            return Ok(self.user_nfts());
        };
        self.write().loading = true;

        let path = format!("/users/{}/nfts", user_id);
        let result = self
            .cache
            .run(QueryKey::UserNfts, || self.api.get::<NftList>(&path))
            .await;

        let mut state = self.write();
        state.loading = false;
        match result {
            Ok(list) => {
                let nfts: Vec<Nft> = list.into();
                debug!(count = nfts.len(), "user NFTs loaded");
                if guard.succeed() {
                    state.user_nfts = nfts;
                    state.error = None;
                }
                Ok(state.user_nfts.clone())
            }
            Err(err) => {
                state.error = Some(err.to_string());
                drop(state);
                guard.fail(&err);
                self.notifier.error("Failed to load NFTs");
                Err(err)
            }
        }
    }

    /// Claim an asset.
    ///
    /// When the server replies with the asset record it replaces the cached
    /// one; any other reply marks the cached asset claimed. Either way the
    /// collection is marked for refetch.
    pub async fn claim_nft(&self, nft_id: &str) -> Result<Option<Nft>> {
        let path = format!("/nfts/{}/claim", nft_id);
        let result = self
            .claiming
            .track(self.api.post_empty::<Value>(&path))
            .await;

        match result {
            Ok(reply) => {
                info!(%nft_id, "NFT claimed");
                let claimed = {
                    let mut state = self.write();
                    let record = serde_json::from_value::<Nft>(reply)
                        .ok()
                        .filter(|nft| nft.id == nft_id);
                    let cached = state.user_nfts.iter_mut().find(|n| n.id == nft_id);
                    match (record, cached) {
                        (Some(record), Some(cached)) => {
                            *cached = record;
                            Some(cached.clone())
                        }
                        (None, Some(cached)) => {
                            cached.status = NftStatus::Claimed;
                            Some(cached.clone())
                        }
                        (record, None) => record,
                    }
                };
                self.cache.invalidate(QueryKey::UserNfts);
                self.notifier.success("NFT claimed!");
                Ok(claimed)
            }
            Err(err) => {
                self.notifier.error(err.user_message("Failed to claim NFT"));
                Err(err)
            }
        }
    }

    /// Refetch the collection if it was never fetched or was invalidated
    pub async fn refresh_stale(&self) -> Result<()> {
        if self.cache.needs_fetch(QueryKey::UserNfts) {
            self.fetch_user_nfts().await?;
        }
        Ok(())
    }

    pub fn reset(&self) {
        *self.write() = NftState::default();
    }
}
