//! Points wallet and withdrawals

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
pub struct WalletState {
    pub wallet: Option<Wallet>,
    pub withdrawals: Vec<Withdrawal>,
    pub loading: bool,
    pub error: Option<String>,
}

/// The signed-in user's balances and cash-outs
pub struct WalletStore {
    api: Arc<ApiClient>,
    credentials: Arc<dyn CredentialStore>,
    cache: Arc<QueryCache>,
    notifier: Arc<Notifier>,
    state: RwLock<WalletState>,
    withdrawing: MutationFlag,
}

impl WalletStore {
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
            state: RwLock::new(WalletState::default()),
            withdrawing: MutationFlag::default(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, WalletState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, WalletState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> WalletState {
        self.read().clone()
    }

    pub fn wallet(&self) -> Option<Wallet> {
        self.read().wallet.clone()
    }

    pub fn withdrawals(&self) -> Vec<Withdrawal> {
        self.read().withdrawals.clone()
    }

    pub fn is_withdrawing(&self) -> bool {
        self.withdrawing.is_running()
    }

    /// Fetch the wallet; `None` when nobody is signed in
    pub async fn fetch_wallet(&self) -> Result<Option<Wallet>> {
        let user_id = match persisted_user_id(self.credentials.as_ref()).await {
            Ok(Some(user_id)) => user_id,
            Ok(None) => {
                debug!("no user id, wallet query disabled");
                return Ok(self.wallet());
            }
            Err(err) => {
                self.notifier.error("Failed to load wallet");
                return Err(err);
            }
        };
        let Some(guard) = self.cache.begin(QueryKey::Wallet) else {
            return Ok(self.wallet());
        };
        self.write().loading = true;

        let path = format!("/wallets/user/{}", user_id);
        let result = self
            .cache
            .run(QueryKey::Wallet, || self.api.get::<Wallet>(&path))
            .await;

        let mut state = self.write();
        state.loading = false;
        match result {
            Ok(wallet) => {
                if guard.succeed() {
                    state.wallet = Some(wallet);
                    state.error = None;
                }
                Ok(state.wallet.clone())
            }
            Err(err) => {
                state.error = Some(err.to_string());
                drop(state);
                guard.fail(&err);
                self.notifier.error("Failed to load wallet");
                Err(err)
            }
        }
    }

    /// Fetch the user's withdrawal history
    pub async fn fetch_withdrawals(&self) -> Result<Vec<Withdrawal>> {
        let user_id = match persisted_user_id(self.credentials.as_ref()).await {
            Ok(Some(user_id)) => user_id,
            Ok(None) => return Ok(self.withdrawals()),
            Err(err) => {
                self.notifier.error("Failed to load withdrawals");
                return Err(err);
            }
        };
        let Some(guard) = self.cache.begin(QueryKey::Withdrawals) else {
            return Ok(self.withdrawals());
        };

        let path = format!("/wallets/withdraw/user/{}", user_id);
        let result = self
            .cache
            .run(QueryKey::Withdrawals, || self.api.get::<Vec<Withdrawal>>(&path))
            .await;

        match result {
            Ok(withdrawals) => {
                let mut state = self.write();
                if guard.succeed() {
                    state.withdrawals = withdrawals;
                }
                Ok(state.withdrawals.clone())
            }
            Err(err) => {
                guard.fail(&err);
                self.notifier.error("Failed to load withdrawals");
                Err(err)
            }
        }
    }

    /// Request a cash-out of `amount` to `target`
    pub async fn request_withdraw(&self, amount: f64, target: &str) -> Result<Withdrawal> {
        let result = self
            .withdrawing
            .track(async {
                let user_id = persisted_user_id(self.credentials.as_ref())
                    .await?
                    .ok_or(Error::NotLoggedIn)?;
                if !amount.is_finite() || amount <= 0.0 {
                    return Err(Error::general("withdrawal amount must be positive"));
                }
                let body = WithdrawRequest {
                    user_id,
                    amount,
                    target,
                };
                self.api
                    .post::<_, Withdrawal>("/wallets/withdraw", &body)
                    .await
            })
            .await;

        match result {
            Ok(withdrawal) => {
                info!(id = withdrawal.id, amount, "withdrawal requested");
                self.write().withdrawals.push(withdrawal.clone());
                self.cache
                    .invalidate_all(&[QueryKey::Wallet, QueryKey::Withdrawals]);
                self.notifier.success("Withdrawal requested");
                Ok(withdrawal)
            }
            Err(err) => {
                self.notifier.error(err.user_message("Withdrawal failed"));
                Err(err)
            }
        }
    }

    pub async fn refresh_stale(&self) -> Result<()> {
        if self.cache.needs_fetch(QueryKey::Wallet) {
            self.fetch_wallet().await?;
        }
        if self.cache.needs_fetch(QueryKey::Withdrawals) {
            self.fetch_withdrawals().await?;
        }
        Ok(())
    }

    pub fn reset(&self) {
        *self.write() = WalletState::default();
    }
}
