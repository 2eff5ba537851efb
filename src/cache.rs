//! Bookkeeping for cached query results
//!
//! Stores keep their own collections; the [`QueryCache`] tracks, per key, when
//! the collection was last fetched, whether a mutation has marked it stale and
//! whether a fetch is already running. It is shared by every store so that a
//! mutation in one store can invalidate a collection owned by another.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockWriteGuard};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Identifies one cached collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Profile,
    Missions,
    UserMissions,
    UserNfts,
    Wallet,
    Withdrawals,
    RewardCatalog,
    UserRewards,
}

impl QueryKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKey::Profile => "profile",
            QueryKey::Missions => "missions",
            QueryKey::UserMissions => "userMissions",
            QueryKey::UserNfts => "userNFTs",
            QueryKey::Wallet => "wallet",
            QueryKey::Withdrawals => "withdrawals",
            QueryKey::RewardCatalog => "rewardCatalog",
            QueryKey::UserRewards => "userRewards",
        }
    }
}

/// Freshness of one key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryState {
    pub fetched_at: Option<DateTime<Utc>>,
    pub stale: bool,
    pub in_flight: bool,
    pub error: Option<String>,
    /// Bumped by every invalidation
    pub generation: u64,
}

impl QueryState {
    /// Never fetched, or invalidated since
    pub fn needs_fetch(&self) -> bool {
        self.fetched_at.is_none() || self.stale
    }
}

/// Shared freshness table for every store
#[derive(Debug)]
pub struct QueryCache {
    states: RwLock<HashMap<QueryKey, QueryState>>,
    /// Bumped by every `clear`; guards from before a clear never land
    epoch: AtomicU64,
    retry: u32,
}

impl QueryCache {
    /// `retry` is how many extra attempts a failed read gets
    pub fn new(retry: u32) -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
            epoch: AtomicU64::new(0),
            retry,
        }
    }

    fn states(&self) -> RwLockWriteGuard<'_, HashMap<QueryKey, QueryState>> {
        self.states.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self, key: QueryKey) -> QueryState {
        self.states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
            .unwrap_or_default()
    }

    pub fn needs_fetch(&self, key: QueryKey) -> bool {
        self.state(key).needs_fetch()
    }

    pub fn is_stale(&self, key: QueryKey) -> bool {
        self.state(key).stale
    }

    /// Mark a collection for refetch
    pub fn invalidate(&self, key: QueryKey) {
        debug!(key = key.as_str(), "invalidate");
        let mut states = self.states();
        let state = states.entry(key).or_default();
        state.stale = true;
        state.generation += 1;
    }

    pub fn invalidate_all(&self, keys: &[QueryKey]) {
        for key in keys {
            self.invalidate(*key);
        }
    }

    /// Forget everything, e.g. when the signed-in user changes
    pub fn clear(&self) {
        let mut states = self.states();
        states.clear();
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }

    /// Claim the fetch slot for `key`.
    ///
    /// Returns `None` while another fetch of the same key is running. The slot
    /// is released when the guard is finished or dropped.
    pub fn begin(&self, key: QueryKey) -> Option<FetchGuard<'_>> {
        let mut states = self.states();
        let state = states.entry(key).or_default();
        if state.in_flight {
            debug!(key = key.as_str(), "fetch already in flight");
            return None;
        }
        state.in_flight = true;
        Some(FetchGuard {
            cache: self,
            key,
            epoch: self.epoch.load(Ordering::SeqCst),
            generation: state.generation,
        })
    }

    /// Run `fetch`, retrying failures up to the configured count.
    ///
    /// A 401 is never retried: the credentials are already gone.
    pub async fn run<T, F, Fut>(&self, key: QueryKey, mut fetch: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match fetch().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_unauthorized() || attempt >= self.retry => return Err(err),
                Err(err) => {
                    attempt += 1;
                    warn!(key = key.as_str(), attempt, error = %err, "query failed, retrying");
                }
            }
        }
    }
}

/// Exclusive right to fetch one key
#[must_use]
pub struct FetchGuard<'a> {
    cache: &'a QueryCache,
    key: QueryKey,
    epoch: u64,
    generation: u64,
}

impl FetchGuard<'_> {
    /// Record a successful fetch.
    ///
    /// Returns `false` when the key was invalidated or the cache cleared while
    /// the request was running. The payload predates that change and must not
    /// be stored; the key stays stale so the next refresh fetches it again.
    pub fn succeed(self) -> bool {
        let mut states = self.cache.states();
        if !self.current() {
            debug!(key = self.key.as_str(), "cache cleared during fetch, result dropped");
            return false;
        }
        let state = states.entry(self.key).or_default();
        if state.generation != self.generation {
            debug!(key = self.key.as_str(), "invalidated during fetch, result dropped");
            return false;
        }
        state.fetched_at = Some(Utc::now());
        state.stale = false;
        state.error = None;
        true
    }

    /// Record a failed fetch; freshness is left as it was
    pub fn fail(self, err: &Error) {
        let mut states = self.cache.states();
        if self.current() {
            states.entry(self.key).or_default().error = Some(err.to_string());
        }
    }

    /// Whether the cache has been cleared since this guard was taken
    fn current(&self) -> bool {
        self.cache.epoch.load(Ordering::SeqCst) == self.epoch
    }
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        if !self.current() {
            return;
        }
        if let Some(state) = self.cache.states().get_mut(&self.key) {
            state.in_flight = false;
        }
    }
}

/// Whether a mutation of one kind is running
#[derive(Debug, Default)]
pub struct MutationFlag(AtomicBool);

impl MutationFlag {
    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Raise the flag for the duration of `request`
    pub(crate) async fn track<T, Fut>(&self, request: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        self.0.store(true, Ordering::SeqCst);
        let _lower = Lower(&self.0);
        request.await
    }
}

struct Lower<'a>(&'a AtomicBool);

impl Drop for Lower<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn fetched_keys_go_stale_on_invalidate() {
        let cache = QueryCache::new(1);
        assert!(cache.needs_fetch(QueryKey::Missions));

        cache.begin(QueryKey::Missions).unwrap().succeed();
        assert!(!cache.needs_fetch(QueryKey::Missions));

        cache.invalidate(QueryKey::Missions);
        assert!(cache.is_stale(QueryKey::Missions));
        assert!(cache.needs_fetch(QueryKey::Missions));
    }

    #[test]
    fn invalidation_during_fetch_keeps_key_stale() {
        let cache = QueryCache::new(1);
        let guard = cache.begin(QueryKey::UserMissions).unwrap();
        cache.invalidate(QueryKey::UserMissions);

        assert!(!guard.succeed());
        assert!(cache.is_stale(QueryKey::UserMissions));
        assert!(cache.needs_fetch(QueryKey::UserMissions));

        assert!(cache.begin(QueryKey::UserMissions).unwrap().succeed());
        assert!(!cache.needs_fetch(QueryKey::UserMissions));
    }

    #[test]
    fn clear_during_fetch_drops_the_result() {
        let cache = QueryCache::new(1);
        let guard = cache.begin(QueryKey::Wallet).unwrap();
        cache.clear();

        assert!(!guard.succeed());
        assert!(cache.state(QueryKey::Wallet).fetched_at.is_none());
    }

    #[test]
    fn one_fetch_per_key_at_a_time() {
        let cache = QueryCache::new(1);
        let guard = cache.begin(QueryKey::UserNfts).unwrap();
        assert!(cache.begin(QueryKey::UserNfts).is_none());
        assert!(cache.begin(QueryKey::Wallet).is_some());

        drop(guard);
        assert!(!cache.state(QueryKey::UserNfts).in_flight);
        assert!(cache.begin(QueryKey::UserNfts).is_some());
    }

    #[test]
    fn failed_fetch_keeps_key_unfetched() {
        let cache = QueryCache::new(0);
        cache
            .begin(QueryKey::Wallet)
            .unwrap()
            .fail(&Error::general("down"));

        let state = cache.state(QueryKey::Wallet);
        assert!(state.needs_fetch());
        assert_eq!(state.error.as_deref(), Some("down"));
        assert!(!state.in_flight);
    }

    #[tokio::test]
    async fn run_retries_once_then_gives_up() {
        let cache = QueryCache::new(1);
        let calls = AtomicU32::new(0);

        let result: Result<()> = cache
            .run(QueryKey::Missions, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::Api {
                    status: 500,
                    message: "down".to_string(),
                })
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn mutation_flag_is_lowered_after_failure() {
        let flag = MutationFlag::default();
        let result: Result<()> = flag
            .track(async {
                assert!(flag.is_running());
                Err(Error::general("rejected"))
            })
            .await;

        assert!(result.is_err());
        assert!(!flag.is_running());
    }

    #[tokio::test]
    async fn run_does_not_retry_unauthorized() {
        let cache = QueryCache::new(3);
        let calls = AtomicU32::new(0);

        let result: Result<()> = cache
            .run(QueryKey::Profile, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::Unauthorized(String::new()))
            })
            .await;

        assert!(result.unwrap_err().is_unauthorized());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
