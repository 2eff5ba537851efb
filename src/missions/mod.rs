//! Missions and the signed-in user's progress on them

mod types;

use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

use crate::api::ApiClient;
use crate::cache::{MutationFlag, QueryCache, QueryKey};
use crate::error::Result;
use crate::notify::Notifier;
use crate::storage::{persisted_user_id, CredentialStore};

pub use types::*;

/// Cached mission collections
#[derive(Debug, Clone, Default)]
pub struct MissionState {
    /// Every mission on offer
    pub missions: Vec<Mission>,
    /// Missions the signed-in user has taken
    pub user_missions: Vec<UserMission>,
    pub missions_loading: bool,
    pub user_missions_loading: bool,
    /// Last fetch error, if any
    pub error: Option<String>,
}

impl MissionState {
    fn upsert_user_mission(&mut self, mission: UserMission) {
        match self.user_missions.iter_mut().find(|m| m.id == mission.id) {
            Some(existing) => *existing = mission,
            None => self.user_missions.push(mission),
        }
    }

    fn replace_user_mission(&mut self, mission: UserMission) {
        if let Some(existing) = self.user_missions.iter_mut().find(|m| m.id == mission.id) {
            *existing = mission;
        }
    }
}

/// Missions, the user's taken missions, and the take/prove/verify flow
pub struct MissionStore {
    api: Arc<ApiClient>,
    credentials: Arc<dyn CredentialStore>,
    cache: Arc<QueryCache>,
    notifier: Arc<Notifier>,
    state: RwLock<MissionState>,
    taking: MutationFlag,
    submitting: MutationFlag,
    verifying: MutationFlag,
}

impl MissionStore {
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
            state: RwLock::new(MissionState::default()),
            taking: MutationFlag::default(),
            submitting: MutationFlag::default(),
            verifying: MutationFlag::default(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, MissionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MissionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of everything cached
    pub fn snapshot(&self) -> MissionState {
        self.read().clone()
    }

    pub fn missions(&self) -> Vec<Mission> {
        self.read().missions.clone()
    }

    pub fn user_missions(&self) -> Vec<UserMission> {
        self.read().user_missions.clone()
    }

    pub fn mission(&self, mission_id: u64) -> Option<Mission> {
        self.read().missions.iter().find(|m| m.id == mission_id).cloned()
    }

    /// The user's entry for `mission_id`, if they took it
    pub fn user_mission_for(&self, mission_id: u64) -> Option<UserMission> {
        self.read()
            .user_missions
            .iter()
            .find(|m| m.mission_id == mission_id)
            .cloned()
    }

    pub fn is_taking_mission(&self) -> bool {
        self.taking.is_running()
    }

    pub fn is_submitting_proof(&self) -> bool {
        self.submitting.is_running()
    }

    pub fn is_verifying_mission(&self) -> bool {
        self.verifying.is_running()
    }

    /// Fetch every mission on offer
    pub async fn fetch_missions(&self) -> Result<Vec<Mission>> {
        let Some(guard) = self.cache.begin(QueryKey::Missions) else {
            return Ok(self.missions());
        };
        self.write().missions_loading = true;

        let result = self
            .cache
            .run(QueryKey::Missions, || self.api.get::<Vec<Mission>>("/missions"))
            .await;

        let mut state = self.write();
        state.missions_loading = false;
        match result {
            Ok(missions) => {
                debug!(count = missions.len(), "missions loaded");
                if guard.succeed() {
                    state.missions = missions;
                    state.error = None;
                }
                Ok(state.missions.clone())
            }
            Err(err) => {
                state.error = Some(err.to_string());
                drop(state);
                guard.fail(&err);
                self.notifier.error("Failed to load missions");
                Err(err)
            }
        }
    }

    /// Fetch the missions the signed-in user has taken.
    ///
    /// Without a persisted user id the query is disabled and the cached
    /// collection is returned untouched. A reply that lost a race with a
    /// mutation is discarded in favour of the cached collection.
    pub async fn fetch_user_missions(&self) -> Result<Vec<UserMission>> {
        let user_id = match persisted_user_id(self.credentials.as_ref()).await {
            Ok(Some(user_id)) => user_id,
            Ok(None) => {
                debug!("no user id, user missions query disabled");
                return Ok(self.user_missions());
            }
            Err(err) => {
                self.notifier.error("Failed to load user missions");
                return Err(err);
            }
        };
        let Some(guard) = self.cache.begin(QueryKey::UserMissions) else {
            return Ok(self.user_missions());
        };
        self.write().user_missions_loading = true;

        let path = format!("/users/{}/missions", user_id);
        let result = self
            .cache
            .run(QueryKey::UserMissions, || self.api.get::<Vec<UserMission>>(&path))
            .await;

        let mut state = self.write();
        state.user_missions_loading = false;
        match result {
            Ok(missions) => {
                debug!(count = missions.len(), "user missions loaded");
                if guard.succeed() {
                    state.user_missions = missions;
                    state.error = None;
                }
                Ok(state.user_missions.clone())
            }
            Err(err) => {
                state.error = Some(err.to_string());
                drop(state);
                guard.fail(&err);
                self.notifier.error("Failed to load user missions");
                Err(err)
            }
        }
    }

    /// Take a mission. The returned record is added to the user's missions
    /// straight away and the collection is marked for refetch.
    pub async fn take_mission(&self, mission_id: u64) -> Result<UserMission> {
        let path = format!("/missions/{}/take", mission_id);
        let result = self
            .taking
            .track(self.api.post_empty::<UserMission>(&path))
            .await;

        match result {
            Ok(taken) => {
                info!(mission_id, status = %taken.status, "mission taken");
                self.write().upsert_user_mission(taken.clone());
                self.cache.invalidate(QueryKey::UserMissions);
                self.notifier.success("Mission taken!");
                Ok(taken)
            }
            Err(err) => {
                self.notifier.error(err.user_message("Failed to take mission"));
                Err(err)
            }
        }
    }

    /// Submit proof of completion for a taken mission.
    ///
    /// Returns the updated record when the server sends one back.
    pub async fn submit_proof<P>(&self, mission_id: u64, proof: &P) -> Result<Option<UserMission>>
    where
        P: Serialize + ?Sized,
    {
        let path = format!("/missions/{}/submit-proof", mission_id);
        let body = SubmitProofRequest { proof_data: proof };
        let result = self
            .submitting
            .track(self.api.post::<_, Value>(&path, &body))
            .await;

        self.finish_progress(result, "Proof submitted!", "Failed to submit proof")
    }

    /// Ask the server to verify a mission
    pub async fn verify_mission(&self, mission_id: u64) -> Result<Option<UserMission>> {
        let path = format!("/missions/{}/verify", mission_id);
        let result = self
            .verifying
            .track(self.api.post_empty::<Value>(&path))
            .await;

        self.finish_progress(result, "Mission verified!", "Failed to verify mission")
    }

    /// Shared tail of proof submission and verification; both can mint assets
    fn finish_progress(
        &self,
        result: Result<Value>,
        success: &str,
        fallback: &str,
    ) -> Result<Option<UserMission>> {
        match result {
            Ok(reply) => {
                let updated = serde_json::from_value::<UserMission>(reply).ok();
                if let Some(mission) = &updated {
                    self.write().replace_user_mission(mission.clone());
                }
                self.cache
                    .invalidate_all(&[QueryKey::UserMissions, QueryKey::UserNfts]);
                self.notifier.success(success);
                Ok(updated)
            }
            Err(err) => {
                self.notifier.error(err.user_message(fallback));
                Err(err)
            }
        }
    }

    /// Refetch whatever has never been fetched or was invalidated
    pub async fn refresh_stale(&self) -> Result<()> {
        if self.cache.needs_fetch(QueryKey::Missions) {
            self.fetch_missions().await?;
        }
        if self.cache.needs_fetch(QueryKey::UserMissions) {
            self.fetch_user_missions().await?;
        }
        Ok(())
    }

    /// Drop every cached collection
    pub fn reset(&self) {
        *self.write() = MissionState::default();
    }
}
