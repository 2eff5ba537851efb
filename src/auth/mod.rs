//! Authentication and the signed-in user's session

mod session;
mod types;

use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::cache::{QueryCache, QueryKey};
use crate::error::{Error, Result};
use crate::navigation::{Navigator, Route};
use crate::notify::Notifier;
use crate::storage::{CredentialStore, TOKEN_KEY, USER_ID_KEY};

pub use session::*;
pub use types::*;

/// Holds the signed-in user and drives login, registration and logout
pub struct SessionStore {
    api: Arc<ApiClient>,
    credentials: Arc<dyn CredentialStore>,
    navigator: Arc<Navigator>,
    notifier: Arc<Notifier>,
    cache: Arc<QueryCache>,
    session: RwLock<Session>,
}

impl SessionStore {
    /// Create a new SessionStore in the loading state
    pub(crate) fn new(
        api: Arc<ApiClient>,
        credentials: Arc<dyn CredentialStore>,
        navigator: Arc<Navigator>,
        notifier: Arc<Notifier>,
        cache: Arc<QueryCache>,
    ) -> Self {
        Self {
            api,
            credentials,
            navigator,
            notifier,
            cache,
            session: RwLock::new(Session::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.session.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Session> {
        self.session.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the current session
    pub fn session(&self) -> Session {
        self.read().clone()
    }

    pub fn user(&self) -> Option<User> {
        self.read().user.clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.read().status
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.read().loading()
    }

    /// Restore the session from a persisted token.
    ///
    /// Meant to run once at startup. A missing, expired or rejected token
    /// leaves the session unauthenticated; no notification is shown.
    pub async fn restore(&self) -> SessionStatus {
        self.write().status = SessionStatus::Loading;

        let token = match self.credentials.get(TOKEN_KEY).await {
            Ok(Some(token)) => token,
            Ok(None) => {
                debug!("no persisted token");
                self.write().clear();
                return SessionStatus::Unauthenticated;
            }
            Err(err) => {
                warn!(error = %err, "failed to read persisted token");
                self.write().clear();
                return SessionStatus::Unauthenticated;
            }
        };

        match self.try_restore(token).await {
            Ok(user) => {
                info!(user_id = user.id, "session restored");
                SessionStatus::Authenticated
            }
            Err(err) => {
                info!(error = %err, "session restore failed");
                if let Err(err) = self.credentials.remove(TOKEN_KEY).await {
                    warn!(error = %err, "failed to remove persisted token");
                }
                self.write().clear();
                SessionStatus::Unauthenticated
            }
        }
    }

    async fn try_restore(&self, token: String) -> Result<User> {
        if token_expired(&token)? {
            return Err(Error::general("persisted token has expired"));
        }
        let user: User = self.api.get("/users/profile").await?;
        self.credentials
            .set(USER_ID_KEY, &user.id.to_string())
            .await?;
        self.write().authenticate(user.clone(), token);
        Ok(user)
    }

    /// Sign in with email and password.
    ///
    /// On success the token is persisted and the navigator goes to the
    /// dashboard. On failure the session is cleared and one error
    /// notification is queued. The call is never retried.
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let body = LoginRequest { email, password };
        self.authenticate("/auth/login", &body, "Login successful!", "Login failed")
            .await
    }

    /// Create an account and sign in with it
    pub async fn register(&self, request: &RegisterRequest) -> Result<User> {
        self.authenticate(
            "/auth/register",
            request,
            "Registration successful!",
            "Registration failed",
        )
        .await
    }

    async fn authenticate<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        success: &str,
        fallback: &str,
    ) -> Result<User> {
        self.write().status = SessionStatus::Loading;

        match self.try_authenticate(path, body).await {
            Ok(user) => {
                info!(user_id = user.id, "signed in");
                self.notifier.success(success);
                self.navigator.navigate(Route::Dashboard);
                Ok(user)
            }
            Err(err) => {
                warn!(%path, error = %err, "authentication failed");
                self.write().clear();
                self.notifier.error(err.user_message(fallback));
                Err(err)
            }
        }
    }

    async fn try_authenticate<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<User> {
        let response: AuthResponse = self.api.post(path, body).await?;

        self.credentials.set(TOKEN_KEY, &response.token).await?;
        self.credentials
            .set(USER_ID_KEY, &response.user.id.to_string())
            .await?;
        self.cache.clear();

        self.write()
            .authenticate(response.user.clone(), response.token);
        Ok(response.user)
    }

    /// Sign out: forget the credentials and go back to the home view
    pub async fn logout(&self) -> Result<()> {
        let removed = self.clear_credentials().await;
        self.write().clear();
        self.cache.clear();
        self.navigator.navigate(Route::Home);
        self.notifier.success("Logged out");
        removed
    }

    async fn clear_credentials(&self) -> Result<()> {
        self.credentials.remove(TOKEN_KEY).await?;
        self.credentials.remove(USER_ID_KEY).await
    }

    /// Drop the in-memory session after the server rejected the token.
    ///
    /// The API client has already removed the persisted credentials and
    /// redirected to the login view.
    pub(crate) fn expire(&self) {
        info!("session expired");
        self.write().clear();
    }

    /// Merge `partial` (a JSON object) into the cached user.
    ///
    /// Returns the updated user, or `None` when nobody is signed in.
    pub fn update_user(&self, partial: Value) -> Result<Option<User>> {
        let mut session = self.write();
        let Some(user) = session.user.as_ref() else {
            return Ok(None);
        };
        let merged = merge_user(user, partial)?;
        session.user = Some(merged.clone());
        Ok(Some(merged))
    }

    /// Reload the signed-in user's profile from the server
    pub async fn fetch_profile(&self) -> Result<User> {
        let Some(guard) = self.cache.begin(QueryKey::Profile) else {
            return self.user().ok_or(Error::NotLoggedIn);
        };

        match self
            .cache
            .run(QueryKey::Profile, || self.api.get::<User>("/users/profile"))
            .await
        {
            Ok(user) => {
                let mut session = self.write();
                if guard.succeed() && session.authenticated() {
                    session.user = Some(user.clone());
                }
                Ok(user)
            }
            Err(err) => {
                guard.fail(&err);
                self.notifier.error(err.user_message("Failed to load profile"));
                Err(err)
            }
        }
    }

    /// Refetch the profile if a mutation invalidated it
    pub async fn refresh_stale(&self) -> Result<()> {
        if self.is_authenticated() && self.cache.is_stale(QueryKey::Profile) {
            self.fetch_profile().await?;
        }
        Ok(())
    }
}
