//! HTTP client for the CarbonCare backend
//!
//! Every request carries the persisted bearer token. A 401 from any endpoint
//! signs the user out locally: the token and user id are removed from the
//! credential store, the navigator is sent to the login view and the hook
//! registered with [`ApiClient::on_unauthorized`] runs.

use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, error, warn};
use url::Url;

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::fetch::{Fetch, FetchBuilder};
use crate::navigation::{Navigator, Route};
use crate::storage::{CredentialStore, TOKEN_KEY, USER_ID_KEY};

/// Reply of the `/health` endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

type UnauthorizedHook = Box<dyn Fn() + Send + Sync>;

/// Client for the CarbonCare REST API
pub struct ApiClient {
    base_url: Url,
    proxied: bool,
    http: Client,
    credentials: Arc<dyn CredentialStore>,
    navigator: Arc<Navigator>,
    on_unauthorized: RwLock<Option<UnauthorizedHook>>,
}

impl ApiClient {
    /// Create a new ApiClient
    pub fn new(
        config: &AppConfig,
        credentials: Arc<dyn CredentialStore>,
        navigator: Arc<Navigator>,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| Error::config(format!("failed to build HTTP client: {}", err)))?;

        Ok(Self {
            base_url: config.base_url()?,
            proxied: config.proxied(),
            http,
            credentials,
            navigator,
            on_unauthorized: RwLock::new(None),
        })
    }

    /// Run `hook` after every 401, once the credentials are cleared.
    ///
    /// Replaces any hook registered before. The hook must not issue requests.
    pub fn on_unauthorized<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self
            .on_unauthorized
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Box::new(hook));
    }

    /// The URL request paths are appended to
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    /// Issue a GET request and decode the JSON reply
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path);
        self.send(Fetch::get(&self.http, &url)).await
    }

    /// Issue a POST request with a JSON body and decode the JSON reply
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path);
        let fetch = Fetch::post(&self.http, &url).json(body)?;
        self.send(fetch).await
    }

    /// Issue a POST request without a body and decode the JSON reply
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path);
        self.send(Fetch::post(&self.http, &url)).await
    }

    /// Check that the backend is up
    pub async fn health(&self) -> Result<HealthStatus> {
        self.get("/health").await
    }

    async fn send<T: DeserializeOwned>(&self, fetch: FetchBuilder<'_>) -> Result<T> {
        let fetch = match self.credentials.get(TOKEN_KEY).await? {
            Some(token) => fetch.bearer_auth(&token),
            None => fetch,
        };
        let method = fetch.method().clone();
        let url = fetch.url().to_string();
        debug!(%method, %url, "request");

        let response = match fetch.execute_raw().await {
            Ok(response) => response,
            Err(err) => {
                self.log_transport_failure(&url, &err);
                return Err(err);
            }
        };

        let status = response.status();
        let bytes = response.bytes().await?;

        if status == StatusCode::UNAUTHORIZED {
            self.handle_unauthorized().await;
            return Err(Error::Unauthorized(server_message(&bytes)));
        }

        if !status.is_success() {
            let message = server_message(&bytes);
            debug!(%method, %url, status = status.as_u16(), %message, "request rejected");
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };
        Ok(serde_json::from_slice(body)?)
    }

    async fn handle_unauthorized(&self) {
        warn!("received 401, clearing credentials");
        for key in [TOKEN_KEY, USER_ID_KEY] {
            if let Err(err) = self.credentials.remove(key).await {
                error!(key, error = %err, "failed to clear credential");
            }
        }
        self.navigator.navigate(Route::Login);

        if let Some(hook) = self
            .on_unauthorized
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            hook();
        }
    }

    fn log_transport_failure(&self, url: &str, err: &Error) {
        error!(%url, error = %err, "network error, no response from server");
        if self.proxied {
            warn!("check that the development server is running and proxying the API path");
        } else {
            warn!("check that the backend is running and allows requests from this origin");
        }
    }
}

/// The human-readable part of an error reply.
///
/// The backend answers `{"error": ...}` while some handlers use
/// `{"message": ...}`; plain-text bodies are passed through. Anything else
/// yields an empty message so callers fall back to their own wording.
pub(crate) fn server_message(body: &[u8]) -> String {
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(value) => ["message", "error"]
            .iter()
            .find_map(|field| value.get(*field).and_then(|v| v.as_str()))
            .unwrap_or_default()
            .to_string(),
        Err(_) => String::from_utf8_lossy(body).trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_message_reads_known_fields() {
        assert_eq!(
            server_message(br#"{"message":"mission already taken"}"#),
            "mission already taken"
        );
        assert_eq!(server_message(br#"{"error":"invalid user id"}"#), "invalid user id");
        assert_eq!(server_message(b"  plain failure \n"), "plain failure");
        assert_eq!(server_message(b""), "");
        assert_eq!(server_message(br#"{"code":7}"#), "");
    }
}
