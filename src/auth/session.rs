//! Session state for authentication

use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::types::User;
use crate::error::{Error, Result};

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Startup restoration or a login/register call is running
    Loading,
    Authenticated,
    Unauthenticated,
}

/// Session data
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// The signed-in user
    pub user: Option<User>,

    /// The bearer token
    pub token: Option<String>,

    pub status: SessionStatus,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            user: None,
            token: None,
            status: SessionStatus::Loading,
        }
    }
}

impl Session {
    pub fn authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }

    pub fn loading(&self) -> bool {
        self.status == SessionStatus::Loading
    }

    pub fn user_id(&self) -> Option<u64> {
        self.user.as_ref().map(|user| user.id)
    }

    pub(crate) fn authenticate(&mut self, user: User, token: String) {
        self.user = Some(user);
        self.token = Some(token);
        self.status = SessionStatus::Authenticated;
    }

    pub(crate) fn clear(&mut self) {
        self.user = None;
        self.token = None;
        self.status = SessionStatus::Unauthenticated;
    }
}

#[derive(Debug, Deserialize)]
struct Claims {
    exp: Option<i64>,
}

/// Whether `token` is a JWT whose `exp` has passed.
///
/// Tokens that are not JWTs are opaque to the client and never considered
/// expired; only the server can reject them. The signature is not checked.
pub fn token_expired(token: &str) -> Result<bool> {
    let header = match decode_header(token) {
        Ok(header) => header,
        Err(_) => return Ok(false),
    };

    let mut validation = Validation::new(header.alg);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)?;
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs() as i64;

    Ok(data.claims.exp.map(|exp| exp <= now).unwrap_or(false))
}

/// Shallow-merge the fields of `partial` into `user`
pub(crate) fn merge_user(user: &User, partial: Value) -> Result<User> {
    let mut value = serde_json::to_value(user)?;
    match (value.as_object_mut(), partial) {
        (Some(target), Value::Object(fields)) => target.extend(fields),
        (_, other) => {
            return Err(Error::general(format!(
                "user update must be a JSON object, got {}",
                other
            )))
        }
    }
    Ok(serde_json::from_value(value)?)
}
