//! Types for authentication and user profiles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// User profile as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The user ID
    pub id: u64,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub email: String,

    /// Internet Identity principal used when minting assets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ii_principal: Option<String>,

    /// Points balance
    #[serde(default)]
    pub points: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    /// Fields this client does not model
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Reply of the login and register endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: User,

    /// The bearer token
    #[serde(alias = "access_token")]
    pub token: String,
}

/// Login credentials
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Registration form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,

    /// Additional form fields forwarded as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RegisterRequest {
    pub fn new(name: &str, email: &str, password: &str) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            extra: Map::new(),
        }
    }
}
