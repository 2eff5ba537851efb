//! Error handling for the CarbonCare client

use std::fmt;
use thiserror::Error;

/// Unified error type for the CarbonCare client
#[derive(Error, Debug)]
pub enum Error {
    /// The request never produced a response (connection refused, DNS, timeout, CORS proxy down)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered 401; local credentials have already been cleared
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Any other non-success status reported by the server
    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        message: String,
    },

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// JWT errors
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// Credential store I/O errors
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A user-scoped query was issued without a persisted user id
    #[error("Not logged in")]
    NotLoggedIn,

    /// General errors
    #[error("{0}")]
    General(String),
}

/// Coarse category of an [`Error`], as surfaced to users
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No response was received
    Network,
    /// Credentials were rejected
    Unauthorized,
    /// The server rejected the request (4xx)
    Validation,
    /// The server failed (5xx)
    Server,
    /// Anything else
    Other,
}

impl Error {
    /// Create a new configuration error
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Error::Config(msg.to_string())
    }

    /// Create a new general error
    pub fn general<T: fmt::Display>(msg: T) -> Self {
        Error::General(msg.to_string())
    }

    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Network(_) => ErrorKind::Network,
            Error::Unauthorized(_) => ErrorKind::Unauthorized,
            Error::Api { status, .. } if *status >= 500 => ErrorKind::Server,
            Error::Api { .. } => ErrorKind::Validation,
            _ => ErrorKind::Other,
        }
    }

    /// Whether this is a 401 from the server
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Unauthorized(_))
    }

    /// The message to show a user: the server-supplied one when there is one, `fallback` otherwise.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Error::Api { message, .. } | Error::Unauthorized(message) if !message.is_empty() => {
                message.clone()
            }
            _ => fallback.to_string(),
        }
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_split_into_validation_and_server() {
        let bad_request = Error::Api {
            status: 400,
            message: "email already used".to_string(),
        };
        let internal = Error::Api {
            status: 502,
            message: String::new(),
        };

        assert_eq!(bad_request.kind(), ErrorKind::Validation);
        assert_eq!(internal.kind(), ErrorKind::Server);
        assert_eq!(Error::NotLoggedIn.kind(), ErrorKind::Other);
    }

    #[test]
    fn user_message_prefers_server_text() {
        let err = Error::Api {
            status: 400,
            message: "not enough points".to_string(),
        };
        assert_eq!(err.user_message("Redeem failed"), "not enough points");

        let empty = Error::Unauthorized(String::new());
        assert_eq!(empty.user_message("Login failed"), "Login failed");

        let other = Error::general("boom");
        assert_eq!(other.user_message("Something went wrong"), "Something went wrong");
    }
}
