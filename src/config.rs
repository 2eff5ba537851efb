//! Configuration options for the CarbonCare client

use std::time::Duration;
use tracing::{info, warn};
use url::Url;

use crate::error::{Error, Result};

const ENV_PREFIX: &str = "CARBONCARE_";

/// Variables that must be present for a usable deployment
const REQUIRED_VARS: &[&str] = &["API_URL", "ICP_CANISTER_HOST", "ICP_CANISTER_ID"];

/// Variables that fall back to a default when unset
const OPTIONAL_VARS: &[&str] = &[
    "API_TIMEOUT",
    "APP_NAME",
    "APP_VERSION",
    "ENABLE_ANALYTICS",
    "ENABLE_DEBUG_MODE",
    "SENTRY_DSN",
    "GOOGLE_ANALYTICS_ID",
];

/// The deployment the client runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    /// Parse an environment name; unknown names mean development.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "test" => Environment::Test,
            _ => Environment::Development,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        }
    }
}

/// Feature flags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureFlags {
    pub analytics: bool,
    pub debug_mode: bool,
}

/// Identifiers of third-party services the dashboard talks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceIds {
    /// Internet Computer canister host
    pub canister_host: String,
    /// Internet Computer canister id
    pub canister_id: String,
    pub sentry_dsn: Option<String>,
    pub google_analytics_id: Option<String>,
}

impl Default for ServiceIds {
    fn default() -> Self {
        Self {
            canister_host: "http://localhost:4943".to_string(),
            canister_id: "rrkah-fqaaa-aaaaa-aaaaq-cai".to_string(),
            sentry_dsn: None,
            google_analytics_id: None,
        }
    }
}

/// Configuration options for the CarbonCare client
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Absolute URL of the backend API
    pub api_url: String,

    /// The request timeout
    pub request_timeout: Duration,

    /// The deployment environment
    pub environment: Environment,

    /// Route requests through the development proxy when in development
    pub use_proxy: bool,

    /// Origin of the development server that proxies `proxy_path` to the backend
    pub dev_server_url: String,

    /// Path prefix served by the development proxy
    pub proxy_path: String,

    pub app_name: String,

    pub app_version: String,

    pub features: FeatureFlags,

    pub services: ServiceIds,

    /// How many times a failed read query is retried
    pub retry: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080".to_string(),
            request_timeout: Duration::from_millis(10_000),
            environment: Environment::Development,
            use_proxy: true,
            dev_server_url: "http://localhost:3000".to_string(),
            proxy_path: "/api".to_string(),
            app_name: "carboncare".to_string(),
            app_version: "1.0.0".to_string(),
            features: FeatureFlags::default(),
            services: ServiceIds::default(),
            retry: 1,
        }
    }
}

impl AppConfig {
    /// Create a configuration pointing at `api_url`, defaults elsewhere
    pub fn new(api_url: &str) -> Self {
        Self::default().with_api_url(api_url)
    }

    /// Load configuration from `CARBONCARE_*` environment variables.
    ///
    /// Unset or unparsable values fall back to their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(&format!("{}{}", ENV_PREFIX, name)).filter(|value| !value.trim().is_empty())
        };
        let flag = |name: &str| var(name).map(|value| value == "true").unwrap_or(false);

        let defaults = Self::default();
        let environment = var("ENV")
            .map(|name| Environment::from_name(&name))
            .unwrap_or_default();

        Self {
            api_url: var("API_URL").unwrap_or(defaults.api_url),
            request_timeout: var("API_TIMEOUT")
                .and_then(|ms| ms.parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.request_timeout),
            environment,
            use_proxy: defaults.use_proxy,
            dev_server_url: var("DEV_SERVER_URL").unwrap_or(defaults.dev_server_url),
            proxy_path: defaults.proxy_path,
            app_name: var("APP_NAME").unwrap_or(defaults.app_name),
            app_version: var("APP_VERSION").unwrap_or(defaults.app_version),
            features: FeatureFlags {
                analytics: flag("ENABLE_ANALYTICS"),
                debug_mode: flag("ENABLE_DEBUG_MODE"),
            },
            services: ServiceIds {
                canister_host: var("ICP_CANISTER_HOST").unwrap_or(defaults.services.canister_host),
                canister_id: var("ICP_CANISTER_ID").unwrap_or(defaults.services.canister_id),
                sentry_dsn: var("SENTRY_DSN"),
                google_analytics_id: var("GOOGLE_ANALYTICS_ID"),
            },
            retry: defaults.retry,
        }
    }

    /// Check the process environment for required and optional variables.
    ///
    /// Returns the warnings for unset optional variables, or a configuration
    /// error naming every missing required one.
    pub fn validate_env() -> Result<Vec<String>> {
        Self::validate_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`AppConfig::validate_env`] over an arbitrary variable lookup
    pub fn validate_lookup<F>(lookup: F) -> Result<Vec<String>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let is_set = |name: &str| {
            lookup(&format!("{}{}", ENV_PREFIX, name))
                .map(|value| !value.trim().is_empty())
                .unwrap_or(false)
        };

        let missing: Vec<String> = REQUIRED_VARS
            .iter()
            .filter(|name| !is_set(name))
            .map(|name| format!("{}{}", ENV_PREFIX, name))
            .collect();
        if !missing.is_empty() {
            return Err(Error::config(format!(
                "missing required environment variables: {}",
                missing.join(", ")
            )));
        }

        Ok(OPTIONAL_VARS
            .iter()
            .filter(|name| !is_set(name))
            .map(|name| format!("{}{} is not set, using default value", ENV_PREFIX, name))
            .collect())
    }

    /// The URL every request path is appended to.
    ///
    /// In development with the proxy enabled this is the dev server origin plus
    /// the proxy prefix, so the browser never makes a cross-origin call.
    pub fn base_url(&self) -> Result<Url> {
        let raw = if self.proxied() {
            format!(
                "{}{}",
                self.dev_server_url.trim_end_matches('/'),
                self.proxy_path
            )
        } else {
            self.api_url.clone()
        };
        Ok(Url::parse(&raw)?)
    }

    /// Whether requests go through the development proxy
    pub fn proxied(&self) -> bool {
        self.use_proxy && self.environment == Environment::Development
    }

    /// Log the resolved configuration; only speaks when debug mode is on
    pub fn log_summary(&self) {
        if !self.features.debug_mode {
            return;
        }
        info!(
            app = %self.app_name,
            version = %self.app_version,
            environment = self.environment.as_str(),
            api_url = %self.api_url,
            proxied = self.proxied(),
            timeout_ms = self.request_timeout.as_millis() as u64,
            canister_host = %self.services.canister_host,
            "debug mode enabled"
        );
        if self.features.analytics && self.services.google_analytics_id.is_none() {
            warn!("analytics enabled without a Google Analytics id");
        }
    }

    /// Set the API URL
    pub fn with_api_url(mut self, value: &str) -> Self {
        self.api_url = value.to_string();
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Duration) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the environment
    pub fn with_environment(mut self, value: Environment) -> Self {
        self.environment = value;
        self
    }

    /// Set whether the development proxy is used
    pub fn with_proxy(mut self, value: bool) -> Self {
        self.use_proxy = value;
        self
    }

    /// Set the development server origin
    pub fn with_dev_server_url(mut self, value: &str) -> Self {
        self.dev_server_url = value.to_string();
        self
    }

    /// Set the read retry count
    pub fn with_retry(mut self, value: u32) -> Self {
        self.retry = value;
        self
    }

    /// Set the feature flags
    pub fn with_features(mut self, value: FeatureFlags) -> Self {
        self.features = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn development_uses_proxy_path() {
        let config = AppConfig::default();
        assert_eq!(config.base_url().unwrap().as_str(), "http://localhost:3000/api");
    }

    #[test]
    fn production_goes_direct() {
        let config = AppConfig::new("https://api.carboncare.example")
            .with_environment(Environment::Production);
        assert_eq!(
            config.base_url().unwrap().as_str(),
            "https://api.carboncare.example/"
        );
    }

    #[test]
    fn from_lookup_reads_prefixed_values() {
        let config = AppConfig::from_lookup(lookup(&[
            ("CARBONCARE_API_URL", "https://api.example.org"),
            ("CARBONCARE_API_TIMEOUT", "2500"),
            ("CARBONCARE_ENV", "production"),
            ("CARBONCARE_ENABLE_DEBUG_MODE", "true"),
            ("CARBONCARE_SENTRY_DSN", "https://key@sentry.example/1"),
        ]));

        assert_eq!(config.api_url, "https://api.example.org");
        assert_eq!(config.request_timeout, Duration::from_millis(2500));
        assert_eq!(config.environment, Environment::Production);
        assert!(config.features.debug_mode);
        assert!(!config.features.analytics);
        assert_eq!(
            config.services.sentry_dsn.as_deref(),
            Some("https://key@sentry.example/1")
        );
        assert_eq!(config.services.canister_id, "rrkah-fqaaa-aaaaa-aaaaq-cai");
    }

    #[test]
    fn bad_timeout_falls_back_to_default() {
        let config = AppConfig::from_lookup(lookup(&[("CARBONCARE_API_TIMEOUT", "soon")]));
        assert_eq!(config.request_timeout, Duration::from_millis(10_000));
        assert_eq!(config.environment, Environment::Development);
    }

    #[test]
    fn validation_reports_missing_required_vars() {
        let err = AppConfig::validate_lookup(lookup(&[("CARBONCARE_API_URL", "http://x")]))
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("CARBONCARE_ICP_CANISTER_HOST"));
        assert!(message.contains("CARBONCARE_ICP_CANISTER_ID"));
        assert!(!message.contains("CARBONCARE_API_URL"));
    }

    #[test]
    fn validation_warns_about_optional_vars() {
        let warnings = AppConfig::validate_lookup(lookup(&[
            ("CARBONCARE_API_URL", "http://x"),
            ("CARBONCARE_ICP_CANISTER_HOST", "http://ic"),
            ("CARBONCARE_ICP_CANISTER_ID", "abc"),
            ("CARBONCARE_API_TIMEOUT", "1000"),
        ]))
        .unwrap();
        assert_eq!(warnings.len(), OPTIONAL_VARS.len() - 1);
        assert!(warnings[0].starts_with("CARBONCARE_APP_NAME"));
    }
}
