//! Storefront client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SKECHO_API_BASE_URL` - Base URL of the marketplace REST API (e.g., `https://api.skecho.art/api`)
//!
//! ## Optional
//! - `SKECHO_REQUEST_TIMEOUT_SECS` - Per-request timeout in seconds (default: 10)
//! - `SKECHO_SIGNIN_PATH` - Sign-in route (default: /signin)
//! - `SKECHO_HOME_PATH` - Landing route after sign-in (default: /)
//! - `SKECHO_COMPLETE_PROFILE_PATH` - User profile completion form (default: /complete-profile)
//! - `SKECHO_COMPLETE_SELLER_PROFILE_PATH` - Seller profile completion form (default: /complete-seller-profile)
//! - `SKECHO_SELLER_HOME_PATH` - Landing route after seller onboarding (default: /dashboard)
//! - `SKECHO_USER_ID` / `SKECHO_ID_TOKEN` - Static identity for the CLI (both or neither)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Marketplace REST API configuration
    pub api: ApiConfig,
    /// Well-known navigation targets used by the route guard
    pub navigation: NavigationConfig,
    /// Static identity used when no interactive identity provider is available
    pub identity: Option<StaticIdentityConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Marketplace REST API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL every endpoint path is appended to
    pub base_url: Url,
    /// Timeout applied to each request and to credential retrieval
    pub request_timeout: Duration,
}

/// Navigation targets for redirects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationConfig {
    pub signin_path: String,
    pub home_path: String,
    pub complete_profile_path: String,
    pub complete_seller_profile_path: String,
    pub seller_home_path: String,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            signin_path: "/signin".to_string(),
            home_path: "/".to_string(),
            complete_profile_path: "/complete-profile".to_string(),
            complete_seller_profile_path: "/complete-seller-profile".to_string(),
            seller_home_path: "/dashboard".to_string(),
        }
    }
}

/// Pre-issued identity for non-interactive use.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct StaticIdentityConfig {
    /// Identity provider user id
    pub user_id: String,
    /// Bearer token issued by the identity provider
    pub id_token: SecretString,
}

impl std::fmt::Debug for StaticIdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticIdentityConfig")
            .field("user_id", &self.user_id)
            .field("id_token", &"[REDACTED]")
            .finish()
    }
}

impl StorefrontConfig {
    /// Build a configuration for the given API base URL with all defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the URL is not an absolute
    /// http(s) URL.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api: ApiConfig {
                base_url: parse_base_url("SKECHO_API_BASE_URL", base_url)?,
                request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            },
            navigation: NavigationConfig::default(),
            identity: None,
            sentry_dsn: None,
            sentry_environment: None,
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let base_url = get_required_env("SKECHO_API_BASE_URL")?;
        let timeout_secs = get_env_or_default(
            "SKECHO_REQUEST_TIMEOUT_SECS",
            &DEFAULT_REQUEST_TIMEOUT_SECS.to_string(),
        )
        .parse::<u64>()
        .map_err(|e| {
            ConfigError::InvalidEnvVar("SKECHO_REQUEST_TIMEOUT_SECS".to_string(), e.to_string())
        })?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "SKECHO_REQUEST_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            api: ApiConfig {
                base_url: parse_base_url("SKECHO_API_BASE_URL", &base_url)?,
                request_timeout: Duration::from_secs(timeout_secs),
            },
            navigation: NavigationConfig::from_env()?,
            identity: StaticIdentityConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }
}

impl NavigationConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            signin_path: get_path("SKECHO_SIGNIN_PATH", &defaults.signin_path)?,
            home_path: get_path("SKECHO_HOME_PATH", &defaults.home_path)?,
            complete_profile_path: get_path(
                "SKECHO_COMPLETE_PROFILE_PATH",
                &defaults.complete_profile_path,
            )?,
            complete_seller_profile_path: get_path(
                "SKECHO_COMPLETE_SELLER_PROFILE_PATH",
                &defaults.complete_seller_profile_path,
            )?,
            seller_home_path: get_path("SKECHO_SELLER_HOME_PATH", &defaults.seller_home_path)?,
        })
    }
}

impl StaticIdentityConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        match (
            get_optional_env("SKECHO_USER_ID"),
            get_optional_env("SKECHO_ID_TOKEN"),
        ) {
            (Some(user_id), Some(token)) => Ok(Some(Self {
                user_id,
                id_token: SecretString::from(token),
            })),
            (None, None) => Ok(None),
            (Some(_), None) => Err(ConfigError::MissingEnvVar("SKECHO_ID_TOKEN".to_string())),
            (None, Some(_)) => Err(ConfigError::MissingEnvVar("SKECHO_USER_ID".to_string())),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a route path, which must be absolute.
fn get_path(key: &str, default: &str) -> Result<String, ConfigError> {
    let value = get_env_or_default(key, default);
    validate_path(key, &value)?;
    Ok(value)
}

fn validate_path(key: &str, value: &str) -> Result<(), ConfigError> {
    if value.starts_with('/') {
        Ok(())
    } else {
        Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("route must start with '/' (got {value:?})"),
        ))
    }
}

/// Parse and validate the API base URL.
fn parse_base_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let url =
        Url::parse(value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme {:?}", url.scheme()),
        ));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "URL must have a host".to_string(),
        ));
    }

    Ok(url)
}
