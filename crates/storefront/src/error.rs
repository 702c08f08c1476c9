//! Unified error handling with Sentry integration.
//!
//! Each subsystem has its own error enum; [`StorefrontError`] unifies them for
//! callers that drive the whole client (e.g. the CLI). None of these errors is
//! fatal: the worst case is a stale or blocked view until a retry succeeds.

use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::identity::IdentityError;
use crate::services::cart::CartError;
use crate::services::profile::ProfileError;

/// Application-level error type for the storefront client.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Identity provider failed.
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    /// Marketplace API call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Profile completion operation failed.
    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),
}

/// Result type alias for `StorefrontError`.
pub type Result<T> = std::result::Result<T, StorefrontError>;

/// Report a backend/transport failure to Sentry and the log.
///
/// Expected client-side conditions (401, 404, rate limits) are not reported.
pub fn report_api_error(context: &str, error: &ApiError) {
    if error.is_server_error() {
        let event_id = sentry::capture_error(error);
        tracing::error!(
            error = %error,
            sentry_event_id = %event_id,
            "{context} failed"
        );
    } else {
        tracing::warn!(error = %error, "{context} failed");
    }
}

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on sign-out to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("product_id", "42")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
