//! Marketplace backend REST API.
//!
//! # Architecture
//!
//! - The backend is the source of truth for profiles and carts - NO local
//!   persistence, direct API calls only
//! - Every call is scoped to the caller's bearer credential
//! - [`MarketplaceApi`] is the seam the coordination services depend on;
//!   [`HttpMarketplaceApi`] is the `reqwest` implementation
//!
//! # Endpoints
//!
//! | Method | Path | Purpose |
//! |---|---|---|
//! | POST | `/auth/create-user` | register the signed-in user |
//! | GET | `/user/profile` | base profile |
//! | POST | `/user/complete-profile` | submit delivery details |
//! | GET | `/seller/profile` | seller profile (404 = none) |
//! | POST | `/seller/profile` | create/update seller profile |
//! | GET | `/cart` | authoritative cart |
//! | POST | `/cart/items` | add a product |
//! | PUT | `/cart/items/:id` | change a line quantity |
//! | DELETE | `/cart/items/:id` | remove a line |
//! | DELETE | `/cart` | empty the cart |

mod client;

pub use client::HttpMarketplaceApi;

use async_trait::async_trait;
use skecho_core::{CartItemId, ProductId};
use thiserror::Error;

use crate::identity::Credential;
use crate::models::{Cart, CompleteProfileRequest, SellerProfile, SellerProfileRequest, UserProfile};

/// Errors that can occur when calling the marketplace API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Request exceeded the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// Credential rejected (401/403).
    #[error("Unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Any other non-success response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ApiError {
    /// Whether this failure is on the backend or transport side (worth
    /// reporting), as opposed to an expected client-side condition.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout | Self::Parse(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Unauthorized | Self::NotFound(_) | Self::RateLimited(_) => false,
        }
    }
}

/// The marketplace backend, as seen by the coordination layer.
#[async_trait]
pub trait MarketplaceApi: Send + Sync {
    /// Register (or refresh) the signed-in user on the backend.
    async fn create_user(&self, credential: &Credential) -> Result<(), ApiError>;

    /// Fetch the base user profile.
    async fn user_profile(&self, credential: &Credential) -> Result<UserProfile, ApiError>;

    /// Submit the base profile completion form.
    async fn complete_user_profile(
        &self,
        credential: &Credential,
        request: &CompleteProfileRequest,
    ) -> Result<(), ApiError>;

    /// Fetch the seller profile; `None` when the user has none.
    async fn seller_profile(&self, credential: &Credential)
    -> Result<Option<SellerProfile>, ApiError>;

    /// Submit the seller profile form.
    async fn create_seller_profile(
        &self,
        credential: &Credential,
        request: &SellerProfileRequest,
    ) -> Result<(), ApiError>;

    /// Fetch the authoritative cart.
    async fn cart(&self, credential: &Credential) -> Result<Cart, ApiError>;

    /// Add `quantity` units of a product.
    async fn add_cart_item(
        &self,
        credential: &Credential,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), ApiError>;

    /// Set the quantity of a cart line.
    async fn update_cart_item(
        &self,
        credential: &Credential,
        item_id: &CartItemId,
        quantity: u32,
    ) -> Result<(), ApiError>;

    /// Remove a cart line.
    async fn remove_cart_item(
        &self,
        credential: &Credential,
        item_id: &CartItemId,
    ) -> Result<(), ApiError>;

    /// Remove every line.
    async fn clear_cart(&self, credential: &Credential) -> Result<(), ApiError>;
}
