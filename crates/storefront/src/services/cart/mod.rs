//! Server-authoritative cart.
//!
//! [`RemoteCartStore`] mirrors the backend cart of the signed-in user;
//! [`CartMutationFacade`] is the only write path. Every mutation is a remote
//! write followed by a full re-fetch, so the local mirror never holds a state
//! the server did not return.

mod facade;
mod store;

pub use facade::CartMutationFacade;
pub use store::RemoteCartStore;

use skecho_core::CartItemId;
use thiserror::Error;

use crate::api::ApiError;
use crate::identity::IdentityError;

/// Errors from cart reads and mutations.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("no signed-in user")]
    NoSession,

    #[error("quantity must be at least 1")]
    ZeroQuantity,

    #[error("quantity {requested} is not available (at most {available})")]
    InvalidQuantity { requested: u32, available: u32 },

    #[error("cart item {0} not found")]
    ItemNotFound(CartItemId),

    /// Fetching the cart failed; the previous snapshot is kept and marked stale.
    #[error("cart unavailable: {0}")]
    Unavailable(#[source] ApiError),

    /// The remote write failed.
    #[error("cart update failed: {0}")]
    Write(#[source] ApiError),

    #[error("credential unavailable: {0}")]
    Credential(#[from] IdentityError),
}

impl CartError {
    /// Whether the error was raised locally, before any network call.
    #[must_use]
    pub const fn is_rejected_locally(&self) -> bool {
        matches!(
            self,
            Self::NoSession | Self::ZeroQuantity | Self::InvalidQuantity { .. } | Self::ItemNotFound(_)
        )
    }
}
