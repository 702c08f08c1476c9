//! Domain models for the storefront client.
//!
//! - [`cart`] - Server-authoritative cart snapshot and its local read model
//! - [`profile`] - User/seller profile records, completion state and form input
//! - [`session`] - Session snapshot published by the session manager

pub mod cart;
pub mod profile;
pub mod session;

pub use cart::{Cart, CartItem, CartState, Freshness, ProductSnapshot};
pub use profile::{
    CompleteProfileRequest, ProfileCompletionState, ProfileInputError, SellerProfile,
    SellerProfileRequest, UserProfile,
};
pub use session::Session;
