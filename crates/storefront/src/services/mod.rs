//! Coordination services.
//!
//! # Services
//!
//! - `session` - Tracks the signed-in identity and the initial `loading` phase
//! - `profile` - Two-stage profile completion (user, seller) for the identity
//! - `return_path` - Single-slot deferred redirect target for sign-in
//! - `cart` - Remote cart mirror and the mutation facade in front of it
//!
//! # Dependency Order
//!
//! `session` is the root: every processed identity change runs the profile
//! check, and the cart store follows the published session. All services are
//! cheaply cloneable handles; a single instance of each is owned by
//! [`Storefront`](crate::state::Storefront).

pub mod cart;
pub mod profile;
pub mod return_path;
pub mod session;

pub use cart::{CartError, CartMutationFacade, RemoteCartStore};
pub use profile::{ProfileCompletionGate, ProfileError};
pub use return_path::ReturnPathQueue;
pub use session::SessionManager;
