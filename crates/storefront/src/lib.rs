//! Skecho storefront client library.
//!
//! Session and cart coordination for the marketplace storefront: tracks the
//! signed-in identity, gates navigation behind profile completion, and keeps
//! a local mirror of the server-authoritative cart. Renders nothing; callers
//! read state and invoke operations through [`Storefront`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
pub mod guard;
pub mod identity;
pub mod models;
pub mod services;
pub mod state;

#[cfg(test)]
mod test_support;

pub use error::{Result, StorefrontError};
pub use state::Storefront;
