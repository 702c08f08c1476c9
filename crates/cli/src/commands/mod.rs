//! CLI command implementations.
//!
//! Results are reported through `tracing` at info level.

pub mod cart;
pub mod profile;
pub mod status;

use skecho_storefront::StorefrontError;
use skecho_storefront::services::{CartError, ProfileError};
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Storefront(#[from] StorefrontError),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Cart(#[from] CartError),
}
