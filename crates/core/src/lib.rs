//! Skecho Core - Shared types library.
//!
//! This crate provides common types used across all Skecho components:
//! - `storefront` - Session, profile-completion and cart coordination layer
//! - `cli` - Command-line driver for the storefront layer
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no async.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, phone numbers and
//!   profile completion

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
