//! Core types for Skecho.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod completion;
pub mod email;
pub mod id;
pub mod phone;
pub mod price;

pub use completion::Completion;
pub use email::{Email, EmailError};
pub use id::*;
pub use phone::{PhoneError, PhoneNumber};
pub use price::Price;
