//! Profile records, completion state and completion-form input.

use serde::{Deserialize, Serialize};
use skecho_core::{Completion, PhoneError, PhoneNumber, SellerProfileId, UserId};
use thiserror::Error;

/// The base user profile (`GET /user/profile`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    /// Whether the user has elected the seller role.
    #[serde(default)]
    pub is_seller: bool,
}

impl UserProfile {
    /// A user profile is complete once delivery contact details are present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        is_filled(self.phone_number.as_deref()) && is_filled(self.address.as_deref())
    }
}

/// A seller profile (`GET /seller/profile`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerProfile {
    pub id: SellerProfileId,
    #[serde(default)]
    pub artist_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

impl SellerProfile {
    /// A seller profile is complete once it has a public artist name.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        is_filled(self.artist_name.as_deref())
    }
}

fn is_filled(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

/// Two-stage profile completion for the current identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProfileCompletionState {
    /// Base user profile stage.
    pub user: Completion,
    /// Seller profile stage. Only consulted for seller-only routes.
    pub seller: Completion,
    /// Whether the user record carries the seller role.
    pub is_seller: bool,
}

impl ProfileCompletionState {
    /// Nothing known: no identity, or not checked yet.
    pub const UNKNOWN: Self = Self {
        user: Completion::Unknown,
        seller: Completion::Unknown,
        is_seller: false,
    };

    /// True only when the user profile is verified complete.
    #[must_use]
    pub const fn is_user_profile_complete(&self) -> bool {
        self.user.is_complete()
    }

    /// True only when the seller profile is verified complete.
    #[must_use]
    pub const fn is_seller_profile_complete(&self) -> bool {
        self.seller.is_complete()
    }
}

/// Local validation failures of profile-completion input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProfileInputError {
    #[error("invalid phone number: {0}")]
    InvalidPhone(#[from] PhoneError),

    #[error("delivery address cannot be empty")]
    BlankAddress,

    #[error("artist name cannot be empty")]
    BlankArtistName,
}

/// Body of `POST /user/complete-profile`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteProfileRequest {
    phone_number: PhoneNumber,
    address: String,
}

impl CompleteProfileRequest {
    /// Validate form input.
    ///
    /// # Errors
    ///
    /// Returns an error if the phone number is not ten digits or the address
    /// is blank.
    pub fn new(phone_number: &str, address: &str) -> Result<Self, ProfileInputError> {
        let phone_number = PhoneNumber::parse(phone_number)?;
        let address = address.trim();
        if address.is_empty() {
            return Err(ProfileInputError::BlankAddress);
        }
        Ok(Self {
            phone_number,
            address: address.to_owned(),
        })
    }

    #[must_use]
    pub const fn phone_number(&self) -> &PhoneNumber {
        &self.phone_number
    }

    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }
}

/// Body of `POST /seller/profile`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerProfileRequest {
    artist_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    bio: Option<String>,
}

impl SellerProfileRequest {
    /// Validate form input. A blank bio is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the artist name is blank.
    pub fn new(artist_name: &str, bio: Option<&str>) -> Result<Self, ProfileInputError> {
        let artist_name = artist_name.trim();
        if artist_name.is_empty() {
            return Err(ProfileInputError::BlankArtistName);
        }
        Ok(Self {
            artist_name: artist_name.to_owned(),
            bio: bio
                .map(str::trim)
                .filter(|b| !b.is_empty())
                .map(str::to_owned),
        })
    }

    #[must_use]
    pub fn artist_name(&self) -> &str {
        &self.artist_name
    }

    #[must_use]
    pub fn bio(&self) -> Option<&str> {
        self.bio.as_deref()
    }
}
