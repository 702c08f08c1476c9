//! Profile registration and completion forms.

use skecho_storefront::Storefront;
use skecho_storefront::guard::ProfileStage;
use skecho_storefront::models::{CompleteProfileRequest, SellerProfileRequest};
use skecho_storefront::services::ProfileError;

use super::CommandError;

/// Register the signed-in user with the backend.
pub async fn register(storefront: &Storefront) -> Result<(), CommandError> {
    let state = storefront.register_user().await?;
    tracing::info!(user_profile = %state.user, "Registered");
    Ok(())
}

/// Submit delivery details.
pub async fn complete(storefront: &Storefront, phone: &str, address: &str) -> Result<(), CommandError> {
    let request = CompleteProfileRequest::new(phone, address).map_err(ProfileError::from)?;
    let state = storefront.profile().submit_user_profile(&request).await?;
    tracing::info!(
        user_profile = %state.user,
        next = %storefront.guard().after_profile_submission(None, ProfileStage::User),
        "Profile submitted"
    );
    Ok(())
}

/// Submit the seller profile.
pub async fn seller(
    storefront: &Storefront,
    artist_name: &str,
    bio: Option<&str>,
) -> Result<(), CommandError> {
    let request = SellerProfileRequest::new(artist_name, bio).map_err(ProfileError::from)?;
    let state = storefront.profile().submit_seller_profile(&request).await?;
    tracing::info!(
        seller_profile = %state.seller,
        next = %storefront.guard().after_profile_submission(None, ProfileStage::Seller),
        "Seller profile submitted"
    );
    Ok(())
}
