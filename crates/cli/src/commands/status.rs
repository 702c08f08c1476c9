//! Session and route inspection.

use skecho_storefront::Storefront;
use skecho_storefront::guard::GuardDecision;
use skecho_storefront::models::Session;

use super::CommandError;

/// Log the session, profile completion and cart summary.
pub async fn show(storefront: &Storefront, session: &Session) -> Result<(), CommandError> {
    let Some(identity) = session.identity() else {
        tracing::info!("Signed out");
        return Ok(());
    };

    let profile = storefront.profile().state();
    tracing::info!(
        uid = %identity.uid,
        email = identity.email.as_ref().map(|e| e.as_str()),
        user_profile = %profile.user,
        seller_profile = %profile.seller,
        is_seller = profile.is_seller,
        "Signed in"
    );

    match storefront.cart_store().fetch(Some(identity)).await? {
        Some(cart) => tracing::info!(
            lines = cart.items.len(),
            total_items = cart.total_items(),
            subtotal = %cart.subtotal(),
            "Cart"
        ),
        None => tracing::info!("No cart"),
    }
    Ok(())
}

/// Log the route decision for `path`.
pub fn guard(storefront: &Storefront, path: &str) {
    match storefront.check_route(path) {
        GuardDecision::Allow => tracing::info!(path, "Allowed"),
        GuardDecision::Pending => tracing::info!(path, "Pending: profile state not yet known"),
        GuardDecision::Redirect(redirect) => tracing::info!(
            path,
            to = %redirect.to,
            from = redirect.continuation.as_ref().map(|c| c.from.as_str()),
            "Redirect"
        ),
    }
}
