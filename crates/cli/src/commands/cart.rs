//! Cart commands.

use skecho_core::{CartItemId, ProductId};
use skecho_storefront::Storefront;
use skecho_storefront::models::{Cart, Session};
use skecho_storefront::services::CartError;

use super::CommandError;

/// Fetch the cart for the session before running a cart command.
pub async fn load(storefront: &Storefront, session: &Session) -> Result<(), CommandError> {
    if storefront.cart_store().fetch(session.identity()).await?.is_none() {
        return Err(CartError::NoSession.into());
    }
    Ok(())
}

pub fn show(storefront: &Storefront) {
    match storefront.current_cart() {
        Some(cart) => log_cart(&cart),
        None => tracing::info!("No cart"),
    }
}

pub async fn add(storefront: &Storefront, product_id: &str, quantity: u32) -> Result<(), CommandError> {
    let cart = storefront
        .cart()
        .add(&ProductId::new(product_id), quantity)
        .await?;
    log_cart(&cart);
    Ok(())
}

pub async fn set(storefront: &Storefront, item_id: &str, quantity: u32) -> Result<(), CommandError> {
    let cart = storefront
        .cart()
        .set_quantity(&CartItemId::new(item_id), quantity)
        .await?;
    log_cart(&cart);
    Ok(())
}

pub async fn remove(storefront: &Storefront, item_id: &str) -> Result<(), CommandError> {
    let cart = storefront.cart().remove(&CartItemId::new(item_id)).await?;
    log_cart(&cart);
    Ok(())
}

pub async fn clear(storefront: &Storefront) -> Result<(), CommandError> {
    let cart = storefront.cart().clear().await?;
    log_cart(&cart);
    Ok(())
}

fn log_cart(cart: &Cart) {
    for item in &cart.items {
        tracing::info!(
            item_id = %item.id,
            product_id = %item.product.id,
            name = %item.product.name,
            seller = item.product.seller_name(),
            quantity = item.quantity,
            available = item.product.available_quantity,
            line_total = %item.line_total(),
            "Cart line"
        );
    }
    tracing::info!(
        cart_id = %cart.id,
        total_items = cart.total_items(),
        subtotal = %cart.subtotal(),
        "Cart"
    );
}
