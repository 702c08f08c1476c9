//! Cart types.
//!
//! [`Cart`] is exactly what `GET /cart` returns; it is never patched locally.
//! [`CartState`] is the mirror the store publishes: the last snapshot plus
//! whose it is and whether it is still trustworthy.

use serde::{Deserialize, Serialize};
use skecho_core::{CartId, CartItemId, Price, ProductId, UserUid};

/// The authoritative cart of one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: CartId,
    #[serde(default)]
    pub items: Vec<CartItem>,
}

impl Cart {
    /// Sum of item quantities.
    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.items
            .iter()
            .fold(0_u32, |sum, item| sum.saturating_add(item.quantity))
    }

    /// Whether any line holds the given product.
    #[must_use]
    pub fn contains_product(&self, product_id: &ProductId) -> bool {
        self.items.iter().any(|item| &item.product.id == product_id)
    }

    /// Look up a line by its server-assigned id.
    #[must_use]
    pub fn item(&self, item_id: &CartItemId) -> Option<&CartItem> {
        self.items.iter().find(|item| &item.id == item_id)
    }

    /// Sum of line totals.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.items.iter().map(CartItem::line_total).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// One cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: CartItemId,
    pub quantity: u32,
    pub product: ProductSnapshot,
}

impl CartItem {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price.times(self.quantity)
    }

    /// Whether `quantity` is a legal quantity for this line
    /// (`1..=available stock`).
    #[must_use]
    pub const fn accepts_quantity(&self, quantity: u32) -> bool {
        quantity >= 1 && quantity <= self.product.available_quantity
    }
}

/// Product data embedded in a cart line at fetch time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    pub id: ProductId,
    #[serde(default)]
    pub name: String,
    pub price: Price,
    /// Units in stock. The backend calls this `quantity`.
    #[serde(rename = "quantity")]
    pub available_quantity: u32,
    #[serde(default = "default_available")]
    pub is_available: bool,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    seller: Option<SellerRef>,
}

const fn default_available() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SellerRef {
    user: SellerUser,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SellerUser {
    name: Option<String>,
}

impl ProductSnapshot {
    /// Create a snapshot with no seller and no images.
    #[must_use]
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, price: Price, available: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            available_quantity: available,
            is_available: true,
            images: Vec::new(),
            seller: None,
        }
    }

    /// Attach the seller's display name.
    #[must_use]
    pub fn with_seller_name(mut self, name: impl Into<String>) -> Self {
        self.seller = Some(SellerRef {
            user: SellerUser {
                name: Some(name.into()),
            },
        });
        self
    }

    /// The seller's display name, if the backend included it.
    #[must_use]
    pub fn seller_name(&self) -> Option<&str> {
        self.seller.as_ref().and_then(|s| s.user.name.as_deref())
    }
}

/// Whether the mirrored snapshot reflects the last successful fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Freshness {
    #[default]
    Live,
    /// The latest fetch failed; the snapshot is from an earlier fetch.
    Stale,
}

/// Local mirror of the server cart, as published by the cart store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CartState {
    /// User the snapshot belongs to. `None` means signed out.
    pub owner: Option<UserUid>,
    /// Last fetched cart, `None` while signed out or before the first fetch.
    pub cart: Option<Cart>,
    pub freshness: Freshness,
    /// A fetch for `owner` is in flight.
    pub loading: bool,
    /// Display string of the most recent failure.
    pub last_error: Option<String>,
}

impl CartState {
    /// Empty state for a (possibly absent) owner.
    #[must_use]
    pub const fn empty(owner: Option<UserUid>) -> Self {
        Self {
            owner,
            cart: None,
            freshness: Freshness::Live,
            loading: false,
            last_error: None,
        }
    }

    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.cart.as_ref().map_or(0, Cart::total_items)
    }

    #[must_use]
    pub fn is_in_cart(&self, product_id: &ProductId) -> bool {
        self.cart
            .as_ref()
            .is_some_and(|cart| cart.contains_product(product_id))
    }

    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.freshness == Freshness::Stale
    }
}
