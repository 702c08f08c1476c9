//! In-memory doubles of the identity provider and the marketplace API for
//! unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use skecho_core::{CartId, CartItemId, Price, ProductId, SellerProfileId, UserId};

use crate::api::{ApiError, MarketplaceApi};
use crate::identity::{
    Credential, Identity, IdentityError, IdentityNotifier, IdentityProvider, IdentitySubscription,
};
use crate::models::{
    Cart, CartItem, CompleteProfileRequest, ProductSnapshot, SellerProfile, SellerProfileRequest,
    UserProfile,
};

pub const TIMEOUT: Duration = Duration::from_secs(1);

/// Identity provider whose current user is set by the test.
#[derive(Default)]
pub struct MockIdentity {
    current: Mutex<Option<Identity>>,
    notifiers: Mutex<Vec<IdentityNotifier>>,
}

impl MockIdentity {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_current(&self, uid: Option<&str>) {
        *self.current.lock().unwrap() = uid.map(Identity::new);
    }

    /// Change the current user and notify subscribers.
    pub fn switch_to(&self, uid: Option<&str>) {
        self.set_current(uid);
        let identity = self.current.lock().unwrap().clone();
        self.emit(Ok(identity));
    }

    pub fn has_subscribers(&self) -> bool {
        self.notifiers
            .lock()
            .unwrap()
            .iter()
            .any(|notifier| !notifier.is_closed())
    }

    pub fn emit(&self, change: Result<Option<Identity>, IdentityError>) {
        for notifier in self.notifiers.lock().unwrap().iter() {
            notifier.notify(change.clone());
        }
    }
}

#[async_trait]
impl IdentityProvider for MockIdentity {
    fn subscribe(&self) -> IdentitySubscription {
        let (notifier, subscription) = IdentitySubscription::channel();
        self.notifiers.lock().unwrap().push(notifier);
        subscription
    }

    async fn credential(&self) -> Result<Credential, IdentityError> {
        self.current
            .lock()
            .unwrap()
            .as_ref()
            .map(|identity| Credential::new(identity.uid.clone(), identity.uid.as_str()))
            .ok_or(IdentityError::NotSignedIn)
    }
}

#[derive(Default)]
struct MockState {
    profiles: HashMap<String, UserProfile>,
    sellers: HashMap<String, SellerProfile>,
    carts: HashMap<String, Cart>,
    products: HashMap<String, ProductSnapshot>,
    calls: Vec<String>,
    fail_reads: bool,
    fail_writes: bool,
    next_item: u32,
}

/// Backend keyed by bearer token (the token is the uid).
#[derive(Default)]
pub struct MockApi {
    state: Mutex<MockState>,
}

impl MockApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_product(&self, id: &str, price_cents: i64, available: u32) {
        let product =
            ProductSnapshot::new(id, format!("Print {id}"), Price::from_cents(price_cents), available);
        self.state
            .lock()
            .unwrap()
            .products
            .insert(id.to_string(), product);
    }

    pub fn with_cart_line(&self, uid: &str, item_id: &str, product_id: &str, quantity: u32) {
        let mut state = self.state.lock().unwrap();
        let product = state.products.get(product_id).cloned().unwrap();
        let cart = state.carts.entry(uid.to_string()).or_insert_with(|| Cart {
            id: CartId::new(format!("cart-{uid}")),
            items: Vec::new(),
        });
        cart.items.push(CartItem {
            id: CartItemId::new(item_id),
            quantity,
            product,
        });
    }

    pub fn with_profile(&self, uid: &str, complete: bool, is_seller: bool) {
        let profile = UserProfile {
            id: UserId::new(format!("user-{uid}")),
            name: Some(uid.to_string()),
            email: None,
            phone_number: complete.then(|| "5551234567".to_string()),
            address: complete.then(|| "1 Quay St".to_string()),
            is_seller,
        };
        self.state
            .lock()
            .unwrap()
            .profiles
            .insert(uid.to_string(), profile);
    }

    pub fn with_seller(&self, uid: &str, artist_name: &str) {
        let seller = SellerProfile {
            id: SellerProfileId::new(format!("seller-{uid}")),
            artist_name: Some(artist_name.to_string()),
            bio: None,
        };
        self.state
            .lock()
            .unwrap()
            .sellers
            .insert(uid.to_string(), seller);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state.lock().unwrap().fail_reads = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().unwrap().fail_writes = fail;
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    fn unavailable() -> ApiError {
        ApiError::Api {
            status: 503,
            message: "unavailable".to_string(),
        }
    }

    fn read<T>(
        &self,
        call: &str,
        credential: &Credential,
        f: impl FnOnce(&MockState, &str) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("{call} {}", credential.token()));
        if state.fail_reads {
            return Err(Self::unavailable());
        }
        f(&state, credential.token())
    }

    fn write(
        &self,
        call: String,
        credential: &Credential,
        f: impl FnOnce(&mut MockState, &str) -> Result<(), ApiError>,
    ) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("{call} {}", credential.token()));
        if state.fail_writes {
            return Err(Self::unavailable());
        }
        f(&mut state, credential.token())
    }
}

fn cart_of<'a>(state: &'a mut MockState, uid: &str) -> &'a mut Cart {
    state.carts.entry(uid.to_string()).or_insert_with(|| Cart {
        id: CartId::new(format!("cart-{uid}")),
        items: Vec::new(),
    })
}

#[async_trait]
impl MarketplaceApi for MockApi {
    async fn create_user(&self, credential: &Credential) -> Result<(), ApiError> {
        self.write("create_user".to_string(), credential, |_, _| Ok(()))
    }

    async fn user_profile(&self, credential: &Credential) -> Result<UserProfile, ApiError> {
        self.read("user_profile", credential, |state, uid| {
            state
                .profiles
                .get(uid)
                .cloned()
                .ok_or_else(|| ApiError::NotFound("/user/profile".to_string()))
        })
    }

    async fn complete_user_profile(
        &self,
        credential: &Credential,
        request: &CompleteProfileRequest,
    ) -> Result<(), ApiError> {
        self.write("complete_user_profile".to_string(), credential, |state, uid| {
            let profile = state
                .profiles
                .get_mut(uid)
                .ok_or_else(|| ApiError::NotFound("/user/profile".to_string()))?;
            profile.phone_number = Some(request.phone_number().to_string());
            profile.address = Some(request.address().to_string());
            Ok(())
        })
    }

    async fn seller_profile(
        &self,
        credential: &Credential,
    ) -> Result<Option<SellerProfile>, ApiError> {
        self.read("seller_profile", credential, |state, uid| {
            Ok(state.sellers.get(uid).cloned())
        })
    }

    async fn create_seller_profile(
        &self,
        credential: &Credential,
        request: &SellerProfileRequest,
    ) -> Result<(), ApiError> {
        self.write("create_seller_profile".to_string(), credential, |state, uid| {
            state.sellers.insert(
                uid.to_string(),
                SellerProfile {
                    id: SellerProfileId::new(format!("seller-{uid}")),
                    artist_name: Some(request.artist_name().to_string()),
                    bio: request.bio().map(str::to_owned),
                },
            );
            Ok(())
        })
    }

    async fn cart(&self, credential: &Credential) -> Result<Cart, ApiError> {
        self.read("cart", credential, |state, uid| {
            Ok(state.carts.get(uid).cloned().unwrap_or_else(|| Cart {
                id: CartId::new(format!("cart-{uid}")),
                items: Vec::new(),
            }))
        })
    }

    async fn add_cart_item(
        &self,
        credential: &Credential,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), ApiError> {
        self.write(format!("add {product_id}x{quantity}"), credential, |state, uid| {
            let product = state
                .products
                .get(product_id.as_str())
                .cloned()
                .ok_or_else(|| ApiError::NotFound(format!("/products/{product_id}")))?;
            state.next_item += 1;
            let item_id = CartItemId::new(format!("item-{}", state.next_item));
            let cart = cart_of(state, uid);
            match cart.items.iter_mut().find(|i| i.product.id == *product_id) {
                Some(line) => line.quantity += quantity,
                None => cart.items.push(CartItem {
                    id: item_id,
                    quantity,
                    product,
                }),
            }
            Ok(())
        })
    }

    async fn update_cart_item(
        &self,
        credential: &Credential,
        item_id: &CartItemId,
        quantity: u32,
    ) -> Result<(), ApiError> {
        self.write(format!("update {item_id}x{quantity}"), credential, |state, uid| {
            let line = cart_of(state, uid)
                .items
                .iter_mut()
                .find(|i| i.id == *item_id)
                .ok_or_else(|| ApiError::NotFound(format!("/cart/items/{item_id}")))?;
            line.quantity = quantity;
            Ok(())
        })
    }

    async fn remove_cart_item(
        &self,
        credential: &Credential,
        item_id: &CartItemId,
    ) -> Result<(), ApiError> {
        self.write(format!("remove {item_id}"), credential, |state, uid| {
            cart_of(state, uid).items.retain(|i| i.id != *item_id);
            Ok(())
        })
    }

    async fn clear_cart(&self, credential: &Credential) -> Result<(), ApiError> {
        self.write("clear".to_string(), credential, |state, uid| {
            cart_of(state, uid).items.clear();
            Ok(())
        })
    }
}
