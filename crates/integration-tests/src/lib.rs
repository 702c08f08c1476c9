//! Integration tests for the Skecho storefront client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p skecho-integration-tests
//! ```
//!
//! No network is involved: [`FakeIdentityProvider`] and [`FakeMarketplace`]
//! stand in for the two external collaborators. The marketplace records every
//! call, can fail reads or writes on demand, and can hold cart fetches for a
//! user until the test releases them.

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use skecho_core::{CartId, CartItemId, Price, ProductId, SellerProfileId, UserId};
use skecho_storefront::Storefront;
use skecho_storefront::api::{ApiError, MarketplaceApi};
use skecho_storefront::config::StorefrontConfig;
use skecho_storefront::identity::{
    Credential, Identity, IdentityError, IdentityNotifier, IdentityProvider, IdentitySubscription,
};
use skecho_storefront::models::{
    Cart, CartItem, CompleteProfileRequest, ProductSnapshot, SellerProfile, SellerProfileRequest,
    UserProfile,
};
use tokio::sync::Semaphore;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

// =============================================================================
// Identity provider
// =============================================================================

/// Identity provider driven by the test.
///
/// Nothing is published until the test calls [`sign_in`](Self::sign_in),
/// [`sign_out`](Self::sign_out) or [`fail`](Self::fail).
#[derive(Default)]
pub struct FakeIdentityProvider {
    current: Mutex<Option<Identity>>,
    notifiers: Mutex<Vec<IdentityNotifier>>,
}

impl FakeIdentityProvider {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sign_in(&self, uid: &str) {
        self.publish(Some(Identity::new(uid)));
    }

    pub fn sign_out(&self) {
        self.publish(None);
    }

    /// Report a provider failure. The credential stays whatever it was.
    pub fn fail(&self, message: &str) {
        self.broadcast(&Err(IdentityError::Unavailable(message.to_string())));
    }

    /// Whether any subscription is still open.
    #[must_use]
    pub fn has_subscribers(&self) -> bool {
        lock(&self.notifiers)
            .iter()
            .any(|notifier| !notifier.is_closed())
    }

    fn publish(&self, identity: Option<Identity>) {
        *lock(&self.current) = identity.clone();
        self.broadcast(&Ok(identity));
    }

    fn broadcast(&self, change: &Result<Option<Identity>, IdentityError>) {
        for notifier in lock(&self.notifiers).iter() {
            notifier.notify(change.clone());
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    fn subscribe(&self) -> IdentitySubscription {
        let (notifier, subscription) = IdentitySubscription::channel();
        lock(&self.notifiers).push(notifier);
        subscription
    }

    async fn credential(&self) -> Result<Credential, IdentityError> {
        lock(&self.current)
            .as_ref()
            .map(|identity| {
                Credential::new(identity.uid.clone(), format!("token-{}", identity.uid))
            })
            .ok_or(IdentityError::NotSignedIn)
    }
}

// =============================================================================
// Marketplace backend
// =============================================================================

/// One backend call, attributed to the user whose token made it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateUser(String),
    UserProfile(String),
    CompleteProfile(String),
    SellerProfile(String),
    CreateSellerProfile(String),
    Cart(String),
    AddItem(String, String, u32),
    UpdateItem(String, String, u32),
    RemoveItem(String, String),
    ClearCart(String),
}

impl Call {
    /// Whether this call changes server state.
    #[must_use]
    pub const fn is_write(&self) -> bool {
        !matches!(self, Self::UserProfile(_) | Self::SellerProfile(_) | Self::Cart(_))
    }
}

#[derive(Default)]
struct Backend {
    products: HashMap<String, ProductSnapshot>,
    profiles: HashMap<String, UserProfile>,
    sellers: HashMap<String, SellerProfile>,
    carts: HashMap<String, Cart>,
    calls: Vec<Call>,
    held_carts: HashMap<String, Arc<Semaphore>>,
    held_profiles: HashMap<String, Arc<Semaphore>>,
    fail_cart_reads: bool,
    fail_profile_reads: bool,
    fail_writes: bool,
    next_item: u32,
}

impl Backend {
    fn cart_mut(&mut self, uid: &str) -> &mut Cart {
        self.carts
            .entry(uid.to_string())
            .or_insert_with(|| empty_cart(uid))
    }
}

fn empty_cart(uid: &str) -> Cart {
    Cart {
        id: CartId::new(format!("cart-{uid}")),
        items: Vec::new(),
    }
}

fn unavailable() -> ApiError {
    ApiError::Api {
        status: 503,
        message: "service unavailable".to_string(),
    }
}

/// In-memory marketplace keyed by user id.
#[derive(Default)]
pub struct FakeMarketplace {
    backend: Mutex<Backend>,
}

/// Releases held fetches for one user.
#[derive(Clone)]
pub struct FetchHold(Arc<Semaphore>);

impl FetchHold {
    /// Let `n` held fetches complete.
    pub fn release(&self, n: usize) {
        self.0.add_permits(n);
    }
}

impl FakeMarketplace {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_product(&self, id: &str, name: &str, price_cents: i64, available: u32) {
        let product = ProductSnapshot::new(id, name, Price::from_cents(price_cents), available)
            .with_seller_name("Ana Lee");
        lock(&self.backend).products.insert(id.to_string(), product);
    }

    /// Put a line for `product_id` directly into a user's server cart.
    pub fn seed_cart_line(&self, uid: &str, item_id: &str, product_id: &str, quantity: u32) {
        let mut backend = lock(&self.backend);
        let product = backend
            .products
            .get(product_id)
            .cloned()
            .expect("seeded product exists");
        backend.cart_mut(uid).items.push(CartItem {
            id: CartItemId::new(item_id),
            quantity,
            product,
        });
    }

    /// Register a user with a profile. `complete` fills phone and address.
    pub fn add_user(&self, uid: &str, complete: bool, is_seller: bool) {
        let profile = UserProfile {
            id: UserId::new(format!("user-{uid}")),
            name: Some(uid.to_string()),
            email: Some(format!("{uid}@example.com")),
            phone_number: complete.then(|| "5551234567".to_string()),
            address: complete.then(|| "1 Quay St".to_string()),
            is_seller,
        };
        lock(&self.backend).profiles.insert(uid.to_string(), profile);
    }

    pub fn add_seller_profile(&self, uid: &str, artist_name: &str) {
        let seller = SellerProfile {
            id: SellerProfileId::new(format!("seller-{uid}")),
            artist_name: Some(artist_name.to_string()),
            bio: None,
        };
        lock(&self.backend).sellers.insert(uid.to_string(), seller);
    }

    /// Hold every cart fetch for `uid` until released.
    #[must_use]
    pub fn hold_cart_fetches(&self, uid: &str) -> FetchHold {
        let semaphore = Arc::new(Semaphore::new(0));
        lock(&self.backend)
            .held_carts
            .insert(uid.to_string(), Arc::clone(&semaphore));
        FetchHold(semaphore)
    }

    /// Hold every user profile fetch for `uid` until released.
    #[must_use]
    pub fn hold_profile_fetches(&self, uid: &str) -> FetchHold {
        let semaphore = Arc::new(Semaphore::new(0));
        lock(&self.backend)
            .held_profiles
            .insert(uid.to_string(), Arc::clone(&semaphore));
        FetchHold(semaphore)
    }

    pub fn fail_cart_reads(&self, fail: bool) {
        lock(&self.backend).fail_cart_reads = fail;
    }

    pub fn fail_profile_reads(&self, fail: bool) {
        lock(&self.backend).fail_profile_reads = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        lock(&self.backend).fail_writes = fail;
    }

    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        lock(&self.backend).calls.clone()
    }

    #[must_use]
    pub fn writes(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_write).collect()
    }

    pub fn clear_calls(&self) {
        lock(&self.backend).calls.clear();
    }

    /// The server-side cart of `uid`.
    #[must_use]
    pub fn server_cart(&self, uid: &str) -> Cart {
        lock(&self.backend)
            .carts
            .get(uid)
            .cloned()
            .unwrap_or_else(|| empty_cart(uid))
    }

    /// Resolve the bearer token to a user and record the call.
    fn record(&self, credential: &Credential, call: impl FnOnce(String) -> Call) -> String {
        let uid = credential
            .token()
            .strip_prefix("token-")
            .unwrap_or_default()
            .to_string();
        lock(&self.backend).calls.push(call(uid.clone()));
        uid
    }

    async fn wait_if_held(
        &self,
        hold: impl FnOnce(&Backend) -> Option<Arc<Semaphore>>,
    ) -> Result<(), ApiError> {
        let held = hold(&lock(&self.backend));
        if let Some(semaphore) = held {
            semaphore
                .acquire()
                .await
                .map_err(|_| unavailable())?
                .forget();
        }
        Ok(())
    }

    fn write(
        &self,
        uid: &str,
        apply: impl FnOnce(&mut Backend) -> Result<(), ApiError>,
    ) -> Result<(), ApiError> {
        let mut backend = lock(&self.backend);
        if backend.fail_writes {
            return Err(unavailable());
        }
        if !backend.profiles.contains_key(uid) {
            return Err(ApiError::Unauthorized);
        }
        apply(&mut backend)
    }

    fn read_profile<T>(
        &self,
        read: impl FnOnce(&Backend) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let backend = lock(&self.backend);
        if backend.fail_profile_reads {
            return Err(unavailable());
        }
        read(&backend)
    }
}

#[async_trait]
impl MarketplaceApi for FakeMarketplace {
    async fn create_user(&self, credential: &Credential) -> Result<(), ApiError> {
        let uid = self.record(credential, Call::CreateUser);
        let mut backend = lock(&self.backend);
        if backend.fail_writes {
            return Err(unavailable());
        }
        backend
            .profiles
            .entry(uid.clone())
            .or_insert_with(|| UserProfile {
                id: UserId::new(format!("user-{uid}")),
                name: None,
                email: None,
                phone_number: None,
                address: None,
                is_seller: false,
            });
        Ok(())
    }

    async fn user_profile(&self, credential: &Credential) -> Result<UserProfile, ApiError> {
        let uid = self.record(credential, Call::UserProfile);
        self.wait_if_held(|backend| backend.held_profiles.get(&uid).cloned())
            .await?;
        self.read_profile(|backend| {
            backend
                .profiles
                .get(&uid)
                .cloned()
                .ok_or_else(|| ApiError::NotFound("/user/profile".to_string()))
        })
    }

    async fn complete_user_profile(
        &self,
        credential: &Credential,
        request: &CompleteProfileRequest,
    ) -> Result<(), ApiError> {
        let uid = self.record(credential, Call::CompleteProfile);
        self.write(&uid, |backend| {
            if let Some(profile) = backend.profiles.get_mut(&uid) {
                profile.phone_number = Some(request.phone_number().to_string());
                profile.address = Some(request.address().to_string());
            }
            Ok(())
        })
    }

    async fn seller_profile(
        &self,
        credential: &Credential,
    ) -> Result<Option<SellerProfile>, ApiError> {
        let uid = self.record(credential, Call::SellerProfile);
        self.read_profile(|backend| Ok(backend.sellers.get(&uid).cloned()))
    }

    async fn create_seller_profile(
        &self,
        credential: &Credential,
        request: &SellerProfileRequest,
    ) -> Result<(), ApiError> {
        let uid = self.record(credential, Call::CreateSellerProfile);
        self.write(&uid, |backend| {
            backend.sellers.insert(
                uid.clone(),
                SellerProfile {
                    id: SellerProfileId::new(format!("seller-{uid}")),
                    artist_name: Some(request.artist_name().to_string()),
                    bio: request.bio().map(str::to_owned),
                },
            );
            if let Some(profile) = backend.profiles.get_mut(&uid) {
                profile.is_seller = true;
            }
            Ok(())
        })
    }

    async fn cart(&self, credential: &Credential) -> Result<Cart, ApiError> {
        let uid = self.record(credential, Call::Cart);

        self.wait_if_held(|backend| backend.held_carts.get(&uid).cloned())
            .await?;

        let backend = lock(&self.backend);
        if backend.fail_cart_reads {
            return Err(unavailable());
        }
        Ok(backend
            .carts
            .get(&uid)
            .cloned()
            .unwrap_or_else(|| empty_cart(&uid)))
    }

    async fn add_cart_item(
        &self,
        credential: &Credential,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), ApiError> {
        let uid = self.record(credential, |uid| {
            Call::AddItem(uid, product_id.to_string(), quantity)
        });
        self.write(&uid, |backend| {
            let product = backend
                .products
                .get(product_id.as_str())
                .cloned()
                .ok_or_else(|| ApiError::NotFound(format!("/products/{product_id}")))?;
            backend.next_item += 1;
            let item_id = CartItemId::new(format!("item-{}", backend.next_item));
            let cart = backend.cart_mut(&uid);
            match cart.items.iter_mut().find(|line| line.product.id == *product_id) {
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
        let uid = self.record(credential, |uid| {
            Call::UpdateItem(uid, item_id.to_string(), quantity)
        });
        self.write(&uid, |backend| {
            let line = backend
                .cart_mut(&uid)
                .items
                .iter_mut()
                .find(|line| line.id == *item_id)
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
        let uid = self.record(credential, |uid| Call::RemoveItem(uid, item_id.to_string()));
        self.write(&uid, |backend| {
            backend.cart_mut(&uid).items.retain(|line| line.id != *item_id);
            Ok(())
        })
    }

    async fn clear_cart(&self, credential: &Credential) -> Result<(), ApiError> {
        let uid = self.record(credential, Call::ClearCart);
        self.write(&uid, |backend| {
            backend.cart_mut(&uid).items.clear();
            Ok(())
        })
    }
}

// =============================================================================
// Harness
// =============================================================================

/// A started [`Storefront`] wired to the fakes.
pub struct TestContext {
    pub identity: Arc<FakeIdentityProvider>,
    pub api: Arc<FakeMarketplace>,
    pub storefront: Storefront,
}

impl TestContext {
    /// Start a storefront over a marketplace with a small catalogue.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start() -> Self {
        let identity = FakeIdentityProvider::new();
        let api = FakeMarketplace::new();
        api.add_product("7", "Harbour at Dusk", 4500, 5);
        api.add_product("9", "Kelp Study", 2000, 2);

        let config = StorefrontConfig::new("http://marketplace.test/api").expect("valid test URL");
        let storefront = Storefront::start(
            config,
            Arc::clone(&identity) as Arc<dyn IdentityProvider>,
            Arc::clone(&api) as Arc<dyn MarketplaceApi>,
        );

        Self {
            identity,
            api,
            storefront,
        }
    }

    /// Sign in and wait until the session and the cart mirror belong to `uid`.
    pub async fn sign_in(&self, uid: &str) {
        self.identity.sign_in(uid);
        self.settle(|storefront| {
            storefront.session().session().uid().map(|u| u.as_str()) == Some(uid)
                && storefront
                    .cart_store()
                    .state()
                    .owner
                    .is_some_and(|owner| owner.as_str() == uid)
                && !storefront.cart_store().state().loading
        })
        .await;
    }

    /// Wait until `done` holds, polling. Panics after two seconds.
    pub async fn settle(&self, done: impl Fn(&Storefront) -> bool) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !done(&self.storefront) {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("storefront did not settle in time");
    }
}
