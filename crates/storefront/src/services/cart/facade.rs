use std::sync::Arc;
use std::time::Duration;

use skecho_core::{CartItemId, ProductId, UserUid};
use tokio::sync::Mutex;
use tracing::instrument;

use super::{CartError, RemoteCartStore};
use crate::api::{ApiError, MarketplaceApi};
use crate::error::{add_breadcrumb, report_api_error};
use crate::identity::{Credential, IdentityProvider, fetch_credential};
use crate::models::Cart;

/// The cart write path.
///
/// Each mutation writes to the backend, then re-fetches the whole cart
/// through the store, even when the write failed. Mutations are queued so a
/// write and its re-fetch never interleave with another mutation.
#[derive(Clone)]
pub struct CartMutationFacade {
    inner: Arc<FacadeInner>,
}

struct FacadeInner {
    store: RemoteCartStore,
    api: Arc<dyn MarketplaceApi>,
    identity: Arc<dyn IdentityProvider>,
    timeout: Duration,
    queue: Mutex<()>,
}

/// A validated remote write.
enum Write<'a> {
    Add(&'a ProductId, u32),
    Update(&'a CartItemId, u32),
    Remove(&'a CartItemId),
    Clear,
}

impl Write<'_> {
    const fn action(&self) -> &'static str {
        match self {
            Self::Add(..) => "Added item",
            Self::Update(..) => "Changed quantity",
            Self::Remove(_) => "Removed item",
            Self::Clear => "Cleared cart",
        }
    }
}

impl CartMutationFacade {
    #[must_use]
    pub fn new(
        store: RemoteCartStore,
        api: Arc<dyn MarketplaceApi>,
        identity: Arc<dyn IdentityProvider>,
        timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(FacadeInner {
                store,
                api,
                identity,
                timeout,
                queue: Mutex::new(()),
            }),
        }
    }

    #[must_use]
    pub fn store(&self) -> &RemoteCartStore {
        &self.inner.store
    }

    /// Add `quantity` units of a product.
    ///
    /// # Errors
    ///
    /// `ZeroQuantity` or `NoSession` before any network call; `Write` if the
    /// backend rejected the write; otherwise the re-fetch result.
    #[instrument(skip(self, product_id), fields(product_id = %product_id))]
    pub async fn add(&self, product_id: &ProductId, quantity: u32) -> Result<Cart, CartError> {
        if quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }
        let _queued = self.inner.queue.lock().await;
        let owner = self.owner()?;
        self.apply(owner, Write::Add(product_id, quantity)).await
    }

    /// Remove a cart line.
    ///
    /// # Errors
    ///
    /// `NoSession` before any network call; otherwise as [`add`](Self::add).
    #[instrument(skip(self, item_id), fields(item_id = %item_id))]
    pub async fn remove(&self, item_id: &CartItemId) -> Result<Cart, CartError> {
        let _queued = self.inner.queue.lock().await;
        let owner = self.owner()?;
        self.apply(owner, Write::Remove(item_id)).await
    }

    /// Set the quantity of a cart line.
    ///
    /// The quantity is checked against the line's product availability in
    /// the current snapshot; out-of-range values and unknown lines never
    /// reach the backend.
    ///
    /// # Errors
    ///
    /// `ZeroQuantity`, `NoSession`, `ItemNotFound` or `InvalidQuantity`
    /// before any network call; otherwise as [`add`](Self::add).
    #[instrument(skip(self, item_id), fields(item_id = %item_id))]
    pub async fn set_quantity(&self, item_id: &CartItemId, quantity: u32) -> Result<Cart, CartError> {
        if quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }
        let _queued = self.inner.queue.lock().await;
        let owner = self.owner()?;

        let state = self.inner.store.state();
        let item = state
            .cart
            .as_ref()
            .and_then(|cart| cart.item(item_id))
            .ok_or_else(|| CartError::ItemNotFound(item_id.clone()))?;
        if !item.accepts_quantity(quantity) {
            tracing::debug!(
                quantity,
                available = item.product.available_quantity,
                "Rejected quantity change"
            );
            return Err(CartError::InvalidQuantity {
                requested: quantity,
                available: item.product.available_quantity,
            });
        }

        self.apply(owner, Write::Update(item_id, quantity)).await
    }

    /// Remove every line.
    ///
    /// # Errors
    ///
    /// `NoSession` before any network call; otherwise as [`add`](Self::add).
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<Cart, CartError> {
        let _queued = self.inner.queue.lock().await;
        let owner = self.owner()?;
        self.apply(owner, Write::Clear).await
    }

    /// Whether any line holds `product_id`, per the current snapshot.
    #[must_use]
    pub fn is_in_cart(&self, product_id: &ProductId) -> bool {
        self.inner.store.is_in_cart(product_id)
    }

    /// Sum of quantities in the current snapshot.
    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.inner.store.total_items()
    }

    fn owner(&self) -> Result<UserUid, CartError> {
        self.inner.store.owner().ok_or(CartError::NoSession)
    }

    async fn apply(&self, owner: UserUid, write: Write<'_>) -> Result<Cart, CartError> {
        add_breadcrumb("cart", write.action(), Some(&[("uid", owner.as_str())]));

        let credential =
            fetch_credential(self.inner.identity.as_ref(), &owner, self.inner.timeout).await?;
        let written = self.send(&credential, &write).await;
        let refetched = self.inner.store.reload(owner).await;

        match written {
            Ok(()) => refetched,
            Err(e) => {
                report_api_error(write.action(), &e);
                Err(CartError::Write(e))
            }
        }
    }

    async fn send(
        &self,
        credential: &Credential,
        write: &Write<'_>,
    ) -> Result<(), ApiError> {
        let api = &self.inner.api;
        match *write {
            Write::Add(product_id, quantity) => {
                api.add_cart_item(credential, product_id, quantity).await
            }
            Write::Update(item_id, quantity) => {
                api.update_cart_item(credential, item_id, quantity).await
            }
            Write::Remove(item_id) => api.remove_cart_item(credential, item_id).await,
            Write::Clear => api.clear_cart(credential).await,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::identity::{Identity, IdentityError};
    use crate::test_support::{MockApi, MockIdentity, TIMEOUT};

    async fn signed_in(uid: &str) -> (Arc<MockApi>, CartMutationFacade) {
        let api = MockApi::new();
        api.with_product("7", 2500, 5);
        api.with_product("9", 4000, 2);
        api.with_cart_line(uid, "item-x", "9", 2);
        let identity = MockIdentity::new();
        identity.set_current(Some(uid));

        let store = RemoteCartStore::new(api.clone(), identity.clone(), TIMEOUT);
        store.fetch(Some(&Identity::new(uid))).await.unwrap();
        api.clear_calls();
        (api.clone(), CartMutationFacade::new(store, api, identity, TIMEOUT))
    }

    #[tokio::test]
    async fn test_set_quantity_beyond_stock_never_reaches_server() {
        let (api, facade) = signed_in("ana").await;

        let err = facade
            .set_quantity(&CartItemId::new("item-x"), 3)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CartError::InvalidQuantity {
                requested: 3,
                available: 2
            }
        ));
        assert!(api.calls().is_empty());
        assert_eq!(facade.total_items(), 2);
    }

    #[tokio::test]
    async fn test_set_quantity_zero_and_unknown_item_rejected() {
        let (api, facade) = signed_in("ana").await;

        assert!(matches!(
            facade.set_quantity(&CartItemId::new("item-x"), 0).await,
            Err(CartError::ZeroQuantity)
        ));
        assert!(matches!(
            facade.set_quantity(&CartItemId::new("nope"), 1).await,
            Err(CartError::ItemNotFound(_))
        ));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_add_refetches_and_total_matches_server() {
        let (api, facade) = signed_in("ana").await;

        let cart = facade.add(&ProductId::new("7"), 1).await.unwrap();

        assert_eq!(api.calls(), vec!["add 7x1 ana", "cart ana"]);
        assert_eq!(cart.total_items(), 3);
        assert_eq!(facade.total_items(), cart.total_items());
        assert!(facade.is_in_cart(&ProductId::new("7")));
    }

    #[tokio::test]
    async fn test_add_zero_rejected() {
        let (api, facade) = signed_in("ana").await;
        assert!(matches!(
            facade.add(&ProductId::new("7"), 0).await,
            Err(CartError::ZeroQuantity)
        ));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_add_then_refetch_failure_reports_fetch_error() {
        let (api, facade) = signed_in("ana").await;
        api.fail_reads(true);

        let err = facade.add(&ProductId::new("7"), 1).await.unwrap_err();

        assert!(matches!(err, CartError::Unavailable(_)));
        assert!(!facade.is_in_cart(&ProductId::new("7")));
        assert!(facade.store().state().is_stale());

        api.fail_reads(false);
        facade.store().refresh().await.unwrap();
        assert!(facade.is_in_cart(&ProductId::new("7")));
    }

    #[tokio::test]
    async fn test_failed_write_still_refetches() {
        let (api, facade) = signed_in("ana").await;
        api.fail_writes(true);

        let err = facade.remove(&CartItemId::new("item-x")).await.unwrap_err();

        assert!(matches!(err, CartError::Write(_)));
        assert_eq!(api.calls(), vec!["remove item-x ana", "cart ana"]);
        assert_eq!(facade.total_items(), 2);
    }

    #[tokio::test]
    async fn test_set_quantity_and_clear() {
        let (_api, facade) = signed_in("ana").await;

        let cart = facade
            .set_quantity(&CartItemId::new("item-x"), 1)
            .await
            .unwrap();
        assert_eq!(cart.total_items(), 1);

        let cart = facade.clear().await.unwrap();
        assert!(cart.is_empty());
        assert_eq!(facade.total_items(), 0);
    }

    #[tokio::test]
    async fn test_mutation_without_session() {
        let api = MockApi::new();
        let identity = MockIdentity::new();
        let store = RemoteCartStore::new(api.clone(), identity.clone(), TIMEOUT);
        let facade = CartMutationFacade::new(store, api.clone(), identity, TIMEOUT);

        assert!(matches!(facade.clear().await, Err(CartError::NoSession)));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_mutation_after_provider_switch_sends_nothing() {
        let api = MockApi::new();
        api.with_product("9", 4000, 2);
        api.with_cart_line("ana", "item-x", "9", 2);
        api.with_cart_line("ben", "item-y", "9", 1);
        let identity = MockIdentity::new();
        identity.set_current(Some("ana"));
        let store = RemoteCartStore::new(api.clone(), identity.clone(), TIMEOUT);
        store.fetch(Some(&Identity::new("ana"))).await.unwrap();
        let facade = CartMutationFacade::new(store, api.clone(), identity.clone(), TIMEOUT);

        // The provider moves on before the mirror has been switched
        identity.set_current(Some("ben"));
        api.clear_calls();

        let err = facade.clear().await.unwrap_err();

        assert!(matches!(
            err,
            CartError::Credential(IdentityError::Switched { .. })
        ));
        assert!(api.calls().is_empty());
        assert_eq!(facade.store().owner().unwrap().as_str(), "ana");
        assert_eq!(facade.total_items(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_mutations_are_serialized() {
        let (api, facade) = signed_in("ana").await;

        let product_a = ProductId::new("7");
        let product_b = ProductId::new("7");
        let (a, b) = tokio::join!(
            facade.add(&product_a, 1),
            facade.add(&product_b, 2),
        );
        a.unwrap();
        b.unwrap();

        let calls = api.calls();
        assert_eq!(calls.len(), 4);
        assert!(calls[0].starts_with("add") && calls[1] == "cart ana");
        assert!(calls[2].starts_with("add") && calls[3] == "cart ana");
        assert_eq!(facade.total_items(), 5);
    }
}
