use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use skecho_core::{ProductId, UserUid};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::instrument;

use super::CartError;
use crate::api::MarketplaceApi;
use crate::error::report_api_error;
use crate::identity::{Identity, IdentityProvider, fetch_credential};
use crate::models::{Cart, CartState, Freshness, Session};

/// Local mirror of the signed-in user's server cart.
///
/// Every fetch is tagged with a sequence number. A response is applied only
/// if it is still the most recently issued fetch and the mirror still belongs
/// to the user it was fetched for.
#[derive(Clone)]
pub struct RemoteCartStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    api: Arc<dyn MarketplaceApi>,
    identity: Arc<dyn IdentityProvider>,
    timeout: Duration,
    state: watch::Sender<CartState>,
    issued: AtomicU64,
}

impl RemoteCartStore {
    #[must_use]
    pub fn new(
        api: Arc<dyn MarketplaceApi>,
        identity: Arc<dyn IdentityProvider>,
        timeout: Duration,
    ) -> Self {
        let (state, _) = watch::channel(CartState::default());
        Self {
            inner: Arc::new(StoreInner {
                api,
                identity,
                timeout,
                state,
                issued: AtomicU64::new(0),
            }),
        }
    }

    /// Current mirror.
    #[must_use]
    pub fn state(&self) -> CartState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.inner.state.subscribe()
    }

    /// User the mirror belongs to.
    #[must_use]
    pub fn owner(&self) -> Option<UserUid> {
        self.inner.state.borrow().owner.clone()
    }

    #[must_use]
    pub fn cart(&self) -> Option<Cart> {
        self.inner.state.borrow().cart.clone()
    }

    /// Sum of quantities in the current snapshot.
    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.inner.state.borrow().total_items()
    }

    #[must_use]
    pub fn is_in_cart(&self, product_id: &ProductId) -> bool {
        self.inner.state.borrow().is_in_cart(product_id)
    }

    /// Fetch the cart for `identity` and make it the mirror.
    ///
    /// Switching to a different identity discards the previous snapshot
    /// before the request is sent. `None` clears the mirror and makes no
    /// network call.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Unavailable` if the fetch failed (the snapshot is
    /// kept and marked stale), or `CartError::Credential` if no credential
    /// could be obtained.
    pub async fn fetch(&self, identity: Option<&Identity>) -> Result<Option<Cart>, CartError> {
        let owner = identity.map(|i| i.uid.clone());
        let seq = self.switch_to(owner.clone());
        match owner {
            Some(owner) => self.load(seq, owner).await.map(Some),
            None => Ok(None),
        }
    }

    /// Re-fetch for the current owner. `Ok(None)` when signed out.
    ///
    /// # Errors
    ///
    /// Same as [`fetch`](Self::fetch).
    pub async fn refresh(&self) -> Result<Option<Cart>, CartError> {
        match self.owner() {
            Some(owner) => self.reload(owner).await.map(Some),
            None => Ok(None),
        }
    }

    /// Re-fetch for `owner` without resetting the mirror.
    pub(crate) async fn reload(&self, owner: UserUid) -> Result<Cart, CartError> {
        let seq = self.issue();
        self.inner.state.send_if_modified(|state| {
            let mark = state.owner.as_ref() == Some(&owner) && !state.loading;
            if mark {
                state.loading = true;
            }
            mark
        });
        self.load(seq, owner).await
    }

    /// Follow session changes: every processed notification resets or
    /// re-fetches the mirror for the session's user.
    ///
    /// Fetches started here belong to the returned task: aborting it also
    /// aborts any fetch still in flight.
    pub fn follow(&self, mut session: watch::Receiver<Session>) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut seen = 0;
            let mut loads = JoinSet::new();
            loop {
                let current = session.borrow_and_update().clone();
                if !current.is_loading() && current.generation() != seen {
                    seen = current.generation();
                    // Superseded fetches would be discarded anyway
                    loads.abort_all();
                    while loads.try_join_next().is_some() {}

                    let owner = current.uid().cloned();
                    let seq = store.switch_to(owner.clone());
                    if let Some(owner) = owner {
                        let store = store.clone();
                        loads.spawn(async move {
                            if let Err(e) = store.load(seq, owner).await {
                                tracing::debug!(error = %e, "Cart fetch after session change failed");
                            }
                        });
                    }
                }
                if session.changed().await.is_err() {
                    break;
                }
            }
            tracing::debug!("Cart store stopped following the session");
        })
    }

    fn issue(&self) -> u64 {
        self.inner.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Issue a fetch sequence number for `owner`, discarding the mirror if it
    /// belongs to someone else.
    fn switch_to(&self, owner: Option<UserUid>) -> u64 {
        let seq = self.issue();
        self.inner.state.send_modify(|state| {
            if state.owner != owner {
                if state.owner.is_some() {
                    tracing::debug!("Discarding cart of previous user");
                }
                *state = CartState::empty(owner.clone());
            }
            state.loading = owner.is_some();
        });
        seq
    }

    #[instrument(skip(self, owner), fields(uid = %owner))]
    async fn load(&self, seq: u64, owner: UserUid) -> Result<Cart, CartError> {
        let result: Result<Cart, CartError> = async {
            let credential =
                fetch_credential(self.inner.identity.as_ref(), &owner, self.inner.timeout).await?;
            self.inner
                .api
                .cart(&credential)
                .await
                .map_err(CartError::Unavailable)
        }
        .await;

        if let Err(CartError::Unavailable(e)) = &result {
            report_api_error("Cart fetch", e);
        }

        let applied = self.inner.state.send_if_modified(|state| {
            if self.inner.issued.load(Ordering::SeqCst) != seq
                || state.owner.as_ref() != Some(&owner)
            {
                return false;
            }
            match &result {
                Ok(cart) => {
                    state.cart = Some(cart.clone());
                    state.freshness = Freshness::Live;
                    state.last_error = None;
                }
                Err(e) => {
                    state.freshness = Freshness::Stale;
                    state.last_error = Some(e.to_string());
                }
            }
            state.loading = false;
            true
        });
        if !applied {
            tracing::debug!(seq, "Ignoring superseded cart response");
        }

        result
    }
}
