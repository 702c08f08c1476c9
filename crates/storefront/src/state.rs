//! Application root owning every coordination service.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;

use crate::api::{HttpMarketplaceApi, MarketplaceApi};
use crate::config::StorefrontConfig;
use crate::error::{Result, report_api_error};
use crate::guard::{GuardDecision, RouteGuard, RouteTable};
use crate::identity::{IdentityError, IdentityProvider, fetch_credential};
use crate::models::{Cart, ProfileCompletionState, Session};
use crate::services::{
    CartMutationFacade, ProfileCompletionGate, RemoteCartStore, ReturnPathQueue, SessionManager,
};

/// The storefront client.
///
/// This struct is cheaply cloneable via `Arc` and owns the single instance of
/// each service: session, profile gate, return path, route guard, cart store
/// and cart facade.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: StorefrontConfig,
    api: Arc<dyn MarketplaceApi>,
    identity: Arc<dyn IdentityProvider>,
    session: SessionManager,
    profile: ProfileCompletionGate,
    guard: RouteGuard,
    cart_store: RemoteCartStore,
    cart: CartMutationFacade,
    cart_listener: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for StorefrontInner {
    fn drop(&mut self) {
        self.session.shutdown();
        if let Some(listener) = self
            .cart_listener
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            listener.abort();
        }
    }
}

impl Storefront {
    /// Wire up the services and subscribe to `identity`.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(
        config: StorefrontConfig,
        identity: Arc<dyn IdentityProvider>,
        api: Arc<dyn MarketplaceApi>,
    ) -> Self {
        let timeout = config.api.request_timeout;

        let profile = ProfileCompletionGate::new(Arc::clone(&api), Arc::clone(&identity), timeout);
        let session = SessionManager::start(identity.as_ref(), profile.clone());
        let cart_store = RemoteCartStore::new(Arc::clone(&api), Arc::clone(&identity), timeout);
        let cart = CartMutationFacade::new(
            cart_store.clone(),
            Arc::clone(&api),
            Arc::clone(&identity),
            timeout,
        );
        let guard = RouteGuard::new(
            RouteTable::default(),
            config.navigation.clone(),
            ReturnPathQueue::new(),
        );
        let cart_listener = cart_store.follow(session.subscribe());

        tracing::debug!(base_url = %config.api.base_url, "Storefront started");

        Self {
            inner: Arc::new(StorefrontInner {
                config,
                api,
                identity,
                session,
                profile,
                guard,
                cart_store,
                cart,
                cart_listener: Mutex::new(Some(cart_listener)),
            }),
        }
    }

    /// Start against the HTTP marketplace API described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn connect(config: StorefrontConfig, identity: Arc<dyn IdentityProvider>) -> Result<Self> {
        let api = HttpMarketplaceApi::new(&config.api)?;
        Ok(Self::start(config, identity, Arc::new(api)))
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn session(&self) -> &SessionManager {
        &self.inner.session
    }

    #[must_use]
    pub fn profile(&self) -> &ProfileCompletionGate {
        &self.inner.profile
    }

    #[must_use]
    pub fn guard(&self) -> &RouteGuard {
        &self.inner.guard
    }

    #[must_use]
    pub fn cart_store(&self) -> &RemoteCartStore {
        &self.inner.cart_store
    }

    #[must_use]
    pub fn cart(&self) -> &CartMutationFacade {
        &self.inner.cart
    }

    /// Wait for the initial session resolution.
    pub async fn ready(&self) -> Session {
        self.inner.session.wait_until_resolved().await
    }

    /// Route decision for `path` under the current session and profile state.
    pub fn check_route(&self, path: &str) -> GuardDecision {
        let session = self.inner.session.session();
        let profile = self.inner.profile.state();
        self.inner.guard.check(path, &session, &profile)
    }

    /// The mirrored cart, only if it belongs to the current session's user.
    #[must_use]
    pub fn current_cart(&self) -> Option<Cart> {
        let session = self.inner.session.session();
        let state = self.inner.cart_store.state();
        match (session.uid(), state.owner.as_ref()) {
            (Some(uid), Some(owner)) if uid == owner => state.cart,
            _ => None,
        }
    }

    /// Register the signed-in user with the backend, then re-check the
    /// profile.
    ///
    /// # Errors
    ///
    /// Returns an error if nobody is signed in, the provider has switched to
    /// another user, or the backend call fails.
    pub async fn register_user(&self) -> Result<ProfileCompletionState> {
        let session = self.inner.session.session();
        let uid = session.uid().ok_or(IdentityError::NotSignedIn)?;
        let credential = fetch_credential(
            self.inner.identity.as_ref(),
            uid,
            self.inner.config.api.request_timeout,
        )
        .await?;
        self.inner
            .api
            .create_user(&credential)
            .await
            .inspect_err(|e| report_api_error("User registration", e))?;
        tracing::info!("User registered");
        Ok(self.inner.profile.recheck().await)
    }

    /// Release the identity subscription and stop following the session.
    pub fn shutdown(&self) {
        self.inner.session.shutdown();
        let listener = self
            .inner
            .cart_listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(listener) = listener {
            listener.abort();
        }
    }
}
