//! Session manager.
//!
//! Subscribes to the identity provider once and turns each notification into
//! a published [`Session`]. The profile check for the new identity completes
//! before the session is published, so a consumer that sees `loading == false`
//! also sees the matching completion state.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::identity::{Identity, IdentityProvider, IdentitySubscription};
use crate::models::Session;
use crate::services::profile::ProfileCompletionGate;

/// Owner of the current [`Session`].
///
/// Cheaply cloneable. The provider subscription lives as long as the last
/// clone, or until [`shutdown`](Self::shutdown).
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    state: Arc<watch::Sender<Session>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        if let Some(task) = self
            .task
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }
}

impl SessionManager {
    /// Subscribe to `provider` and start processing identity changes.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(provider: &dyn IdentityProvider, gate: ProfileCompletionGate) -> Self {
        let (state, _) = watch::channel(Session::resolving());
        let state = Arc::new(state);
        let subscription = provider.subscribe();
        let task = tokio::spawn(run(subscription, Arc::clone(&state), gate));

        Self {
            inner: Arc::new(SessionInner {
                state,
                task: Mutex::new(Some(task)),
            }),
        }
    }

    /// Current session snapshot.
    #[must_use]
    pub fn session(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    /// Watch session changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    /// Wait until the first identity notification has been processed.
    pub async fn wait_until_resolved(&self) -> Session {
        let mut rx = self.subscribe();
        match rx.wait_for(|session| !session.is_loading()).await {
            Ok(session) => session.clone(),
            Err(_) => self.session(),
        }
    }

    /// Release the provider subscription and stop processing changes.
    pub fn shutdown(&self) {
        let task = self
            .inner
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
            tracing::debug!("Session manager stopped");
        }
    }
}

async fn run(
    mut subscription: IdentitySubscription,
    state: Arc<watch::Sender<Session>>,
    gate: ProfileCompletionGate,
) {
    while let Some(change) = subscription.next().await {
        let identity = change.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Identity provider failed, treating as signed out");
            None
        });

        gate.check_profile_completion(identity.as_ref()).await;

        let previous = state.borrow().uid().cloned();
        if previous.as_ref() != identity.as_ref().map(|i| &i.uid) {
            announce(identity.as_ref());
        }

        state.send_modify(|session| *session = session.resolved(identity));
    }
    tracing::debug!("Identity subscription ended");
}

fn announce(identity: Option<&Identity>) {
    match identity {
        Some(identity) => {
            set_sentry_user(&identity.uid, identity.email.as_ref().map(|e| e.as_str()));
            tracing::info!(uid = %identity.uid, "Signed in");
        }
        None => {
            clear_sentry_user();
            tracing::info!("Signed out");
        }
    }
}
