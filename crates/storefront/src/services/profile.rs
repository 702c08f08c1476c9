//! Profile completion gate.
//!
//! Derives the two completion stages (base user profile, seller profile) for
//! the current identity from the backend. Fetch failures never propagate:
//! the affected stage becomes [`Completion::Unknown`], which the route guard
//! treats as "not yet decided" and never as complete.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use skecho_core::Completion;
use thiserror::Error;
use tokio::sync::watch;
use tracing::instrument;

use crate::api::{ApiError, MarketplaceApi};
use crate::error::report_api_error;
use crate::identity::{Identity, IdentityError, IdentityProvider, fetch_credential};
use crate::models::{
    CompleteProfileRequest, ProfileCompletionState, ProfileInputError, SellerProfileRequest,
};

/// Errors from profile submission.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("no signed-in user")]
    NoSession,

    #[error(transparent)]
    Input(#[from] ProfileInputError),

    #[error("credential unavailable: {0}")]
    Credential(#[from] IdentityError),

    #[error("profile update failed: {0}")]
    Api(#[from] ApiError),
}

/// Holds the [`ProfileCompletionState`] of the current identity.
///
/// Cheaply cloneable; clones share state.
#[derive(Clone)]
pub struct ProfileCompletionGate {
    inner: Arc<GateInner>,
}

struct GateInner {
    api: Arc<dyn MarketplaceApi>,
    identity: Arc<dyn IdentityProvider>,
    timeout: Duration,
    state: watch::Sender<ProfileCompletionState>,
    /// Identity of the most recent check.
    subject: Mutex<Option<Identity>>,
    /// Bumped by every check; results of superseded checks are dropped.
    epoch: AtomicU64,
}

impl ProfileCompletionGate {
    #[must_use]
    pub fn new(
        api: Arc<dyn MarketplaceApi>,
        identity: Arc<dyn IdentityProvider>,
        timeout: Duration,
    ) -> Self {
        let (state, _) = watch::channel(ProfileCompletionState::UNKNOWN);
        Self {
            inner: Arc::new(GateInner {
                api,
                identity,
                timeout,
                state,
                subject: Mutex::new(None),
                epoch: AtomicU64::new(0),
            }),
        }
    }

    /// Current completion state.
    #[must_use]
    pub fn state(&self) -> ProfileCompletionState {
        *self.inner.state.borrow()
    }

    /// Watch completion state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ProfileCompletionState> {
        self.inner.state.subscribe()
    }

    /// Recompute completion for `identity` and publish it.
    ///
    /// Resets to `Unknown/Unknown` without a network call when `identity` is
    /// `None`. If another check starts before this one finishes, this result
    /// is returned to the caller but not published.
    #[instrument(skip_all, fields(uid = identity.map(|i| i.uid.as_str())))]
    pub async fn check_profile_completion(
        &self,
        identity: Option<&Identity>,
    ) -> ProfileCompletionState {
        let epoch = self.inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        *self
            .inner
            .subject
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = identity.cloned();

        let state = match identity {
            Some(identity) => self.evaluate(identity).await,
            None => ProfileCompletionState::UNKNOWN,
        };

        if self.inner.epoch.load(Ordering::SeqCst) == epoch {
            self.inner.state.send_replace(state);
        } else {
            tracing::debug!("Discarding superseded profile check");
        }
        state
    }

    /// Re-run the check for the identity last checked.
    pub async fn recheck(&self) -> ProfileCompletionState {
        let subject = self.subject();
        self.check_profile_completion(subject.as_ref()).await
    }

    /// Submit the base profile form, then re-check.
    ///
    /// # Errors
    ///
    /// Returns an error if nobody is signed in, no credential could be
    /// obtained, or the backend rejected the submission.
    #[instrument(skip_all)]
    pub async fn submit_user_profile(
        &self,
        request: &CompleteProfileRequest,
    ) -> Result<ProfileCompletionState, ProfileError> {
        let subject = self.subject().ok_or(ProfileError::NoSession)?;
        let credential =
            fetch_credential(self.inner.identity.as_ref(), &subject.uid, self.inner.timeout)
                .await?;
        self.inner
            .api
            .complete_user_profile(&credential, request)
            .await
            .inspect_err(|e| report_api_error("Profile completion", e))?;
        tracing::info!("User profile submitted");
        Ok(self.recheck().await)
    }

    /// Submit the seller profile form, then re-check.
    ///
    /// # Errors
    ///
    /// Same as [`submit_user_profile`](Self::submit_user_profile).
    #[instrument(skip_all)]
    pub async fn submit_seller_profile(
        &self,
        request: &SellerProfileRequest,
    ) -> Result<ProfileCompletionState, ProfileError> {
        let subject = self.subject().ok_or(ProfileError::NoSession)?;
        let credential =
            fetch_credential(self.inner.identity.as_ref(), &subject.uid, self.inner.timeout)
                .await?;
        self.inner
            .api
            .create_seller_profile(&credential, request)
            .await
            .inspect_err(|e| report_api_error("Seller profile submission", e))?;
        tracing::info!("Seller profile submitted");
        Ok(self.recheck().await)
    }

    fn subject(&self) -> Option<Identity> {
        self.inner
            .subject
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn evaluate(&self, identity: &Identity) -> ProfileCompletionState {
        let provider = self.inner.identity.as_ref();
        let credential =
            match fetch_credential(provider, &identity.uid, self.inner.timeout).await {
                Ok(credential) => credential,
                Err(e) => {
                    tracing::warn!(error = %e, "No credential for profile check");
                    return ProfileCompletionState::UNKNOWN;
                }
            };

        let (user, seller) = tokio::join!(
            self.inner.api.user_profile(&credential),
            self.inner.api.seller_profile(&credential),
        );

        let (user, is_seller) = match user {
            Ok(profile) => (Completion::from_verified(profile.is_complete()), profile.is_seller),
            Err(e) => {
                report_api_error("User profile fetch", &e);
                (Completion::Unknown, false)
            }
        };
        let seller = match seller {
            Ok(Some(profile)) => Completion::from_verified(profile.is_complete()),
            Ok(None) => Completion::Incomplete,
            Err(e) => {
                report_api_error("Seller profile fetch", &e);
                Completion::Unknown
            }
        };

        tracing::debug!(%user, %seller, is_seller, "Profile completion evaluated");
        ProfileCompletionState {
            user,
            seller,
            is_seller,
        }
    }
}
