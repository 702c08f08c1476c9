//! Identity provider seam.
//!
//! The identity provider (e.g. a hosted OAuth/OIDC service) is an external
//! collaborator. It issues an opaque bearer credential for the signed-in user
//! and notifies subscribers whenever the signed-in user changes.
//!
//! # Contract
//!
//! - [`IdentityProvider::subscribe`] is called exactly once per application;
//!   the returned [`IdentitySubscription`] yields one [`IdentityChange`] per
//!   provider notification, starting with the initial resolution (which may be
//!   "no user"). Dropping the subscription unsubscribes.
//! - [`IdentityProvider::credential`] returns a bearer token for the current
//!   user and may perform a network refresh. The credential names the user it
//!   was issued for; callers acting for a particular user must check it, since
//!   the provider may switch users before subscribers have seen the change.

mod static_provider;

pub use static_provider::StaticIdentityProvider;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use skecho_core::{Email, UserUid};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors reported by the identity provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityError {
    /// Provider could not be reached or failed internally.
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),

    /// No user is signed in, so no credential can be issued.
    #[error("no user is signed in")]
    NotSignedIn,

    /// Credential request did not complete in time.
    #[error("credential request timed out after {0:?}")]
    Timeout(Duration),

    /// The provider has already switched to another user.
    #[error("credential was issued for {actual}, not {expected}")]
    Switched { expected: UserUid, actual: UserUid },
}

/// The authenticated user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Provider-assigned user id.
    pub uid: UserUid,
    /// Email address, if the provider shares it.
    pub email: Option<Email>,
    /// Display name, if the provider shares it.
    pub display_name: Option<String>,
}

impl Identity {
    /// Create an identity with only a user id.
    #[must_use]
    pub fn new(uid: impl Into<UserUid>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
            display_name: None,
        }
    }

    /// Attach an email address.
    #[must_use]
    pub fn with_email(mut self, email: Email) -> Self {
        self.email = Some(email);
        self
    }

    /// Attach a display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// Bearer credential for backend requests.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct Credential {
    uid: UserUid,
    token: SecretString,
    expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    /// Seconds before expiry at which a credential is already considered expired.
    const EXPIRY_LEEWAY_SECS: i64 = 60;

    /// Wrap a bearer token issued for `uid`.
    #[must_use]
    pub fn new(uid: impl Into<UserUid>, token: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            token: SecretString::from(token.into()),
            expires_at: None,
        }
    }

    /// Set the expiry instant reported by the provider.
    #[must_use]
    pub const fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// The user this credential was issued for.
    #[must_use]
    pub const fn uid(&self) -> &UserUid {
        &self.uid
    }

    /// The raw bearer token, for the `Authorization` header.
    #[must_use]
    pub fn token(&self) -> &str {
        self.token.expose_secret()
    }

    /// Check if the credential is expired (with 60s buffer).
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|expires_at| {
            Utc::now() >= expires_at - chrono::Duration::seconds(Self::EXPIRY_LEEWAY_SECS)
        })
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("uid", &self.uid)
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// One provider notification: the new signed-in user (or none), or a
/// provider failure.
pub type IdentityChange = Result<Option<Identity>, IdentityError>;

/// Provider-side handle used to publish identity changes to one subscriber.
#[derive(Debug, Clone)]
pub struct IdentityNotifier {
    tx: mpsc::UnboundedSender<IdentityChange>,
}

impl IdentityNotifier {
    /// Publish a change. Returns `false` once the subscriber has unsubscribed.
    pub fn notify(&self, change: IdentityChange) -> bool {
        self.tx.send(change).is_ok()
    }

    /// Whether the subscriber has released its subscription.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Subscriber-side stream of identity changes.
#[derive(Debug)]
pub struct IdentitySubscription {
    rx: mpsc::UnboundedReceiver<IdentityChange>,
}

impl IdentitySubscription {
    /// Create a connected notifier/subscription pair.
    #[must_use]
    pub fn channel() -> (IdentityNotifier, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (IdentityNotifier { tx }, Self { rx })
    }

    /// Wait for the next change. `None` once the provider stops publishing.
    pub async fn next(&mut self) -> Option<IdentityChange> {
        self.rx.recv().await
    }

    /// Release the subscription. Equivalent to dropping it.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

/// External identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Subscribe to identity changes.
    fn subscribe(&self) -> IdentitySubscription;

    /// Get a bearer credential for the current user.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::NotSignedIn` when no user is signed in, or
    /// `IdentityError::Unavailable` when the provider fails.
    async fn credential(&self) -> Result<Credential, IdentityError>;
}

/// Get a credential for `expected` from the provider, bounded by `timeout`.
///
/// Fails with [`IdentityError::Switched`] if the provider has moved on to a
/// different user, so nothing done on behalf of `expected` is sent with
/// another user's token.
pub(crate) async fn fetch_credential(
    provider: &dyn IdentityProvider,
    expected: &UserUid,
    timeout: Duration,
) -> Result<Credential, IdentityError> {
    let credential = tokio::time::timeout(timeout, provider.credential())
        .await
        .map_err(|_| IdentityError::Timeout(timeout))??;

    if credential.uid() != expected {
        tracing::debug!(%expected, actual = %credential.uid(), "Provider switched users");
        return Err(IdentityError::Switched {
            expected: expected.clone(),
            actual: credential.uid().clone(),
        });
    }
    Ok(credential)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_debug_redacts_token() {
        let credential = Credential::new("ana", "secret-token");
        let debug = format!("{credential:?}");
        assert!(!debug.contains("secret-token"));
        assert_eq!(credential.token(), "secret-token");
    }

    #[test]
    fn test_credential_expiry_uses_leeway() {
        let fresh = Credential::new("ana", "t").with_expiry(Utc::now() + chrono::Duration::minutes(10));
        assert!(!fresh.is_expired());

        let almost = Credential::new("ana", "t").with_expiry(Utc::now() + chrono::Duration::seconds(30));
        assert!(almost.is_expired());

        assert!(!Credential::new("ana", "t").is_expired());
    }

    struct Fixed(&'static str);

    #[async_trait]
    impl IdentityProvider for Fixed {
        fn subscribe(&self) -> IdentitySubscription {
            IdentitySubscription::channel().1
        }

        async fn credential(&self) -> Result<Credential, IdentityError> {
            Ok(Credential::new(self.0, format!("token-{}", self.0)))
        }
    }

    #[tokio::test]
    async fn test_fetch_credential_rejects_other_user() {
        let timeout = Duration::from_secs(1);

        let ok = fetch_credential(&Fixed("ana"), &UserUid::new("ana"), timeout)
            .await
            .unwrap();
        assert_eq!(ok.token(), "token-ana");

        let err = fetch_credential(&Fixed("ben"), &UserUid::new("ana"), timeout)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            IdentityError::Switched {
                expected: UserUid::new("ana"),
                actual: UserUid::new("ben"),
            }
        );
    }

    #[tokio::test]
    async fn test_subscription_closes_when_dropped() {
        let (notifier, subscription) = IdentitySubscription::channel();
        assert!(notifier.notify(Ok(None)));
        subscription.unsubscribe();
        assert!(notifier.is_closed());
        assert!(!notifier.notify(Ok(None)));
    }

    #[tokio::test]
    async fn test_subscription_yields_changes_in_order() {
        let (notifier, mut subscription) = IdentitySubscription::channel();
        notifier.notify(Ok(Some(Identity::new("a"))));
        notifier.notify(Err(IdentityError::NotSignedIn));
        drop(notifier);

        assert_eq!(
            subscription.next().await,
            Some(Ok(Some(Identity::new("a"))))
        );
        assert_eq!(
            subscription.next().await,
            Some(Err(IdentityError::NotSignedIn))
        );
        assert_eq!(subscription.next().await, None);
    }
}
