//! Identity provider backed by a pre-issued token.

use async_trait::async_trait;
use secrecy::ExposeSecret;

use super::{Credential, Identity, IdentityError, IdentityProvider, IdentitySubscription};
use crate::config::StaticIdentityConfig;

/// Identity provider with a fixed user, or no user at all.
///
/// Each subscription receives exactly one notification (the fixed user or
/// "signed out") and then ends. Used by the CLI, where the token is obtained
/// out of band.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityProvider {
    signed_in: Option<(Identity, Credential)>,
}

impl StaticIdentityProvider {
    /// Provider for a signed-in user.
    #[must_use]
    pub const fn signed_in(identity: Identity, credential: Credential) -> Self {
        Self {
            signed_in: Some((identity, credential)),
        }
    }

    /// Provider with nobody signed in.
    #[must_use]
    pub const fn signed_out() -> Self {
        Self { signed_in: None }
    }

    /// Build from configuration; signed out when no identity is configured.
    #[must_use]
    pub fn from_config(config: Option<&StaticIdentityConfig>) -> Self {
        config.map_or_else(Self::signed_out, |config| {
            Self::signed_in(
                Identity::new(config.user_id.as_str()),
                Credential::new(config.user_id.as_str(), config.id_token.expose_secret()),
            )
        })
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    fn subscribe(&self) -> IdentitySubscription {
        let (notifier, subscription) = IdentitySubscription::channel();
        let identity = self.signed_in.as_ref().map(|(identity, _)| identity.clone());
        notifier.notify(Ok(identity));
        subscription
    }

    async fn credential(&self) -> Result<Credential, IdentityError> {
        self.signed_in
            .as_ref()
            .map(|(_, credential)| credential.clone())
            .ok_or(IdentityError::NotSignedIn)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signed_in_provider_emits_user_once() {
        let provider =
            StaticIdentityProvider::signed_in(Identity::new("uid-1"), Credential::new("uid-1", "tok"));
        let mut subscription = provider.subscribe();

        assert_eq!(
            subscription.next().await,
            Some(Ok(Some(Identity::new("uid-1"))))
        );
        assert_eq!(subscription.next().await, None);
        assert_eq!(provider.credential().await.unwrap().token(), "tok");
    }

    #[tokio::test]
    async fn test_signed_out_provider_has_no_credential() {
        let provider = StaticIdentityProvider::from_config(None);
        let mut subscription = provider.subscribe();

        assert_eq!(subscription.next().await, Some(Ok(None)));
        assert_eq!(
            provider.credential().await.unwrap_err(),
            IdentityError::NotSignedIn
        );
    }
}
