//! Session snapshot.

use skecho_core::UserUid;

use crate::identity::Identity;

/// The client's view of who is signed in.
///
/// Published as a whole by the session manager, so `identity` and `loading`
/// are always observed together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    identity: Option<Identity>,
    loading: bool,
    generation: u64,
}

impl Session {
    /// State before the identity provider has reported anything.
    #[must_use]
    pub const fn resolving() -> Self {
        Self {
            identity: None,
            loading: true,
            generation: 0,
        }
    }

    /// Next state after one provider notification has been processed.
    #[must_use]
    pub(crate) const fn resolved(&self, identity: Option<Identity>) -> Self {
        Self {
            identity,
            loading: false,
            generation: self.generation + 1,
        }
    }

    /// The signed-in user. Not final while [`is_loading`](Self::is_loading).
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    #[must_use]
    pub fn uid(&self) -> Option<&UserUid> {
        self.identity.as_ref().map(|identity| &identity.uid)
    }

    /// True until the first provider notification has been fully processed.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// Number of provider notifications processed so far.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Resolved and signed in.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        !self.loading && self.identity.is_some()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::resolving()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolving_session_is_not_authenticated() {
        let session = Session::resolving();
        assert!(session.is_loading());
        assert!(!session.is_authenticated());
        assert_eq!(session.generation(), 0);
    }

    #[test]
    fn test_resolved_bumps_generation() {
        let first = Session::resolving().resolved(Some(Identity::new("a")));
        assert!(first.is_authenticated());
        assert_eq!(first.uid(), Some(&UserUid::new("a")));
        assert_eq!(first.generation(), 1);

        let second = first.resolved(None);
        assert!(!second.is_loading());
        assert!(!second.is_authenticated());
        assert_eq!(second.generation(), 2);
    }
}
