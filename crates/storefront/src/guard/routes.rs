//! Path prefix → access level table.

use std::fmt;

/// What a path requires of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    /// Anyone, including while the session is still resolving.
    Public,
    /// A signed-in user.
    Authenticated,
    /// A signed-in user with a complete base profile.
    CompleteProfile,
    /// A complete base profile and a complete seller profile.
    Seller,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Public => "public",
            Self::Authenticated => "authenticated",
            Self::CompleteProfile => "complete-profile",
            Self::Seller => "seller",
        };
        f.write_str(s)
    }
}

/// Access rules keyed by path prefix.
///
/// A prefix matches a path on segment boundaries: `/cart` covers `/cart` and
/// `/cart/checkout` but not `/cartography`. The longest matching prefix wins;
/// unmatched paths are [`Access::Public`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    rules: Vec<(String, Access)>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::empty()
            .with_rule("/product", Access::Authenticated)
            .with_rule("/artwork", Access::Authenticated)
            .with_rule("/complete-profile", Access::Authenticated)
            .with_rule("/cart", Access::CompleteProfile)
            .with_rule("/orders", Access::CompleteProfile)
            .with_rule("/checkout", Access::CompleteProfile)
            .with_rule("/complete-seller-profile", Access::CompleteProfile)
            .with_rule("/dashboard", Access::Seller)
            .with_rule("/seller", Access::Seller)
    }
}

impl RouteTable {
    /// A table with no rules: every path is public.
    #[must_use]
    pub const fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Add or replace the rule for `prefix`.
    #[must_use]
    pub fn with_rule(mut self, prefix: &str, access: Access) -> Self {
        let prefix = normalize(prefix).to_string();
        match self.rules.iter_mut().find(|(p, _)| *p == prefix) {
            Some(rule) => rule.1 = access,
            None => self.rules.push((prefix, access)),
        }
        self
    }

    /// Access level of `path`. Query string and fragment are ignored.
    #[must_use]
    pub fn access_for(&self, path: &str) -> Access {
        let path = normalize(path);
        self.rules
            .iter()
            .filter(|(prefix, _)| covers(prefix, path))
            .max_by_key(|(prefix, _)| prefix.len())
            .map_or(Access::Public, |(_, access)| *access)
    }
}

/// Strip query, fragment and trailing slashes.
fn normalize(path: &str) -> &str {
    let trimmed = path
        .split(['?', '#'])
        .next()
        .unwrap_or(path)
        .trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

fn covers(prefix: &str, path: &str) -> bool {
    prefix == "/"
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}
