//! Navigation guard.
//!
//! Decides, for a requested path, whether to render it, wait, or redirect.
//!
//! # States
//!
//! | State | Meaning | Protected path |
//! |---|---|---|
//! | `Resolving` | session loading, or a required stage is `Unknown` | `Pending` |
//! | `Unauthenticated` | no user | remember path, go to sign-in |
//! | `AuthenticatedIncompleteUser` | base profile incomplete | profile form, `{ from }` |
//! | `AuthenticatedIncompleteSeller` | seller profile incomplete | seller form, `{ from }` |
//! | `AuthenticatedComplete` | every required stage complete | allow |
//!
//! Public paths are always allowed. `Pending` never grants access; it keeps
//! a transient profile fetch failure from bouncing a user to a form they have
//! already filled in.

mod routes;

pub use routes::{Access, RouteTable};

use serde::{Deserialize, Serialize};

use crate::config::NavigationConfig;
use crate::models::{ProfileCompletionState, Session};
use crate::services::ReturnPathQueue;

/// Where the session stands relative to one access level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Resolving,
    Unauthenticated,
    AuthenticatedIncompleteUser,
    AuthenticatedIncompleteSeller,
    AuthenticatedComplete,
}

/// Navigation state carried to a completion form so it can send the user
/// back where they were going.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Continuation {
    pub from: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuation: Option<Continuation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// Not decidable yet; render a placeholder and ask again on the next
    /// session or profile change.
    Pending,
    Redirect(Redirect),
}

/// Which completion form was submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileStage {
    User,
    Seller,
}

/// Route guard over the session and profile completion state.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    routes: RouteTable,
    navigation: NavigationConfig,
    return_path: ReturnPathQueue,
}

impl RouteGuard {
    #[must_use]
    pub const fn new(
        routes: RouteTable,
        navigation: NavigationConfig,
        return_path: ReturnPathQueue,
    ) -> Self {
        Self {
            routes,
            navigation,
            return_path,
        }
    }

    #[must_use]
    pub const fn routes(&self) -> &RouteTable {
        &self.routes
    }

    #[must_use]
    pub const fn return_path(&self) -> &ReturnPathQueue {
        &self.return_path
    }

    /// Classify the session for a path requiring `access`.
    #[must_use]
    pub fn state(session: &Session, profile: &ProfileCompletionState, access: Access) -> GuardState {
        if session.is_loading() {
            return GuardState::Resolving;
        }
        if !session.is_authenticated() {
            return GuardState::Unauthenticated;
        }
        if matches!(access, Access::Public | Access::Authenticated) {
            return GuardState::AuthenticatedComplete;
        }
        if profile.user.is_unknown() {
            return GuardState::Resolving;
        }
        if !profile.is_user_profile_complete() {
            return GuardState::AuthenticatedIncompleteUser;
        }
        if access == Access::Seller {
            if profile.seller.is_unknown() {
                return GuardState::Resolving;
            }
            if !profile.is_seller_profile_complete() {
                return GuardState::AuthenticatedIncompleteSeller;
            }
        }
        GuardState::AuthenticatedComplete
    }

    /// Decide what to do with a navigation to `path`.
    ///
    /// Redirecting an unauthenticated user to sign-in remembers `path`
    /// (replacing any earlier one) for [`after_sign_in`](Self::after_sign_in).
    pub fn check(
        &self,
        path: &str,
        session: &Session,
        profile: &ProfileCompletionState,
    ) -> GuardDecision {
        let access = self.routes.access_for(path);
        if access == Access::Public {
            return GuardDecision::Allow;
        }

        let state = Self::state(session, profile, access);
        tracing::debug!(path, %access, ?state, "Route check");

        match state {
            GuardState::Resolving => GuardDecision::Pending,
            GuardState::Unauthenticated => {
                self.return_path.set(path);
                GuardDecision::Redirect(Redirect {
                    to: self.navigation.signin_path.clone(),
                    continuation: None,
                })
            }
            GuardState::AuthenticatedIncompleteUser => {
                Self::to_form(&self.navigation.complete_profile_path, path)
            }
            GuardState::AuthenticatedIncompleteSeller => {
                Self::to_form(&self.navigation.complete_seller_profile_path, path)
            }
            GuardState::AuthenticatedComplete => GuardDecision::Allow,
        }
    }

    /// Where to go after a successful sign-in: the remembered path, consumed,
    /// or the home path.
    pub fn after_sign_in(&self) -> String {
        self.return_path
            .take()
            .unwrap_or_else(|| self.navigation.home_path.clone())
    }

    /// Where to go after a completion form was submitted.
    #[must_use]
    pub fn after_profile_submission(
        &self,
        continuation: Option<&Continuation>,
        stage: ProfileStage,
    ) -> String {
        continuation.map_or_else(
            || match stage {
                ProfileStage::User => self.navigation.home_path.clone(),
                ProfileStage::Seller => self.navigation.seller_home_path.clone(),
            },
            |c| c.from.clone(),
        )
    }

    fn to_form(form: &str, from: &str) -> GuardDecision {
        GuardDecision::Redirect(Redirect {
            to: form.to_string(),
            continuation: Some(Continuation {
                from: from.to_string(),
            }),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use skecho_core::Completion;

    use super::*;
    use crate::identity::Identity;

    fn guard() -> RouteGuard {
        RouteGuard::new(
            RouteTable::default(),
            NavigationConfig::default(),
            ReturnPathQueue::new(),
        )
    }

    fn signed_in() -> Session {
        Session::resolving().resolved(Some(Identity::new("ana")))
    }

    fn signed_out() -> Session {
        Session::resolving().resolved(None)
    }

    fn profile(user: Completion, seller: Completion) -> ProfileCompletionState {
        ProfileCompletionState {
            user,
            seller,
            is_seller: false,
        }
    }

    fn redirect(to: &str, from: Option<&str>) -> GuardDecision {
        GuardDecision::Redirect(Redirect {
            to: to.to_string(),
            continuation: from.map(|from| Continuation {
                from: from.to_string(),
            }),
        })
    }

    #[test]
    fn test_public_paths_allowed_while_loading() {
        let guard = guard();
        let decision = guard.check("/", &Session::resolving(), &ProfileCompletionState::UNKNOWN);
        assert_eq!(decision, GuardDecision::Allow);
    }

    #[test]
    fn test_protected_path_pending_while_loading() {
        let guard = guard();
        let decision = guard.check(
            "/product/42",
            &Session::resolving(),
            &ProfileCompletionState::UNKNOWN,
        );
        assert_eq!(decision, GuardDecision::Pending);
        assert_eq!(guard.return_path().peek(), None);
    }

    #[test]
    fn test_unauthenticated_redirects_to_signin_and_resumes_once() {
        let guard = guard();

        let decision = guard.check("/product/42", &signed_out(), &ProfileCompletionState::UNKNOWN);

        assert_eq!(decision, redirect("/signin", None));
        assert_eq!(guard.return_path().peek().as_deref(), Some("/product/42"));
        assert_eq!(guard.after_sign_in(), "/product/42");
        assert_eq!(guard.return_path().peek(), None);
        assert_eq!(guard.after_sign_in(), "/");
    }

    #[test]
    fn test_incomplete_user_sent_to_profile_form() {
        let guard = guard();
        let state = profile(Completion::Incomplete, Completion::Unknown);

        assert_eq!(
            guard.check("/cart", &signed_in(), &state),
            redirect("/complete-profile", Some("/cart"))
        );
        assert_eq!(guard.check("/product/42", &signed_in(), &state), GuardDecision::Allow);
        assert_eq!(
            guard.check("/complete-profile", &signed_in(), &state),
            GuardDecision::Allow
        );
    }

    #[test]
    fn test_unknown_stage_is_pending_not_redirect() {
        let guard = guard();
        let unknown_user = profile(Completion::Unknown, Completion::Complete);
        let unknown_seller = profile(Completion::Complete, Completion::Unknown);

        assert_eq!(guard.check("/cart", &signed_in(), &unknown_user), GuardDecision::Pending);
        assert_eq!(
            guard.check("/dashboard", &signed_in(), &unknown_seller),
            GuardDecision::Pending
        );
        assert_eq!(
            guard.check("/orders", &signed_in(), &unknown_seller),
            GuardDecision::Allow
        );
    }

    #[test]
    fn test_incomplete_seller_only_gates_seller_routes() {
        let guard = guard();
        let state = profile(Completion::Complete, Completion::Incomplete);

        assert_eq!(guard.check("/checkout", &signed_in(), &state), GuardDecision::Allow);
        assert_eq!(
            guard.check("/dashboard", &signed_in(), &state),
            redirect("/complete-seller-profile", Some("/dashboard"))
        );
        assert_eq!(
            RouteGuard::state(&signed_in(), &state, Access::Seller),
            GuardState::AuthenticatedIncompleteSeller
        );
    }

    #[test]
    fn test_complete_seller_allowed() {
        let guard = guard();
        let state = profile(Completion::Complete, Completion::Complete);
        assert_eq!(guard.check("/dashboard", &signed_in(), &state), GuardDecision::Allow);
    }

    #[test]
    fn test_after_profile_submission() {
        let guard = guard();
        let continuation = Continuation {
            from: "/dashboard".to_string(),
        };

        assert_eq!(
            guard.after_profile_submission(Some(&continuation), ProfileStage::Seller),
            "/dashboard"
        );
        assert_eq!(guard.after_profile_submission(None, ProfileStage::User), "/");
        assert_eq!(
            guard.after_profile_submission(None, ProfileStage::Seller),
            "/dashboard"
        );
    }

    #[test]
    fn test_redirect_serializes_continuation() {
        let value = serde_json::to_value(Redirect {
            to: "/complete-profile".to_string(),
            continuation: Some(Continuation {
                from: "/cart".to_string(),
            }),
        })
        .unwrap();
        assert_eq!(
            value,
            serde_json::json!({"to": "/complete-profile", "continuation": {"from": "/cart"}})
        );

        let value = serde_json::to_value(Redirect {
            to: "/signin".to_string(),
            continuation: None,
        })
        .unwrap();
        assert_eq!(value, serde_json::json!({"to": "/signin"}));
    }
}
