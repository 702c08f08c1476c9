//! Session resolution, identity switches and teardown.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use skecho_core::{Completion, ProductId};
use skecho_integration_tests::{Call, TestContext};
use skecho_storefront::guard::GuardDecision;
use skecho_storefront::identity::IdentityError;
use skecho_storefront::services::CartError;

// =============================================================================
// Initial resolution
// =============================================================================

#[tokio::test]
async fn test_loading_until_first_notification_is_processed() {
    let ctx = TestContext::start();
    ctx.api.add_user("ana", true, false);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(ctx.storefront.session().session().is_loading());
    assert_eq!(ctx.storefront.check_route("/product/42"), GuardDecision::Pending);

    ctx.identity.sign_in("ana");
    let session = ctx.storefront.ready().await;

    assert!(!session.is_loading());
    assert_eq!(session.uid().unwrap().as_str(), "ana");
    // The profile check finished before the session was published
    assert_eq!(ctx.storefront.profile().state().user, Completion::Complete);
}

#[tokio::test]
async fn test_signed_out_resolution_makes_no_backend_calls() {
    let ctx = TestContext::start();

    ctx.identity.sign_out();
    let session = ctx.storefront.ready().await;

    assert!(!session.is_authenticated());
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(ctx.api.calls().is_empty());
    assert!(ctx.storefront.current_cart().is_none());
}

#[tokio::test]
async fn test_provider_failure_fails_closed() {
    let ctx = TestContext::start();

    ctx.identity.fail("token endpoint unreachable");
    let session = ctx.storefront.ready().await;

    assert!(!session.is_authenticated());
    assert!(matches!(
        ctx.storefront.check_route("/cart"),
        GuardDecision::Redirect(redirect) if redirect.to == "/signin"
    ));
}

// =============================================================================
// Identity switches
// =============================================================================

#[tokio::test]
async fn test_switching_users_never_exposes_previous_cart() {
    let ctx = TestContext::start();
    ctx.api.add_user("ana", true, false);
    ctx.api.add_user("ben", true, false);
    ctx.api.seed_cart_line("ana", "item-a", "7", 1);
    ctx.api.seed_cart_line("ben", "item-b", "9", 2);

    let ana_fetch = ctx.api.hold_cart_fetches("ana");
    ctx.identity.sign_in("ana");
    ctx.settle(|s| s.session().session().is_authenticated()).await;
    ctx.settle(|_| ctx.api.calls().contains(&Call::Cart("ana".to_string())))
        .await;

    ctx.sign_in("ben").await;
    assert_eq!(ctx.storefront.cart().total_items(), 2);

    // Ana's response arrives after the switch and must be dropped
    ana_fetch.release(1);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let state = ctx.storefront.cart_store().state();
    assert_eq!(state.owner.unwrap().as_str(), "ben");
    assert!(!ctx.storefront.cart().is_in_cart(&ProductId::new("7")));
    assert!(ctx.storefront.cart().is_in_cart(&ProductId::new("9")));
    assert_eq!(ctx.storefront.current_cart().unwrap().total_items(), 2);
}

#[tokio::test]
async fn test_mutation_during_switch_never_touches_next_users_cart() {
    let ctx = TestContext::start();
    ctx.api.add_user("ana", true, false);
    ctx.api.add_user("ben", true, false);
    ctx.api.seed_cart_line("ana", "item-a", "7", 1);
    ctx.api.seed_cart_line("ben", "item-b", "9", 2);
    ctx.sign_in("ana").await;

    // Ben's profile check keeps his session from being published
    let ben_profile = ctx.api.hold_profile_fetches("ben");
    ctx.identity.sign_in("ben");
    ctx.settle(|_| {
        ctx.api
            .calls()
            .contains(&Call::UserProfile("ben".to_string()))
    })
    .await;
    assert_eq!(
        ctx.storefront.session().session().uid().unwrap().as_str(),
        "ana"
    );
    ctx.api.clear_calls();

    let err = ctx.storefront.cart().clear().await.unwrap_err();

    assert!(matches!(
        err,
        CartError::Credential(IdentityError::Switched { .. })
    ));
    assert!(ctx.api.writes().is_empty());
    assert!(!ctx.api.calls().contains(&Call::Cart("ben".to_string())));
    assert_eq!(ctx.api.server_cart("ben").total_items(), 2);
    assert_eq!(ctx.api.server_cart("ana").total_items(), 1);
    assert_eq!(ctx.storefront.current_cart().unwrap().total_items(), 1);

    ben_profile.release(1);
    ctx.settle(|s| {
        s.cart_store()
            .state()
            .owner
            .is_some_and(|owner| owner.as_str() == "ben")
            && !s.cart_store().state().loading
    })
    .await;
    assert_eq!(ctx.storefront.current_cart().unwrap().total_items(), 2);
}

#[tokio::test]
async fn test_sign_out_discards_cart_and_profile() {
    let ctx = TestContext::start();
    ctx.api.add_user("ana", true, false);
    ctx.api.seed_cart_line("ana", "item-a", "7", 3);
    ctx.sign_in("ana").await;
    assert_eq!(ctx.storefront.cart().total_items(), 3);

    ctx.identity.sign_out();
    ctx.settle(|s| !s.session().session().is_authenticated()).await;
    ctx.settle(|s| s.cart_store().owner().is_none()).await;

    assert_eq!(ctx.storefront.cart().total_items(), 0);
    assert!(ctx.storefront.current_cart().is_none());
    assert_eq!(ctx.storefront.profile().state().user, Completion::Unknown);
}

#[tokio::test]
async fn test_each_user_gets_own_profile_state() {
    let ctx = TestContext::start();
    ctx.api.add_user("ana", true, false);
    ctx.api.add_user("ben", false, false);

    ctx.sign_in("ana").await;
    assert_eq!(ctx.storefront.check_route("/cart"), GuardDecision::Allow);

    ctx.sign_in("ben").await;
    assert!(matches!(
        ctx.storefront.check_route("/cart"),
        GuardDecision::Redirect(redirect) if redirect.to == "/complete-profile"
    ));
}

// =============================================================================
// Teardown
// =============================================================================

#[tokio::test]
async fn test_shutdown_stops_cart_fetch_in_flight() {
    let ctx = TestContext::start();
    ctx.api.add_user("ana", true, false);
    ctx.api.seed_cart_line("ana", "item-a", "7", 1);

    let ana_cart = ctx.api.hold_cart_fetches("ana");
    ctx.identity.sign_in("ana");
    ctx.settle(|_| ctx.api.calls().contains(&Call::Cart("ana".to_string())))
        .await;

    ctx.storefront.shutdown();
    tokio::time::sleep(Duration::from_millis(20)).await;
    ana_cart.release(1);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(ctx.storefront.cart_store().cart().is_none());
    assert!(ctx.storefront.current_cart().is_none());
}

#[tokio::test]
async fn test_shutdown_releases_identity_subscription() {
    let ctx = TestContext::start();
    assert!(ctx.identity.has_subscribers());

    ctx.storefront.shutdown();

    tokio::time::timeout(Duration::from_secs(1), async {
        while ctx.identity.has_subscribers() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .unwrap();
}
