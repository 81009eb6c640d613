//! Sign-in flow and session persistence across restarts.

use chrono::{Duration, Utc};
use kisan_setu_client::DegradableExt;
use kisan_setu_client::api::mock;
use kisan_setu_client::api::types::RegisterRequest;
use kisan_setu_client::session::{ActivityKind, AuthState};
use kisan_setu_client::store::keys;
use kisan_setu_core::{ProductId, Role, User, UserId};
use kisan_setu_integration_tests::{TestContext, mount_login, profile_json};
use serde_json::json;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_login_fetches_profile_with_new_token() {
    let ctx = TestContext::at_route("/login").await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_string_contains("username=farmer1"))
        .and(body_string_contains("password=s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-123",
            "token_type": "bearer"
        })))
        .expect(1)
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/profile"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_json(
            7, "farmer1", "farmer",
        )))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let user = ctx
        .state
        .sign_in("farmer1", "s3cret", false)
        .await
        .expect("sign in");

    assert!(!user.is_fallback());
    let user = user.into_value();
    assert_eq!(user.id, UserId::from(7));
    assert_eq!(user.role, Role::Farmer);
    assert_eq!(user.access_token.as_deref(), Some("tok-123"));
    assert_eq!(user.email.as_deref(), Some("farmer1@kisansetu.in"));

    let expiry = user.token_expiry.expect("expiry is stamped");
    let ttl = expiry - Utc::now();
    assert!(ttl > Duration::hours(23) && ttl <= Duration::days(1));

    let session = ctx.state.auth().session_info().await.expect("session");
    assert_eq!(session.login_method, "password");
    assert!(!session.remember_me);
}

#[tokio::test]
async fn test_profile_failure_leaves_minimal_user() {
    let ctx = TestContext::at_route("/login").await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-min"
        })))
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/profile"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&ctx.server)
        .await;

    let user = ctx
        .state
        .sign_in("consumer9", "pw", false)
        .await
        .expect("sign in")
        .into_value();

    assert_eq!(user.username, "consumer9");
    assert_eq!(user.access_token.as_deref(), Some("tok-min"));
    assert_eq!(user.token_type.as_deref(), Some("bearer"));
}

#[tokio::test]
async fn test_session_survives_restart() {
    let ctx = TestContext::at_route("/login").await;
    mount_login(&ctx.server, "farmer1", "farmer", "tok-keep").await;

    ctx.state
        .sign_in("farmer1", "pw", true)
        .await
        .expect("sign in");
    ctx.state
        .cart()
        .add_item(&kisan_setu_client::api::mock::products()[0])
        .await;

    let restarted = ctx.reopen();
    assert_eq!(restarted.restore().await, AuthState::Authenticated);

    let user = restarted.auth().current_user().await.expect("restored user");
    assert_eq!(user.access_token.as_deref(), Some("tok-keep"));
    let ttl = user.token_expiry.expect("expiry") - Utc::now();
    assert!(ttl > Duration::days(29));
    assert_eq!(restarted.cart().line_count().await, 1);
    assert_eq!(restarted.auth().history().entries().len(), 1);
    assert_eq!(
        restarted
            .auth()
            .history()
            .stats_for("farmer1")
            .expect("stats")
            .total_logins,
        1
    );
}

#[tokio::test]
async fn test_expired_session_is_purged_on_restart() {
    let ctx = TestContext::new().await;

    let mut user = User::new(UserId::from(3), "consumer1");
    user.access_token = Some("tok-old".to_string());
    user.token_expiry = Some(Utc::now() - Duration::minutes(1));
    ctx.state.store().set(keys::CURRENT_USER, &user);
    ctx.state.store().set(keys::CART, &Vec::<serde_json::Value>::new());
    ctx.state.store().set(keys::LOCATION, &kisan_setu_core::Location::fallback());

    let restarted = ctx.reopen();
    assert_eq!(restarted.restore().await, AuthState::Unauthenticated);
    assert!(!restarted.store().contains(keys::CURRENT_USER));
    assert!(!restarted.store().contains(keys::CART));
    // Not a session key
    assert!(restarted.store().contains(keys::LOCATION));
}

#[tokio::test]
async fn test_expired_session_does_not_bring_back_cart() {
    let ctx = TestContext::new().await;

    let mut user = User::new(UserId::from(3), "consumer1");
    user.access_token = Some("tok-old".to_string());
    user.token_expiry = Some(Utc::now() - Duration::minutes(1));
    ctx.state.store().set(keys::CURRENT_USER, &user);
    ctx.state
        .cart()
        .add_item(&mock::product_by_id(&ProductId::from(1)).expect("offline product"))
        .await;

    let restarted = ctx.reopen();
    assert_eq!(restarted.restore().await, AuthState::Unauthenticated);
    assert_eq!(restarted.cart().line_count().await, 0);

    restarted
        .cart()
        .add_item(&mock::product_by_id(&ProductId::from(2)).expect("offline product"))
        .await;
    assert_eq!(restarted.cart().line_count().await, 1);
    assert_eq!(ctx.reopen().cart().line_count().await, 1);
}

#[tokio::test]
async fn test_corrupt_session_file_counts_as_signed_out() {
    let ctx = TestContext::new().await;
    std::fs::write(
        ctx.data_dir().join(format!("{}.json", keys::CURRENT_USER)),
        "{not json",
    )
    .expect("write corrupt file");

    let restarted = ctx.reopen();
    assert_eq!(restarted.restore().await, AuthState::Unauthenticated);
}

#[tokio::test]
async fn test_register_then_sign_in() {
    let ctx = TestContext::at_route("/register").await;
    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .and(body_partial_json(json!({
            "username": "asha",
            "email": "asha@kisansetu.in",
            "user_type": "farmer"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "User registered successfully",
            "user_id": 42,
            "username": "asha"
        })))
        .expect(1)
        .mount(&ctx.server)
        .await;
    mount_login(&ctx.server, "asha", "farmer", "tok-asha").await;

    let request = RegisterRequest {
        username: "asha".to_string(),
        email: "asha@kisansetu.in".to_string(),
        password: "pw".to_string(),
        full_name: "Asha Devi".to_string(),
        phone: None,
        user_type: Role::Farmer,
    };
    let user = ctx
        .state
        .sign_up(&request, false)
        .await
        .expect("sign up")
        .into_value();

    assert_eq!(user.access_token.as_deref(), Some("tok-asha"));
    let session = ctx.state.auth().session_info().await.expect("session");
    assert_eq!(session.login_method, "register");
}

#[tokio::test]
async fn test_duplicate_registration_is_rejected() {
    let ctx = TestContext::at_route("/register").await;
    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"detail": "Username already registered"})),
        )
        .mount(&ctx.server)
        .await;

    let request = RegisterRequest {
        username: "farmer1".to_string(),
        email: "f@kisansetu.in".to_string(),
        password: "pw".to_string(),
        full_name: "Ram".to_string(),
        phone: None,
        user_type: Role::Farmer,
    };
    let err = ctx
        .state
        .sign_up(&request, false)
        .await
        .expect_err("duplicate");
    assert_eq!(
        err.user_message(kisan_setu_core::Language::En),
        "Username already registered"
    );
    assert_eq!(ctx.state.auth().state().await, AuthState::Unauthenticated);
}

#[tokio::test]
async fn test_activity_monitor_refreshes_signed_in_user() {
    let ctx = TestContext::at_route("/login").await;
    mount_login(&ctx.server, "farmer1", "farmer", "tok-1").await;
    ctx.state
        .sign_in("farmer1", "pw", false)
        .await
        .expect("sign in");
    let before = ctx
        .state
        .auth()
        .current_user()
        .await
        .and_then(|u| u.last_activity)
        .expect("login stamps activity");

    let monitor = ctx.state.spawn_activity_monitor();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    monitor.notify(ActivityKind::Keyboard);

    let mut refreshed = None;
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        refreshed = ctx
            .state
            .auth()
            .current_user()
            .await
            .and_then(|u| u.last_activity)
            .filter(|at| *at > before);
        if refreshed.is_some() {
            break;
        }
    }
    monitor.shutdown().await;

    let refreshed = refreshed.expect("activity recorded");
    let saved: User = ctx.state.store().get(keys::CURRENT_USER).expect("persisted");
    assert_eq!(saved.last_activity, Some(refreshed));
}
