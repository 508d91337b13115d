/// Integration tests for accounts and sessions

mod common;

use choreboard_client::error::ClientError;
use choreboard_client::Choreboard;
use choreboard_shared::auth::session::SESSION_STORAGE_KEY;
use choreboard_shared::models::user::UserRole;
use choreboard_shared::remote::query::Table;
use choreboard_shared::storage::KeyValueStore;
use common::{TestContext, PASSWORD};
use std::sync::Arc;

#[tokio::test]
async fn test_sign_up_creates_profile_and_session() {
    let ctx = TestContext::new();
    let host = ctx.user("alice", UserRole::Host).await;

    assert_eq!(host.user.username, "alice");
    assert_eq!(host.user.email, "alice@example.com");
    assert!(host.user.is_host());

    let current = host.app.auth.current_user().await.unwrap().unwrap();
    assert_eq!(current.id, host.id());
    assert!(host.app.auth.session().await.is_some());
    assert!(host.app.auth.is_email_verified().await.unwrap());

    // Session persisted on the device
    assert!(host.store.get_item(SESSION_STORAGE_KEY).await.unwrap().is_some());
    assert_eq!(ctx.backend.row_count(Table::Users).await, 1);
}

#[tokio::test]
async fn test_sign_up_validation_happens_before_remote_call() {
    let ctx = TestContext::new();
    let (app, _store) = ctx.device();

    let mut request = TestContext::sign_up_request("bob", UserRole::Tenant);
    request.username = "b!".to_string();
    request.password = "123".to_string();

    let err = app.auth.sign_up(request).await.unwrap_err();
    let ClientError::Validation(details) = &err else {
        panic!("expected validation error, got {err:?}");
    };
    assert_eq!(details.len(), 2);
    assert!(err.to_string().contains("Password must be at least 6 characters"));

    assert_eq!(ctx.backend.row_count(Table::Users).await, 0);
    assert!(app.auth.current_user().await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_sign_up_is_rejected() {
    let ctx = TestContext::new();
    ctx.user("alice", UserRole::Host).await;

    let (app, _store) = ctx.device();
    let err = app
        .auth
        .sign_up(TestContext::sign_up_request("alice", UserRole::Tenant))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Authentication(_)));
    assert_eq!(err.to_string(), "User already registered");
    assert_eq!(ctx.backend.row_count(Table::Users).await, 1);
}

#[tokio::test]
async fn test_sign_in_and_sign_out() {
    let ctx = TestContext::new();
    let tenant = ctx.user("carol", UserRole::Tenant).await;

    let (app, store) = ctx.device();
    let err = app.auth.sign_in("carol@example.com", "wrong-password").await.unwrap_err();
    assert!(matches!(err, ClientError::Authentication(_)));
    assert_eq!(err.to_string(), "Invalid login credentials");

    let user = app.auth.sign_in("carol@example.com", PASSWORD).await.unwrap();
    assert_eq!(user.id, tenant.id());
    assert!(store.get_item(SESSION_STORAGE_KEY).await.unwrap().is_some());

    app.auth.sign_out().await.unwrap();
    assert!(app.auth.current_user().await.unwrap().is_none());
    assert!(app.auth.session().await.is_none());
    assert!(store.get_item(SESSION_STORAGE_KEY).await.unwrap().is_none());
}

#[tokio::test]
async fn test_signed_out_operations_require_authentication() {
    let ctx = TestContext::new();
    let (host, house) = ctx.host_with_house("alice", 3).await;
    let chore = host.create_chore(&house, "Dishes").await;

    host.app.auth.sign_out().await.unwrap();

    let err = host.app.chores.complete_chore(chore.id).await.unwrap_err();
    assert!(matches!(err, ClientError::Authentication(_)));
    assert_eq!(err.to_string(), "User not authenticated");

    let err = host.app.houses.remove_tenant(house.id, host.id()).await.unwrap_err();
    assert_eq!(err.to_string(), "User not authenticated");

    assert!(host.app.houses.get_current_user_house().await.unwrap().is_none());
}

#[tokio::test]
async fn test_email_confirmation_flow() {
    let ctx = TestContext::with_email_confirmation();
    let (app, store) = ctx.device();

    let user = app
        .auth
        .sign_up(TestContext::sign_up_request("dave", UserRole::Tenant))
        .await
        .unwrap();
    assert_eq!(user.username, "dave");
    assert!(app.auth.session().await.is_none());
    assert!(store.get_item(SESSION_STORAGE_KEY).await.unwrap().is_none());

    let err = app.auth.sign_in("dave@example.com", PASSWORD).await.unwrap_err();
    assert_eq!(err.to_string(), "Email not confirmed");

    // Nobody is signed in on this device yet
    let err = app.auth.resend_verification_email().await.unwrap_err();
    assert_eq!(err.to_string(), "No user found");

    app.auth.resend_verification_email_to("dave@example.com").await.unwrap();
    assert_eq!(ctx.backend.sent_verification_emails().await.len(), 2);

    assert!(ctx.backend.confirm_email("dave@example.com").await);
    app.auth.sign_in("dave@example.com", PASSWORD).await.unwrap();
    assert!(app.auth.is_email_verified().await.unwrap());
}

#[tokio::test]
async fn test_restore_session_on_new_remote_handle() {
    let ctx = TestContext::new();
    let host = ctx.user("alice", UserRole::Host).await;

    // Same device storage, fresh process
    let restarted = Choreboard::new(Arc::new(ctx.backend.client()), host.store.clone());
    let restored = restarted.auth.restore_session().await.unwrap().unwrap();
    assert_eq!(restored.id, host.id());
    assert!(restarted.auth.session().await.is_some());
}

#[tokio::test]
async fn test_restore_session_discards_revoked_session() {
    let ctx = TestContext::new();
    let host = ctx.user("alice", UserRole::Host).await;
    let stored = host.store.get_item(SESSION_STORAGE_KEY).await.unwrap().unwrap();

    host.app.auth.sign_out().await.unwrap();
    host.store.set_item(SESSION_STORAGE_KEY, &stored).await.unwrap();

    let restarted = Choreboard::new(Arc::new(ctx.backend.client()), host.store.clone());
    assert!(restarted.auth.restore_session().await.unwrap().is_none());
    assert!(host.store.get_item(SESSION_STORAGE_KEY).await.unwrap().is_none());
}

#[tokio::test]
async fn test_restore_session_discards_corrupt_entry() {
    let ctx = TestContext::new();
    let (app, store) = ctx.device();
    store.set_item(SESSION_STORAGE_KEY, "{not json").await.unwrap();

    assert!(app.auth.restore_session().await.unwrap().is_none());
    assert!(store.get_item(SESSION_STORAGE_KEY).await.unwrap().is_none());
}

#[tokio::test]
async fn test_auth_state_initialize() {
    let ctx = TestContext::new();
    let host = ctx.user("alice", UserRole::Host).await;

    // Restoring keeps the user signed in
    let restarted = Choreboard::new(Arc::new(ctx.backend.client()), host.store.clone());
    let state = restarted.auth_state(true);
    assert!(state.is_loading().await);
    state.initialize().await;
    assert!(!state.is_loading().await);
    assert_eq!(state.user().await.unwrap().id, host.id());
    assert!(state.session().await.is_some());

    // Without restore the stored session is dropped
    let restarted = Choreboard::new(Arc::new(ctx.backend.client()), host.store.clone());
    let state = restarted.auth_state(false);
    state.initialize().await;
    assert!(state.user().await.is_none());
    assert!(host.store.get_item(SESSION_STORAGE_KEY).await.unwrap().is_none());

    let user = state.sign_in("alice@example.com", PASSWORD).await.unwrap();
    assert_eq!(state.user().await.unwrap().id, user.id);

    state.sign_out().await.unwrap();
    let snapshot = state.snapshot().await;
    assert!(snapshot.user.is_none());
    assert!(snapshot.session.is_none());
}
