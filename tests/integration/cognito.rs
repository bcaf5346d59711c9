//! User-pool protocol through the lifecycle manager.

use std::sync::Arc;

use dashboard_auth::{
    AuthErrorKind, CognitoIdentityProvider, InMemorySessionStore, SessionStore, StorageKeys,
    TokenLifecycleManager,
};
use secrecy::SecretString;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::body_partial_json;
use wiremock::{MockServer, ResponseTemplate};

use crate::common::*;

type Manager = TokenLifecycleManager<CognitoIdentityProvider, InMemorySessionStore>;

fn manager(server: &MockServer) -> (Manager, Arc<InMemorySessionStore>) {
    let config = config_for(server);
    let provider =
        Arc::new(CognitoIdentityProvider::new(&config).expect("Failed to build provider"));
    let store = Arc::new(InMemorySessionStore::new());
    (
        TokenLifecycleManager::new(config, provider, Arc::clone(&store)),
        store,
    )
}

fn password() -> SecretString {
    SecretString::new("Passw0rd!".to_string())
}

#[tokio::test]
async fn test_sign_in_with_password_flow() {
    let server = setup_mock_server().await;
    let token = id_token("user-1", 3600);

    user_pool_action("InitiateAuth")
        .and(body_partial_json(json!({
            "AuthFlow": "USER_PASSWORD_AUTH",
            "ClientId": "integration-client",
            "AuthParameters": { "USERNAME": "user-1@example.com", "PASSWORD": "Passw0rd!" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_result(&token, Some("refresh-1"))))
        .expect(1)
        .mount(&server)
        .await;

    let (manager, store) = manager(&server);
    let session = assert_ok!(manager.sign_in("user-1@example.com", password()).await);

    assert_eq!(session.subject_id, "user-1");
    assert_eq!(session.email.as_deref(), Some("user-1@example.com"));

    // Fresh token: served from memory.
    assert_eq!(assert_ok!(manager.get_valid_token().await), token);
    assert_eq!(
        store.get(&StorageKeys::admin().refresh_token).await.unwrap().as_deref(),
        Some("refresh-1")
    );
}

#[tokio::test]
async fn test_wrong_password_is_invalid_credentials() {
    let server = setup_mock_server().await;
    user_pool_action("InitiateAuth")
        .respond_with(error_response(
            400,
            "NotAuthorizedException",
            "Incorrect username or password.",
        ))
        .mount(&server)
        .await;

    let (manager, store) = manager(&server);
    let error = assert_err!(manager.sign_in("user@example.com", password()).await);

    assert_eq!(error.kind(), AuthErrorKind::InvalidCredentials);
    assert_eq!(error.message(), Some("Incorrect username or password."));
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_password_reset_required() {
    let server = setup_mock_server().await;
    user_pool_action("InitiateAuth")
        .respond_with(error_response(
            400,
            "PasswordResetRequiredException",
            "Password reset required for the user",
        ))
        .mount(&server)
        .await;

    let (manager, _) = manager(&server);
    let error = assert_err!(manager.sign_in("user@example.com", password()).await);
    assert_eq!(error.kind(), AuthErrorKind::NewPasswordRequired);
}

#[tokio::test]
async fn test_concurrent_callers_trigger_one_refresh() {
    let server = setup_mock_server().await;
    let refreshed = id_token("user-2", 3600);

    user_pool_action("InitiateAuth")
        .and(body_partial_json(json!({ "AuthFlow": "USER_PASSWORD_AUTH" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(auth_result(&id_token("user-2", 60), Some("refresh-2"))),
        )
        .expect(1)
        .mount(&server)
        .await;

    user_pool_action("InitiateAuth")
        .and(body_partial_json(json!({
            "AuthFlow": "REFRESH_TOKEN_AUTH",
            "AuthParameters": { "REFRESH_TOKEN": "refresh-2" }
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(auth_result(&refreshed, None))
                .set_delay(std::time::Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (manager, store) = manager(&server);
    assert_ok!(manager.sign_in("user-2@example.com", password()).await);

    let results = futures::future::join_all((0..8).map(|_| manager.get_valid_token())).await;
    for result in results {
        assert_eq!(assert_ok!(result), refreshed);
    }

    let keys = StorageKeys::admin();
    assert_eq!(
        store.get(&keys.token).await.unwrap().as_deref(),
        Some(refreshed.as_str())
    );
    assert_eq!(
        store.get(&keys.refresh_token).await.unwrap().as_deref(),
        Some("refresh-2")
    );
}

#[tokio::test]
async fn test_revoked_refresh_token() {
    let server = setup_mock_server().await;

    user_pool_action("InitiateAuth")
        .and(body_partial_json(json!({ "AuthFlow": "USER_PASSWORD_AUTH" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(auth_result(&id_token("user-3", 30), Some("refresh-3"))),
        )
        .mount(&server)
        .await;

    user_pool_action("InitiateAuth")
        .and(body_partial_json(json!({ "AuthFlow": "REFRESH_TOKEN_AUTH" })))
        .respond_with(error_response(
            400,
            "NotAuthorizedException",
            "Refresh Token has been revoked",
        ))
        .mount(&server)
        .await;

    let (manager, _) = manager(&server);
    let session = assert_ok!(manager.sign_in("user-3@example.com", password()).await);

    let error = assert_err!(manager.get_valid_token().await);
    assert_eq!(error.kind(), AuthErrorKind::RefreshFailed);
    assert!(error.needs_reauth());

    // Session stays in place for the caller to decide.
    assert_eq!(
        manager.current_session().map(|s| s.expires_at),
        Some(session.expires_at)
    );
}

#[tokio::test]
async fn test_validate_session_uses_get_user() {
    let server = setup_mock_server().await;

    user_pool_action("InitiateAuth")
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(auth_result(&id_token("user-4", 3600), Some("refresh-4"))),
        )
        .mount(&server)
        .await;

    user_pool_action("GetUser")
        .and(body_partial_json(json!({ "AccessToken": "access-token" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Username": "user-4",
            "UserAttributes": [{ "Name": "email", "Value": "user-4@example.com" }]
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    user_pool_action("GetUser")
        .respond_with(error_response(
            400,
            "NotAuthorizedException",
            "Access Token has been revoked",
        ))
        .mount(&server)
        .await;

    let (manager, _) = manager(&server);
    assert_ok!(manager.sign_in("user-4@example.com", password()).await);

    assert_ok!(manager.validate_session().await);
    let error = assert_err!(manager.validate_session().await);
    assert_eq!(error.kind(), AuthErrorKind::SessionInvalid);
}

#[tokio::test]
async fn test_unreachable_provider_is_unknown_on_sign_in() {
    let server = setup_mock_server().await;
    let (manager, _) = manager(&server);
    drop(server);

    let error = assert_err!(manager.sign_in("user@example.com", password()).await);
    assert_eq!(error.kind(), AuthErrorKind::Unknown);
}
