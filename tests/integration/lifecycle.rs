//! Session persistence across manager instances.

use std::sync::Arc;

use dashboard_auth::{
    auth_config, ApiClient, ApiRequest, AuthError, AuthEvent, Authenticator, FileSessionStore,
    MockIdentityProvider, SessionStore, StorageKeys, TokenBundle, TokenLifecycleManager,
};
use secrecy::SecretString;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{id_token, setup_mock_server};

fn frontend_config() -> dashboard_auth::AuthConfig {
    auth_config()
        .user_pool_id("us-east-1_frontend")
        .client_id("frontend-client")
        .storage_keys(StorageKeys::frontend())
        .build()
        .expect("Failed to build config")
}

fn bundle(sub: &str, secs: i64) -> TokenBundle {
    TokenBundle::new(id_token(sub, secs), "access").with_refresh_token("refresh")
}

#[tokio::test]
async fn test_session_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let provider = Arc::new(MockIdentityProvider::new());
    provider.queue_authenticate(Ok(bundle("user-5", 3600)));

    let original = {
        let manager = TokenLifecycleManager::new(
            frontend_config(),
            Arc::clone(&provider),
            Arc::new(FileSessionStore::new(&path)),
        );
        assert_ok!(
            manager
                .sign_in("user-5@example.com", SecretString::new("pw".to_string()))
                .await
        )
    };

    let store = Arc::new(FileSessionStore::new(&path));
    let restarted =
        TokenLifecycleManager::new(frontend_config(), Arc::clone(&provider), Arc::clone(&store));
    let mut events = restarted.subscribe();

    let restored = assert_ok!(restarted.restore().await).expect("session should be restored");
    assert_eq!(restored.subject_id, original.subject_id);
    assert_eq!(restored.expires_at, original.expires_at);
    assert!(matches!(events.recv().await, Ok(AuthEvent::Ready(_))));
    assert_eq!(
        assert_ok!(restarted.get_valid_token().await),
        original.identity_token()
    );
    assert_eq!(provider.refresh_count(), 0);

    assert_ok!(restarted.sign_out().await);
    assert!(matches!(events.recv().await, Ok(AuthEvent::Cleared)));
    assert!(store.get("id_token").await.unwrap().is_none());

    let error = assert_err!(restarted.get_valid_token().await);
    assert_eq!(error, AuthError::NoSession);
}

#[tokio::test]
async fn test_expired_file_session_is_refreshed_on_first_use() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileSessionStore::new(dir.path().join("session.json")));
    let keys = StorageKeys::frontend();
    store.set(&keys.token, &id_token("user-6", -30)).await.unwrap();
    store.set(&keys.refresh_token, "stored-refresh").await.unwrap();

    let provider = Arc::new(MockIdentityProvider::new());
    let fresh = id_token("user-6", 3600);
    provider.queue_refresh(Ok(TokenBundle::new(fresh.clone(), "access-2")));

    let manager = TokenLifecycleManager::new(frontend_config(), Arc::clone(&provider), Arc::clone(&store));

    assert_eq!(assert_ok!(manager.get_valid_token().await), fresh);
    assert_eq!(provider.refresh_count(), 1);
    assert_eq!(store.get(&keys.token).await.unwrap(), Some(fresh));
    assert_eq!(
        store.get(&keys.refresh_token).await.unwrap().as_deref(),
        Some("stored-refresh")
    );
}

#[tokio::test]
async fn test_manager_behind_api_client() {
    let server = setup_mock_server().await;
    let provider = Arc::new(MockIdentityProvider::new());
    let token = id_token("user-8", 3600);
    provider.queue_authenticate(Ok(TokenBundle::new(token.clone(), "access")));

    let manager = Arc::new(TokenLifecycleManager::new(
        frontend_config(),
        provider,
        Arc::new(dashboard_auth::InMemorySessionStore::new()),
    ));
    assert_ok!(
        manager
            .sign_in("user-8@example.com", SecretString::new("pw".to_string()))
            .await
    );

    Mock::given(method("GET"))
        .and(path("/credits/balance"))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "credits": 3 })))
        .expect(1)
        .mount(&server)
        .await;

    let auth: Arc<dyn Authenticator> = manager;
    let client = ApiClient::new(auth).expect("Failed to build client");
    let response = client
        .call(ApiRequest::get(format!("{}/credits/balance", server.uri())))
        .await;

    assert!(response.ok);
    assert_eq!(response.data["credits"], 3);
}
