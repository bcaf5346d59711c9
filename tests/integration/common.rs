//! Shared helpers.

use chrono::Utc;
use dashboard_auth::{auth_config, AuthConfig, ADMIN_REFRESH_SKEW};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use wiremock::matchers::{header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TARGET_PREFIX: &str = "AWSCognitoIdentityProviderService";

pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Identity token expiring `secs` from now.
pub fn id_token(sub: &str, secs: i64) -> String {
    let claims = json!({
        "sub": sub,
        "email": format!("{}@example.com", sub),
        "exp": Utc::now().timestamp() + secs,
        "token_use": "id",
    });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"integration"),
    )
    .expect("Failed to mint token")
}

/// Admin-preset config pointed at the mock server.
pub fn config_for(server: &MockServer) -> AuthConfig {
    auth_config()
        .user_pool_id("us-east-1_integration")
        .client_id("integration-client")
        .endpoint(format!("{}/", server.uri()))
        .refresh_skew(ADMIN_REFRESH_SKEW)
        .build()
        .expect("Failed to build config")
}

/// `InitiateAuth` success body.
pub fn auth_result(id_token: &str, refresh_token: Option<&str>) -> Value {
    let mut result = json!({
        "IdToken": id_token,
        "AccessToken": "access-token",
        "ExpiresIn": 3600,
        "TokenType": "Bearer",
    });
    if let Some(refresh_token) = refresh_token {
        result["RefreshToken"] = json!(refresh_token);
    }
    json!({ "AuthenticationResult": result, "ChallengeParameters": {} })
}

/// Mock matching a user-pool action.
pub fn user_pool_action(action: &str) -> wiremock::MockBuilder {
    Mock::given(method("POST"))
        .and(header("x-amz-target", format!("{}.{}", TARGET_PREFIX, action).as_str()))
        .and(header("content-type", "application/x-amz-json-1.1"))
}

pub fn error_response(status: u16, error_type: &str, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status)
        .set_body_json(json!({ "__type": error_type, "message": message }))
}
