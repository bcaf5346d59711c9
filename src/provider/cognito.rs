//! Cognito User Pool Client
//!
//! Speaks the user-pool JSON protocol directly: every operation is a POST to
//! the regional endpoint with an `X-Amz-Target` header naming the action.
//! App clients used by the dashboard are public, so requests are unsigned.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::core::{HttpMethod, HttpRequest, HttpTransport, ReqwestHttpTransport};
use crate::error::{create_error_from_response, AuthError, ProviderOperation};
use crate::provider::IdentityProvider;
use crate::types::{AuthConfig, TokenBundle};

const TARGET_PREFIX: &str = "AWSCognitoIdentityProviderService";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const NEW_PASSWORD_REQUIRED: &str = "NEW_PASSWORD_REQUIRED";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthResponse {
    #[serde(default)]
    authentication_result: Option<AuthenticationResult>,
    #[serde(default)]
    challenge_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthenticationResult {
    id_token: String,
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    token_type: Option<String>,
}

impl std::fmt::Debug for AuthenticationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticationResult")
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

impl From<AuthenticationResult> for TokenBundle {
    fn from(result: AuthenticationResult) -> Self {
        Self {
            id_token: result.id_token,
            access_token: result.access_token,
            refresh_token: result.refresh_token,
            expires_in: result.expires_in,
            token_type: result.token_type.unwrap_or_else(|| "Bearer".to_string()),
        }
    }
}

/// Cognito user-pool identity provider.
pub struct CognitoIdentityProvider<T: HttpTransport = ReqwestHttpTransport> {
    endpoint: String,
    client_id: String,
    timeout: Duration,
    global_sign_out: bool,
    transport: Arc<T>,
}

impl CognitoIdentityProvider<ReqwestHttpTransport> {
    /// Create a provider with the default reqwest transport.
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        let transport = ReqwestHttpTransport::with_options(
            config.timeout,
            crate::core::DEFAULT_MAX_RESPONSE_SIZE,
        )
        .map_err(|e| AuthError::unknown(e.to_string()))?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }
}

impl<T: HttpTransport + 'static> CognitoIdentityProvider<T> {
    /// Create a provider over a custom transport.
    pub fn with_transport(config: &AuthConfig, transport: Arc<T>) -> Self {
        Self {
            endpoint: config.provider_endpoint(),
            client_id: config.client_id.clone(),
            timeout: config.timeout,
            global_sign_out: config.global_sign_out,
            transport,
        }
    }

    fn build_request(&self, action: &str, payload: &Value) -> HttpRequest {
        HttpRequest::new(HttpMethod::Post, self.endpoint.clone())
            .header("content-type", CONTENT_TYPE)
            .header("x-amz-target", format!("{}.{}", TARGET_PREFIX, action))
            .body(payload.to_string())
            .timeout(self.timeout)
    }

    async fn invoke(
        &self,
        operation: ProviderOperation,
        action: &str,
        payload: Value,
    ) -> Result<String, AuthError> {
        let request = self.build_request(action, &payload);
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| operation.transport_failure(&e))?;

        if !response.is_success() {
            let error = create_error_from_response(operation, response.status, &response.body);
            debug!(
                action,
                status = response.status,
                kind = %error.kind(),
                "user pool rejected request"
            );
            return Err(error);
        }

        Ok(response.body)
    }

    async fn initiate_auth(
        &self,
        operation: ProviderOperation,
        flow: &str,
        parameters: Value,
    ) -> Result<TokenBundle, AuthError> {
        let payload = json!({
            "AuthFlow": flow,
            "ClientId": self.client_id,
            "AuthParameters": parameters,
        });
        let body = self.invoke(operation, "InitiateAuth", payload).await?;

        let parsed: InitiateAuthResponse = serde_json::from_str(&body).map_err(|e| {
            let message = format!("malformed InitiateAuth response: {}", e);
            match operation {
                ProviderOperation::Refresh => AuthError::refresh_failed(message),
                _ => AuthError::unknown(message),
            }
        })?;

        if let Some(result) = parsed.authentication_result {
            return Ok(result.into());
        }

        match parsed.challenge_name.as_deref() {
            Some(NEW_PASSWORD_REQUIRED) => Err(AuthError::NewPasswordRequired {
                message: Some("New password required".to_string()),
            }),
            Some(challenge) => Err(AuthError::unknown(format!(
                "unsupported challenge: {}",
                challenge
            ))),
            None => Err(AuthError::unknown("InitiateAuth returned no tokens")),
        }
    }
}

#[async_trait]
impl<T: HttpTransport + 'static> IdentityProvider for CognitoIdentityProvider<T> {
    #[instrument(skip(self, password), fields(flow = "USER_PASSWORD_AUTH"))]
    async fn authenticate(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<TokenBundle, AuthError> {
        self.initiate_auth(
            ProviderOperation::SignIn,
            "USER_PASSWORD_AUTH",
            json!({
                "USERNAME": username,
                "PASSWORD": password.expose_secret(),
            }),
        )
        .await
    }

    #[instrument(skip(self, refresh_token), fields(flow = "REFRESH_TOKEN_AUTH"))]
    async fn refresh(
        &self,
        refresh_token: &SecretString,
        username: Option<&str>,
    ) -> Result<TokenBundle, AuthError> {
        let mut parameters = json!({ "REFRESH_TOKEN": refresh_token.expose_secret() });
        if let Some(username) = username {
            parameters["USERNAME"] = Value::String(username.to_string());
        }
        self.initiate_auth(ProviderOperation::Refresh, "REFRESH_TOKEN_AUTH", parameters)
            .await
    }

    async fn sign_out(&self, access_token: Option<&SecretString>) -> Result<(), AuthError> {
        let Some(access_token) = access_token.filter(|_| self.global_sign_out) else {
            return Ok(());
        };

        let request = self.build_request(
            "GlobalSignOut",
            &json!({ "AccessToken": access_token.expose_secret() }),
        );
        let transport = Arc::clone(&self.transport);
        tokio::spawn(async move {
            match transport.send(request).await {
                Ok(response) if response.is_success() => debug!("global sign-out accepted"),
                Ok(response) => warn!(status = response.status, "global sign-out rejected"),
                Err(e) => warn!(error = %e, "global sign-out failed"),
            }
        });
        Ok(())
    }

    #[instrument(skip(self, access_token))]
    async fn verify_session(&self, access_token: &SecretString) -> Result<(), AuthError> {
        self.invoke(
            ProviderOperation::Verify,
            "GetUser",
            json!({ "AccessToken": access_token.expose_secret() }),
        )
        .await
        .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{HttpResponse, MockHttpTransport};
    use crate::error::{AuthErrorKind, TransportError};

    fn config() -> AuthConfig {
        AuthConfig {
            client_id: "client-123".to_string(),
            user_pool_id: "us-east-1_abc".to_string(),
            ..Default::default()
        }
    }

    fn provider(transport: Arc<MockHttpTransport>) -> CognitoIdentityProvider<MockHttpTransport> {
        CognitoIdentityProvider::with_transport(&config(), transport)
    }

    #[tokio::test]
    async fn test_authenticate_builds_initiate_auth_request() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.queue_json_response(
            200,
            &json!({
                "AuthenticationResult": {
                    "IdToken": "id",
                    "AccessToken": "access",
                    "RefreshToken": "refresh",
                    "ExpiresIn": 3600,
                    "TokenType": "Bearer"
                },
                "ChallengeParameters": {}
            }),
        );

        let bundle = provider(transport.clone())
            .authenticate("user@example.com", &SecretString::new("pw".to_string()))
            .await
            .unwrap();
        assert_eq!(bundle.id_token, "id");
        assert_eq!(bundle.refresh_token.as_deref(), Some("refresh"));
        assert_eq!(bundle.expires_in, Some(3600));

        let request = transport.get_last_request().unwrap();
        assert_eq!(request.url, "https://cognito-idp.us-east-1.amazonaws.com/");
        assert_eq!(
            request.headers.get("x-amz-target").map(String::as_str),
            Some("AWSCognitoIdentityProviderService.InitiateAuth")
        );
        let body: Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["AuthFlow"], "USER_PASSWORD_AUTH");
        assert_eq!(body["ClientId"], "client-123");
        assert_eq!(body["AuthParameters"]["USERNAME"], "user@example.com");
    }

    #[tokio::test]
    async fn test_new_password_challenge() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.queue_json_response(
            200,
            &json!({
                "ChallengeName": "NEW_PASSWORD_REQUIRED",
                "Session": "opaque",
                "ChallengeParameters": { "USER_ID_FOR_SRP": "user" }
            }),
        );

        let error = provider(transport)
            .authenticate("user", &SecretString::new("pw".to_string()))
            .await
            .unwrap_err();
        assert_eq!(error.kind(), AuthErrorKind::NewPasswordRequired);
    }

    #[tokio::test]
    async fn test_refresh_network_error_is_refresh_failed() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.queue_error(TransportError::ConnectionFailed {
            message: "connection reset".to_string(),
        });

        let error = provider(transport)
            .refresh(&SecretString::new("refresh".to_string()), None)
            .await
            .unwrap_err();
        assert_eq!(error.kind(), AuthErrorKind::RefreshFailed);
        assert!(error.message().unwrap().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_verify_session_rejected() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.queue_response(HttpResponse {
            status: 400,
            status_text: "Bad Request".to_string(),
            headers: Default::default(),
            body: r#"{"__type":"NotAuthorizedException","message":"Access Token has been revoked"}"#
                .to_string(),
        });

        let error = provider(transport)
            .verify_session(&SecretString::new("access".to_string()))
            .await
            .unwrap_err();
        assert_eq!(error.kind(), AuthErrorKind::SessionInvalid);
    }

    #[tokio::test]
    async fn test_sign_out_is_local_by_default() {
        let transport = Arc::new(MockHttpTransport::new());
        provider(transport.clone())
            .sign_out(Some(&SecretString::new("access".to_string())))
            .await
            .unwrap();
        assert!(transport.get_requests().is_empty());
    }
}
