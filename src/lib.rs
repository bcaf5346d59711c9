//! Dashboard Authentication
//!
//! Identity token lifecycle for the admin dashboard and customer frontend,
//! backed by a Cognito user pool.
//!
//! # Features
//!
//! - Password sign-in (`USER_PASSWORD_AUTH`) and local sign-out
//! - Identity tokens renewed ahead of expiry, one refresh shared by all callers
//! - Session persistence across restarts
//! - Session change notifications
//! - Authenticated Jobs and Credits API clients
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use dashboard_auth::core::claims::token_preview;
//! use dashboard_auth::{
//!     AuthConfigBuilder, CognitoIdentityProvider, FileSessionStore, TokenLifecycleManager,
//! };
//! use secrecy::SecretString;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AuthConfigBuilder::admin()
//!         .user_pool_id("us-east-1_Example")
//!         .client_id("my-app-client")
//!         .build()?;
//!
//!     let provider = Arc::new(CognitoIdentityProvider::new(&config)?);
//!     let store = Arc::new(FileSessionStore::new("session.json"));
//!     let auth = Arc::new(TokenLifecycleManager::new(config, provider, store));
//!
//!     if auth.restore().await?.is_none() {
//!         auth.sign_in("admin@example.com", SecretString::new("...".into())).await?;
//!     }
//!
//!     let token = auth.get_valid_token().await?;
//!     println!("Authorization: Bearer {}", token_preview(&token));
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `types`: sessions, tokens, events and configuration
//! - `error`: error hierarchy and provider error mapping
//! - `core`: HTTP transport and identity token claims
//! - `provider`: identity provider interface and the Cognito client
//! - `token`: session stores and the lifecycle manager
//! - `api`: authenticated backend API clients
//! - `builders`: configuration builder
//! - `telemetry`: metrics

pub mod api;
pub mod builders;
pub mod core;
pub mod error;
pub mod provider;
pub mod telemetry;
pub mod token;
pub mod types;

// Re-export builders
pub use builders::{auth_config, AuthConfigBuilder};

// Re-export error types
pub use error::{
    create_error_from_response, get_user_message, AuthError, AuthErrorKind, ConfigurationError,
    StorageError, TransportError,
};

// Re-export types
pub use types::{
    ApiEndpoints, AuthConfig, AuthEvent, Session, StorageKeys, TokenBundle, UserDetails,
    ADMIN_REFRESH_SKEW, DEFAULT_REFRESH_SKEW, MAX_REFRESH_SKEW,
};

// Re-export core components
pub use crate::core::{
    HttpMethod, HttpRequest, HttpResponse,
    HttpTransport, MockHttpTransport, ReqwestHttpTransport,
};

// Re-export provider components
pub use provider::{
    create_mock_identity_provider, CognitoIdentityProvider, IdentityProvider,
    MockIdentityProvider,
};

// Re-export token management
pub use token::{
    create_in_memory_session_store, create_mock_authenticator, create_mock_session_store,
    is_admin, is_admin_in, Authenticator, FileSessionStore, InMemorySessionStore,
    MockAuthenticator, MockSessionStore, SessionStore, TokenLifecycleManager, ADMIN_SUBJECT_IDS,
};

// Re-export API clients
pub use api::{
    format_bytes, format_duration, ApiClient, ApiRequest, ApiResponse, CreditOperation,
    CreditsApi, JobsApi,
};

// Re-export telemetry
pub use telemetry::{
    create_in_memory_metrics, no_op_metrics, AuthMetrics, InMemoryMetrics, NoOpMetrics,
};

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    use crate::types::TokenBundle;

    /// Signed (HS256, throwaway key) identity token.
    pub fn mint_id_token(sub: &str, email: Option<&str>, exp: i64) -> String {
        let mut claims = json!({
            "sub": sub,
            "exp": exp,
            "name": format!("User {}", sub),
            "token_use": "id",
        });
        if let Some(email) = email {
            claims["email"] = json!(email);
        }
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-signing-key"),
        )
        .unwrap()
    }

    /// Provider bundle whose identity token expires `secs` from now.
    pub fn bundle_expiring_in(sub: &str, secs: i64) -> TokenBundle {
        let email = format!("{}@example.com", sub);
        TokenBundle::new(
            mint_id_token(sub, Some(&email), Utc::now().timestamp() + secs),
            format!("access-{}", sub),
        )
        .with_refresh_token(format!("refresh-{}", sub))
        .with_expires_in(secs.max(0) as u64)
    }
}
