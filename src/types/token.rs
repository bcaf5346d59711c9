//! Token Types
//!
//! Token material returned by the identity provider and the persisted form
//! of the identity claims.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Token triple minted by the identity provider.
#[derive(Clone)]
pub struct TokenBundle {
    /// Signed identity token (JWT) presented to the backend APIs.
    pub id_token: String,
    /// Provider access token.
    pub access_token: String,
    /// Refresh token; absent on most refresh responses.
    pub refresh_token: Option<String>,
    /// Lifetime in seconds, as reported by the provider.
    pub expires_in: Option<u64>,
    /// Token type (usually "Bearer").
    pub token_type: String,
}

impl TokenBundle {
    /// Create a bundle with the default token type.
    pub fn new(id_token: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            id_token: id_token.into(),
            access_token: access_token.into(),
            refresh_token: None,
            expires_in: None,
            token_type: "Bearer".to_string(),
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_expires_in(mut self, seconds: u64) -> Self {
        self.expires_in = Some(seconds);
        self
    }
}

impl std::fmt::Debug for TokenBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenBundle")
            .field("id_token", &"[REDACTED]")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Identity claims as written to the persistent store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetails {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub token_expiry: DateTime<Utc>,
}
