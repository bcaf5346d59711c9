//! Configuration Types
//!
//! Identity provider, persistence and API endpoint configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::token::admin::ADMIN_SUBJECT_IDS;

/// Default margin before expiry at which a token is renewed.
pub const DEFAULT_REFRESH_SKEW: Duration = Duration::from_secs(300);

/// Refresh margin used by the admin dashboard.
pub const ADMIN_REFRESH_SKEW: Duration = Duration::from_secs(120);

/// Largest accepted refresh margin.
pub const MAX_REFRESH_SKEW: Duration = Duration::from_secs(600);

/// Authentication configuration.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// Region hosting the user pool.
    pub region: String,
    /// User pool identifier, `<region>_<id>`.
    pub user_pool_id: String,
    /// App client identifier (public client, no secret).
    pub client_id: String,
    /// Override for the user-pool API endpoint.
    pub endpoint: Option<String>,
    /// Renew the identity token this long before it expires.
    pub refresh_skew: Duration,
    /// HTTP timeout for provider calls.
    pub timeout: Duration,
    /// Keys used in the persistent store.
    pub storage_keys: StorageKeys,
    /// Subject identifiers allowed into the admin views.
    pub admin_subjects: Vec<String>,
    /// Revoke tokens server-side (in the background) on sign-out.
    pub global_sign_out: bool,
}

impl AuthConfig {
    /// User-pool API endpoint.
    pub fn provider_endpoint(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| format!("https://cognito-idp.{}.amazonaws.com/", self.region))
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            user_pool_id: String::new(),
            client_id: String::new(),
            endpoint: None,
            refresh_skew: DEFAULT_REFRESH_SKEW,
            timeout: Duration::from_secs(30),
            storage_keys: StorageKeys::default(),
            admin_subjects: ADMIN_SUBJECT_IDS.iter().map(|s| s.to_string()).collect(),
            global_sign_out: false,
        }
    }
}

/// Fixed key names used in the persistent store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageKeys {
    pub token: String,
    pub user_details: String,
    pub refresh_token: String,
}

impl StorageKeys {
    /// Keys used by the admin dashboard (tab-scoped storage).
    pub fn admin() -> Self {
        Self {
            token: "adminAuthToken".to_string(),
            user_details: "adminUserDetails".to_string(),
            refresh_token: "adminRefreshToken".to_string(),
        }
    }

    /// Keys used by the customer frontend (origin-scoped storage).
    pub fn frontend() -> Self {
        Self {
            token: "id_token".to_string(),
            user_details: "user_details".to_string(),
            refresh_token: "refresh_token".to_string(),
        }
    }

    /// All keys, in write order.
    pub fn all(&self) -> [&str; 3] {
        [
            self.token.as_str(),
            self.user_details.as_str(),
            self.refresh_token.as_str(),
        ]
    }
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self::admin()
    }
}

/// Base URLs of the backend APIs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiEndpoints {
    /// Jobs API, including stage and version path.
    pub jobs: String,
    /// Credits API.
    pub credits: String,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self {
            jobs: "https://l3erksseb4.execute-api.us-east-1.amazonaws.com/prod/v1".to_string(),
            credits: "https://dbmr3la6d3.execute-api.us-east-1.amazonaws.com".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_endpoint_from_region() {
        let config = AuthConfig {
            region: "eu-west-1".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.provider_endpoint(),
            "https://cognito-idp.eu-west-1.amazonaws.com/"
        );

        let config = AuthConfig {
            endpoint: Some("http://127.0.0.1:9229/".to_string()),
            ..Default::default()
        };
        assert_eq!(config.provider_endpoint(), "http://127.0.0.1:9229/");
    }

    #[test]
    fn test_storage_key_presets_differ() {
        assert_ne!(StorageKeys::admin(), StorageKeys::frontend());
        assert_eq!(StorageKeys::default().token, "adminAuthToken");
        assert_eq!(StorageKeys::frontend().all(), ["id_token", "user_details", "refresh_token"]);
    }
}
