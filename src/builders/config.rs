//! Configuration Builder
//!
//! Fluent builder for authentication configuration.

use std::time::Duration;
use url::Url;

use crate::error::ConfigurationError;
use crate::types::{AuthConfig, StorageKeys, ADMIN_REFRESH_SKEW, MAX_REFRESH_SKEW};

pub const ENV_REGION: &str = "DASHBOARD_AUTH_REGION";
pub const ENV_USER_POOL_ID: &str = "DASHBOARD_AUTH_USER_POOL_ID";
pub const ENV_CLIENT_ID: &str = "DASHBOARD_AUTH_CLIENT_ID";
pub const ENV_ENDPOINT: &str = "DASHBOARD_AUTH_ENDPOINT";
pub const ENV_REFRESH_SKEW_SECS: &str = "DASHBOARD_AUTH_REFRESH_SKEW_SECS";

/// Authentication configuration builder.
pub struct AuthConfigBuilder {
    config: AuthConfig,
    client_id: Option<String>,
    user_pool_id: Option<String>,
}

impl AuthConfigBuilder {
    /// Create new configuration builder.
    pub fn new() -> Self {
        Self {
            config: AuthConfig::default(),
            client_id: None,
            user_pool_id: None,
        }
    }

    /// Builder preset for the admin dashboard: admin keys, 2 minute skew.
    pub fn admin() -> Self {
        Self::new()
            .storage_keys(StorageKeys::admin())
            .refresh_skew(ADMIN_REFRESH_SKEW)
    }

    /// Builder preset for the customer frontend.
    pub fn frontend() -> Self {
        Self::new().storage_keys(StorageKeys::frontend())
    }

    /// Read settings from `DASHBOARD_AUTH_*` environment variables.
    pub fn from_env(self) -> Result<Self, ConfigurationError> {
        self.from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through a lookup function; unset keys keep their value.
    pub fn from_lookup<F>(mut self, lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(region) = lookup(ENV_REGION) {
            self = self.region(region);
        }
        if let Some(pool) = lookup(ENV_USER_POOL_ID) {
            self = self.user_pool_id(pool);
        }
        if let Some(client) = lookup(ENV_CLIENT_ID) {
            self = self.client_id(client);
        }
        if let Some(endpoint) = lookup(ENV_ENDPOINT) {
            self = self.endpoint(endpoint);
        }
        if let Some(raw) = lookup(ENV_REFRESH_SKEW_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|_| ConfigurationError::InvalidConfig {
                message: format!("{} must be a number of seconds, got {:?}", ENV_REFRESH_SKEW_SECS, raw),
            })?;
            self = self.refresh_skew(Duration::from_secs(secs));
        }
        Ok(self)
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.config.region = region.into();
        self
    }

    pub fn user_pool_id(mut self, user_pool_id: impl Into<String>) -> Self {
        self.user_pool_id = Some(user_pool_id.into());
        self
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Override the user-pool endpoint (local emulators, tests).
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = Some(endpoint.into());
        self
    }

    /// Set how long before expiry the token is renewed.
    pub fn refresh_skew(mut self, skew: Duration) -> Self {
        self.config.refresh_skew = skew;
        self
    }

    /// Set request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn storage_keys(mut self, keys: StorageKeys) -> Self {
        self.config.storage_keys = keys;
        self
    }

    /// Replace the admin allow-list.
    pub fn admin_subjects<I, S>(mut self, subjects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.admin_subjects = subjects.into_iter().map(Into::into).collect();
        self
    }

    /// Revoke tokens server-side on sign-out.
    pub fn global_sign_out(mut self, enable: bool) -> Self {
        self.config.global_sign_out = enable;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Result<AuthConfig, ConfigurationError> {
        let mut config = self.config;

        config.client_id = self
            .client_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ConfigurationError::MissingRequired {
                field: "client_id".to_string(),
            })?;

        let user_pool_id = self
            .user_pool_id
            .ok_or_else(|| ConfigurationError::MissingRequired {
                field: "user_pool_id".to_string(),
            })?;
        if !user_pool_id.starts_with(&format!("{}_", config.region)) {
            return Err(ConfigurationError::InvalidConfig {
                message: format!(
                    "user pool {} does not belong to region {}",
                    user_pool_id, config.region
                ),
            });
        }
        config.user_pool_id = user_pool_id;

        if let Some(endpoint) = &config.endpoint {
            Url::parse(endpoint).map_err(|_| ConfigurationError::InvalidEndpoint {
                url: endpoint.clone(),
            })?;
        }

        if config.refresh_skew > MAX_REFRESH_SKEW {
            return Err(ConfigurationError::InvalidConfig {
                message: format!(
                    "refresh skew {:?} exceeds the maximum of {:?}",
                    config.refresh_skew, MAX_REFRESH_SKEW
                ),
            });
        }

        if config.timeout.is_zero() {
            return Err(ConfigurationError::InvalidConfig {
                message: "timeout must be positive".to_string(),
            });
        }

        Ok(config)
    }
}

impl Default for AuthConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Create new configuration builder.
pub fn auth_config() -> AuthConfigBuilder {
    AuthConfigBuilder::new()
}
