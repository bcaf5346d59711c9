//! Credits API.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use url::Url;

use crate::api::client::{endpoint_url, parse_base_url, ApiClient, ApiRequest, ApiResponse};
use crate::core::{HttpTransport, ReqwestHttpTransport};
use crate::error::ConfigurationError;
use crate::token::Authenticator;
use crate::types::ApiEndpoints;

/// How an admin credit update applies to the balance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreditOperation {
    #[default]
    Set,
    Add,
    Subtract,
}

impl CreditOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::Add => "add",
            Self::Subtract => "subtract",
        }
    }
}

impl fmt::Display for CreditOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User credit balances.
pub struct CreditsApi<A: Authenticator + ?Sized, T: HttpTransport = ReqwestHttpTransport> {
    client: Arc<ApiClient<A, T>>,
    base: Url,
}

impl<A: Authenticator + ?Sized, T: HttpTransport> CreditsApi<A, T> {
    pub fn new(client: Arc<ApiClient<A, T>>, base_url: &str) -> Result<Self, ConfigurationError> {
        Ok(Self {
            client,
            base: parse_base_url(base_url)?,
        })
    }

    /// Client against the `credits` entry of `endpoints`.
    pub fn from_endpoints(
        client: Arc<ApiClient<A, T>>,
        endpoints: &ApiEndpoints,
    ) -> Result<Self, ConfigurationError> {
        Self::new(client, &endpoints.credits)
    }

    /// Balance of the signed-in user, or of `user_id` when given.
    pub async fn get_balance(&self, user_id: Option<&str>) -> ApiResponse {
        let query: Vec<(&str, &str)> = user_id.map(|id| ("userId", id)).into_iter().collect();
        let url = endpoint_url(&self.base, &["credits", "balance"], &query);
        self.client.call(ApiRequest::get(url)).await
    }

    pub async fn admin_get_user(&self, user_id: &str) -> ApiResponse {
        let url = endpoint_url(&self.base, &["credits", "admin"], &[("userId", user_id)]);
        self.client.call(ApiRequest::get(url)).await
    }

    pub async fn admin_update_credits(
        &self,
        user_id: &str,
        credits: i64,
        operation: CreditOperation,
    ) -> ApiResponse {
        let url = endpoint_url(&self.base, &["credits", "admin"], &[]);
        let body = json!({
            "userId": user_id,
            "credits": credits,
            "operation": operation,
        });
        self.client.call(ApiRequest::put(url, body)).await
    }

    /// Spend credits from the signed-in user's balance.
    pub async fn consume_credits(&self, amount: i64) -> ApiResponse {
        let url = endpoint_url(&self.base, &["credits", "consume"], &[]);
        self.client
            .call(ApiRequest::post(url, json!({ "amount": amount })))
            .await
    }
}
