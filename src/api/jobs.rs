//! Jobs API.

use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::api::client::{endpoint_url, parse_base_url, ApiClient, ApiRequest, ApiResponse};
use crate::core::{HttpTransport, ReqwestHttpTransport};
use crate::error::ConfigurationError;
use crate::token::Authenticator;
use crate::types::ApiEndpoints;

/// Default page size for job listings.
pub const DEFAULT_JOB_LIMIT: u32 = 100;

/// Video generation jobs.
///
/// Single-job reads try the admin route first, which includes the owning
/// user id, and fall back to the public route where the admin route is not
/// deployed.
pub struct JobsApi<A: Authenticator + ?Sized, T: HttpTransport = ReqwestHttpTransport> {
    client: Arc<ApiClient<A, T>>,
    base: Url,
}

impl<A: Authenticator + ?Sized, T: HttpTransport> JobsApi<A, T> {
    pub fn new(client: Arc<ApiClient<A, T>>, base_url: &str) -> Result<Self, ConfigurationError> {
        Ok(Self {
            client,
            base: parse_base_url(base_url)?,
        })
    }

    /// Client against the `jobs` entry of `endpoints`.
    pub fn from_endpoints(
        client: Arc<ApiClient<A, T>>,
        endpoints: &ApiEndpoints,
    ) -> Result<Self, ConfigurationError> {
        Self::new(client, &endpoints.jobs)
    }

    /// List jobs across users.
    pub async fn list_jobs(&self, limit: u32) -> ApiResponse {
        let limit = limit.to_string();
        let url = endpoint_url(&self.base, &["admin", "jobs"], &[("limit", limit.as_str())]);
        self.client.call(ApiRequest::get(url)).await
    }

    pub async fn get_job(&self, job_id: &str) -> ApiResponse {
        self.with_admin_fallback(&["jobs", job_id]).await
    }

    pub async fn get_job_logs(&self, job_id: &str) -> ApiResponse {
        self.with_admin_fallback(&["jobs", job_id, "logs"]).await
    }

    /// Submit a new job.
    pub async fn submit_job(&self, job: Value) -> ApiResponse {
        let url = endpoint_url(&self.base, &["jobs"], &[]);
        self.client.call(ApiRequest::post(url, job)).await
    }

    async fn with_admin_fallback(&self, segments: &[&str]) -> ApiResponse {
        let admin_segments: Vec<&str> = std::iter::once("admin")
            .chain(segments.iter().copied())
            .collect();
        let admin = self
            .client
            .call(ApiRequest::get(endpoint_url(&self.base, &admin_segments, &[])))
            .await;

        if admin.status != 404 && admin.status != 0 {
            return admin;
        }

        debug!(
            status = admin.status,
            request_id = %admin.request_id,
            "admin route unavailable, using public route"
        );
        self.client
            .call(ApiRequest::get(endpoint_url(&self.base, segments, &[])))
            .await
    }
}
