//! Authenticated API client.
//!
//! Wraps backend calls with a bearer token from an [`Authenticator`].
//! Failures never surface as `Err`: a transport failure is reported as a
//! response with status 0 and an error message, matching how the dashboard
//! renders every outcome.

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

use crate::core::{HttpMethod, HttpRequest, HttpTransport, ReqwestHttpTransport};
use crate::error::{ConfigurationError, TransportError};
use crate::token::Authenticator;

const REQUEST_ID_LEN: usize = 7;

/// Backend API request.
#[derive(Clone, Debug)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    /// JSON body, sent with `Content-Type: application/json`.
    pub body: Option<Value>,
    /// Send without an `Authorization` header.
    pub skip_auth: bool,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            skip_auth: false,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self::new(HttpMethod::Post, url).json(body)
    }

    pub fn put(url: impl Into<String>, body: Value) -> Self {
        Self::new(HttpMethod::Put, url).json(body)
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_lowercase(), value.into());
        self
    }

    pub fn skip_auth(mut self) -> Self {
        self.skip_auth = true;
        self
    }
}

/// Outcome of a backend call.
#[derive(Clone, Debug)]
pub struct ApiResponse {
    /// Status in the 2xx range.
    pub ok: bool,
    /// HTTP status, or 0 when the request never completed.
    pub status: u16,
    pub status_text: String,
    pub headers: HashMap<String, String>,
    /// Parsed JSON body; a non-JSON body is kept as a string.
    pub data: Value,
    /// Transport failure description.
    pub error: Option<String>,
    pub duration: Duration,
    pub request_id: String,
}

impl ApiResponse {
    fn failed(error: &TransportError, duration: Duration, request_id: String) -> Self {
        Self {
            ok: false,
            status: 0,
            status_text: String::new(),
            headers: HashMap::new(),
            data: Value::Null,
            error: Some(error.to_string()),
            duration,
            request_id,
        }
    }

    /// Deserialize the body into a typed value.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data)
    }

    /// True when the request never reached the server.
    pub fn is_transport_failure(&self) -> bool {
        self.status == 0
    }
}

fn request_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REQUEST_ID_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

fn parse_body(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

/// Validate an API base URL.
pub(crate) fn parse_base_url(base: &str) -> Result<Url, ConfigurationError> {
    let url = Url::parse(base).map_err(|_| ConfigurationError::InvalidEndpoint {
        url: base.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(ConfigurationError::InvalidEndpoint {
            url: base.to_string(),
        });
    }
    Ok(url)
}

/// Append path segments and query pairs to a base URL.
pub(crate) fn endpoint_url(base: &Url, segments: &[&str], query: &[(&str, &str)]) -> String {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    url.to_string()
}

/// Backend API client.
pub struct ApiClient<A: Authenticator + ?Sized, T: HttpTransport = ReqwestHttpTransport> {
    auth: Arc<A>,
    transport: Arc<T>,
}

impl<A: Authenticator + ?Sized> ApiClient<A, ReqwestHttpTransport> {
    /// Create a client with the default reqwest transport.
    pub fn new(auth: Arc<A>) -> Result<Self, TransportError> {
        Ok(Self::with_transport(auth, Arc::new(ReqwestHttpTransport::new()?)))
    }
}

impl<A: Authenticator + ?Sized, T: HttpTransport> ApiClient<A, T> {
    /// Create a client over a custom transport.
    pub fn with_transport(auth: Arc<A>, transport: Arc<T>) -> Self {
        Self { auth, transport }
    }

    /// Perform a request.
    ///
    /// Without a token the request goes out unauthenticated and the backend
    /// answers with its own authorization error.
    pub async fn call(&self, request: ApiRequest) -> ApiResponse {
        let started = Instant::now();
        let request_id = request_id();
        debug!(
            request_id = %request_id,
            method = request.method.as_str(),
            url = %request.url,
            "api request"
        );

        let mut http = HttpRequest::new(request.method, request.url);
        for (name, value) in request.headers {
            http = http.header(name, value);
        }

        if !request.skip_auth {
            match self.auth.get_valid_token().await {
                Ok(token) => http = http.header("authorization", format!("Bearer {}", token)),
                Err(e) => warn!(
                    request_id = %request_id,
                    error = %e,
                    "no valid token, sending request without authorization"
                ),
            }
        }

        if let Some(body) = request.body {
            http = http
                .header("content-type", "application/json")
                .body(body.to_string());
        }

        match self.transport.send(http).await {
            Ok(response) => {
                let duration = started.elapsed();
                debug!(
                    request_id = %request_id,
                    status = response.status,
                    duration_ms = duration.as_millis() as u64,
                    "api response"
                );
                ApiResponse {
                    ok: response.is_success(),
                    status: response.status,
                    status_text: response.status_text,
                    data: parse_body(&response.body),
                    headers: response.headers,
                    error: None,
                    duration,
                    request_id,
                }
            }
            Err(e) => {
                let duration = started.elapsed();
                warn!(
                    request_id = %request_id,
                    error = %e,
                    duration_ms = duration.as_millis() as u64,
                    "api request failed"
                );
                ApiResponse::failed(&e, duration, request_id)
            }
        }
    }
}
