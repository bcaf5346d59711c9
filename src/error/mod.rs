//! Authentication Error Types
//!
//! Every collaborator failure is converted into an [`AuthError`] at the
//! component boundary; no raw provider, transport or storage error reaches
//! callers of the token lifecycle manager.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

fn detail(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {}", m))
        .unwrap_or_default()
}

/// Root error type for authentication operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid credentials{}", detail(.message))]
    InvalidCredentials { message: Option<String> },

    #[error("New password required{}", detail(.message))]
    NewPasswordRequired { message: Option<String> },

    #[error("Session invalid{}", detail(.message))]
    SessionInvalid { message: Option<String> },

    #[error("Token refresh failed{}", detail(.message))]
    RefreshFailed { message: Option<String> },

    #[error("No session")]
    NoSession,

    #[error("Authentication error{}", detail(.message))]
    Unknown { message: Option<String> },
}

/// Classification of an [`AuthError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthErrorKind {
    InvalidCredentials,
    NewPasswordRequired,
    SessionInvalid,
    RefreshFailed,
    NoSession,
    Unknown,
}

impl AuthErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "InvalidCredentials",
            Self::NewPasswordRequired => "NewPasswordRequired",
            Self::SessionInvalid => "SessionInvalid",
            Self::RefreshFailed => "RefreshFailed",
            Self::NoSession => "NoSession",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AuthError {
    pub fn invalid_credentials(message: impl Into<String>) -> Self {
        Self::InvalidCredentials {
            message: Some(message.into()),
        }
    }

    pub fn refresh_failed(message: impl Into<String>) -> Self {
        Self::RefreshFailed {
            message: Some(message.into()),
        }
    }

    pub fn session_invalid(message: impl Into<String>) -> Self {
        Self::SessionInvalid {
            message: Some(message.into()),
        }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown {
            message: Some(message.into()),
        }
    }

    /// Get the error classification.
    pub fn kind(&self) -> AuthErrorKind {
        match self {
            Self::InvalidCredentials { .. } => AuthErrorKind::InvalidCredentials,
            Self::NewPasswordRequired { .. } => AuthErrorKind::NewPasswordRequired,
            Self::SessionInvalid { .. } => AuthErrorKind::SessionInvalid,
            Self::RefreshFailed { .. } => AuthErrorKind::RefreshFailed,
            Self::NoSession => AuthErrorKind::NoSession,
            Self::Unknown { .. } => AuthErrorKind::Unknown,
        }
    }

    /// Get the human-readable detail, if the provider supplied one.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::InvalidCredentials { message }
            | Self::NewPasswordRequired { message }
            | Self::SessionInvalid { message }
            | Self::RefreshFailed { message }
            | Self::Unknown { message } => message.as_deref(),
            Self::NoSession => None,
        }
    }

    /// Get error code for telemetry.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials { .. } => "AUTH_INVALID_CREDENTIALS",
            Self::NewPasswordRequired { .. } => "AUTH_NEW_PASSWORD_REQUIRED",
            Self::SessionInvalid { .. } => "AUTH_SESSION_INVALID",
            Self::RefreshFailed { .. } => "AUTH_REFRESH_FAILED",
            Self::NoSession => "AUTH_NO_SESSION",
            Self::Unknown { .. } => "AUTH_UNKNOWN",
        }
    }

    /// Check if error requires the user to sign in again.
    pub fn needs_reauth(&self) -> bool {
        matches!(
            self,
            Self::NoSession | Self::RefreshFailed { .. } | Self::SessionInvalid { .. }
        )
    }
}

impl From<StorageError> for AuthError {
    fn from(error: StorageError) -> Self {
        AuthError::unknown(error.to_string())
    }
}

/// Configuration error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Missing required field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid endpoint URL: {url}")]
    InvalidEndpoint { url: String },
}

/// Network/transport error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Request timeout after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Response too large: {size} bytes")]
    ResponseTooLarge { size: usize },

    #[error("Client construction failed: {message}")]
    ClientBuild { message: String },
}

/// Persistent store error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Read failed: {message}")]
    ReadFailed { message: String },

    #[error("Write failed: {message}")]
    WriteFailed { message: String },

    #[error("Delete failed: {message}")]
    DeleteFailed { message: String },

    #[error("Corrupted data: {message}")]
    CorruptedData { message: String },
}

/// Identity provider call that produced an error.
///
/// The same provider code means different things depending on the call:
/// `NotAuthorizedException` is a wrong password during sign-in but an
/// expired or revoked refresh token during refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderOperation {
    SignIn,
    Refresh,
    Verify,
    SignOut,
}

impl ProviderOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SignIn => "sign_in",
            Self::Refresh => "refresh",
            Self::Verify => "verify",
            Self::SignOut => "sign_out",
        }
    }

    /// Map a failure that never reached the provider.
    pub fn transport_failure(&self, error: &TransportError) -> AuthError {
        match self {
            Self::Refresh => AuthError::refresh_failed(error.to_string()),
            _ => AuthError::unknown(error.to_string()),
        }
    }
}

/// Error body returned by the user-pool API.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ProviderErrorResponse {
    #[serde(rename = "__type")]
    pub error_type: String,
    #[serde(default, alias = "Message")]
    pub message: Option<String>,
}

impl ProviderErrorResponse {
    /// Error code without the service namespace prefix.
    pub fn code(&self) -> &str {
        self.error_type
            .rsplit('#')
            .next()
            .unwrap_or(self.error_type.as_str())
    }
}

/// Map a provider error response to an [`AuthError`].
pub fn map_provider_error(operation: ProviderOperation, response: &ProviderErrorResponse) -> AuthError {
    let message = response.message.clone();
    match (response.code(), operation) {
        ("PasswordResetRequiredException", _) => AuthError::NewPasswordRequired { message },
        ("NotAuthorizedException" | "UserNotFoundException", ProviderOperation::SignIn) => {
            AuthError::InvalidCredentials { message }
        }
        ("NotAuthorizedException" | "UserNotFoundException", ProviderOperation::Refresh) => {
            AuthError::RefreshFailed { message }
        }
        ("NotAuthorizedException" | "UserNotFoundException", ProviderOperation::Verify) => {
            AuthError::SessionInvalid { message }
        }
        (_, ProviderOperation::Refresh) => AuthError::RefreshFailed { message },
        (code, _) => AuthError::Unknown {
            message: Some(message.unwrap_or_else(|| code.to_string())),
        },
    }
}

/// Parse error response from HTTP body.
pub fn parse_error_response(body: &str) -> Option<ProviderErrorResponse> {
    serde_json::from_str(body).ok()
}

/// Create error from a non-success HTTP response.
pub fn create_error_from_response(operation: ProviderOperation, status: u16, body: &str) -> AuthError {
    if let Some(response) = parse_error_response(body) {
        return map_provider_error(operation, &response);
    }

    let message = format!("HTTP {}", status);
    match operation {
        ProviderOperation::Refresh => AuthError::refresh_failed(message),
        ProviderOperation::Verify if status == 401 || status == 403 => {
            AuthError::session_invalid(message)
        }
        _ => AuthError::unknown(message),
    }
}

/// Get user-friendly error message.
pub fn get_user_message(error: &AuthError) -> String {
    match error {
        AuthError::InvalidCredentials { .. } => "Incorrect email or password.".to_string(),
        AuthError::NewPasswordRequired { .. } => {
            "A new password is required before you can sign in.".to_string()
        }
        AuthError::SessionInvalid { .. } => {
            "Your session is no longer valid. Please sign in again.".to_string()
        }
        AuthError::RefreshFailed { .. } => {
            "Failed to refresh your session. Please sign in again.".to_string()
        }
        AuthError::NoSession => "You are not signed in.".to_string(),
        AuthError::Unknown { .. } => "An authentication error occurred. Please try again.".to_string(),
    }
}
