//! Identity Token Claims
//!
//! Reads the payload of an identity token without verifying its signature.
//! The backend verifies signatures; the client only needs the expiry and
//! subject to schedule refreshes and label the UI.

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::error::AuthError;

/// Claims read from an identity token payload.
#[derive(Clone, Debug, Deserialize)]
pub struct IdTokenClaims {
    /// Subject identifier.
    pub sub: String,
    /// Expiry, seconds since the epoch.
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl IdTokenClaims {
    /// Expiry as an instant, if the claim is present and in range.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| Utc.timestamp_opt(exp, 0).single())
    }
}

/// Decode the claims of an identity token.
pub fn decode_claims(token: &str) -> Result<IdTokenClaims, AuthError> {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<IdTokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| AuthError::session_invalid(format!("unreadable identity token: {}", e)))
}

/// Short, log-safe prefix of a token.
pub fn token_preview(token: &str) -> String {
    let prefix: String = token.chars().take(12).collect();
    format!("{}...", prefix)
}
