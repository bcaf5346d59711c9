//! Session
//!
//! The in-memory record of the authenticated subject's tokens and claims.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

use crate::core::claims::decode_claims;
use crate::error::AuthError;
use crate::types::{TokenBundle, UserDetails};

/// Current authenticated session.
#[derive(Clone)]
pub struct Session {
    identity_token: SecretString,
    access_token: Option<SecretString>,
    refresh_token: Option<SecretString>,
    /// Instant after which the identity token is rejected.
    pub expires_at: DateTime<Utc>,
    /// Subject identifier (`sub` claim).
    pub subject_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl Session {
    /// Build a session from freshly minted provider tokens.
    ///
    /// Expiry comes from the identity token's `exp` claim, or from the
    /// provider's `expires_in` when the claim is missing.
    pub fn from_bundle(bundle: &TokenBundle, now: DateTime<Utc>) -> Result<Self, AuthError> {
        let claims = decode_claims(&bundle.id_token)?;
        let expires_at = claims
            .expires_at()
            .or_else(|| {
                bundle
                    .expires_in
                    .map(|secs| now + ChronoDuration::seconds(secs as i64))
            })
            .ok_or_else(|| AuthError::session_invalid("identity token carries no expiry"))?;

        Ok(Self {
            identity_token: SecretString::new(bundle.id_token.clone()),
            access_token: Some(SecretString::new(bundle.access_token.clone())),
            refresh_token: bundle.refresh_token.clone().map(SecretString::new),
            expires_at,
            subject_id: claims.sub,
            email: claims.email,
            name: claims.name,
        })
    }

    /// Rebuild a session from persisted values.
    ///
    /// The token must decode and, when user details are stored, name the same
    /// subject. Stored details then take precedence over the token's claims.
    pub fn from_persisted(
        token: String,
        user_details: Option<&str>,
        refresh_token: Option<String>,
    ) -> Result<Self, AuthError> {
        let claims = decode_claims(&token)?;
        let details = user_details
            .map(|raw| serde_json::from_str::<UserDetails>(raw))
            .transpose()
            .map_err(|e| AuthError::session_invalid(format!("corrupted user details: {}", e)))?;

        let (subject_id, email, name, expires_at) = match details {
            Some(details) => {
                if details.user_id != claims.sub {
                    return Err(AuthError::session_invalid(
                        "stored user details do not match the identity token",
                    ));
                }
                (
                    details.user_id,
                    details.email,
                    details.name,
                    details.token_expiry,
                )
            }
            None => {
                let expires_at = claims
                    .expires_at()
                    .ok_or_else(|| AuthError::session_invalid("identity token carries no expiry"))?;
                (claims.sub, claims.email, claims.name, expires_at)
            }
        };

        Ok(Self {
            identity_token: SecretString::new(token),
            access_token: None,
            refresh_token: refresh_token
                .filter(|t| !t.is_empty())
                .map(SecretString::new),
            expires_at,
            subject_id,
            email,
            name,
        })
    }

    /// Session produced by a successful refresh.
    ///
    /// The refresh token is kept unless the provider rotated it.
    pub fn refreshed(&self, bundle: &TokenBundle, now: DateTime<Utc>) -> Result<Self, AuthError> {
        let mut next = Self::from_bundle(bundle, now)?;
        if next.refresh_token.is_none() {
            next.refresh_token = self.refresh_token.clone();
        }
        if next.email.is_none() {
            next.email = self.email.clone();
        }
        if next.name.is_none() {
            next.name = self.name.clone();
        }
        Ok(next)
    }

    /// Token presented as `Authorization: Bearer`.
    pub fn identity_token(&self) -> &str {
        self.identity_token.expose_secret()
    }

    pub fn access_token(&self) -> Option<&SecretString> {
        self.access_token.as_ref()
    }

    pub fn refresh_token(&self) -> Option<&SecretString> {
        self.refresh_token.as_ref()
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Time left before expiry; negative once expired.
    pub fn remaining(&self, now: DateTime<Utc>) -> ChronoDuration {
        self.expires_at.signed_duration_since(now)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// True once `remaining <= skew`.
    pub fn needs_refresh(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        self.remaining(now) <= ChronoDuration::seconds(skew.as_secs() as i64)
    }

    /// Claims in their persisted form.
    pub fn user_details(&self) -> UserDetails {
        UserDetails {
            user_id: self.subject_id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            token_expiry: self.expires_at,
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("identity_token", &"[REDACTED]")
            .field("has_access_token", &self.access_token.is_some())
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .field("subject_id", &self.subject_id)
            .field("email", &self.email)
            .finish()
    }
}
