//! Identity Provider
//!
//! Client interface to the hosted user directory that authenticates
//! passwords and mints identity/access/refresh tokens.

pub mod cognito;

use async_trait::async_trait;
use secrecy::SecretString;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::AuthError;
use crate::types::TokenBundle;

pub use cognito::CognitoIdentityProvider;

/// Identity provider interface.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Authenticate a username and password.
    async fn authenticate(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<TokenBundle, AuthError>;

    /// Mint new tokens from a refresh token.
    async fn refresh(
        &self,
        refresh_token: &SecretString,
        username: Option<&str>,
    ) -> Result<TokenBundle, AuthError>;

    /// Local sign-out. Must not wait on the network.
    async fn sign_out(&self, access_token: Option<&SecretString>) -> Result<(), AuthError>;

    /// Check that the provider still accepts an access token.
    async fn verify_session(&self, access_token: &SecretString) -> Result<(), AuthError>;
}

/// Mock identity provider for testing.
///
/// Queued outcomes are consumed in order. With an empty queue,
/// `authenticate` and `refresh` fail and `verify_session` succeeds.
#[derive(Default)]
pub struct MockIdentityProvider {
    authenticate_results: Mutex<VecDeque<Result<TokenBundle, AuthError>>>,
    refresh_results: Mutex<VecDeque<Result<TokenBundle, AuthError>>>,
    verify_results: Mutex<VecDeque<Result<(), AuthError>>>,
    refresh_delay: Mutex<Option<Duration>>,
    authenticate_history: Mutex<Vec<String>>,
    refresh_history: Mutex<Vec<Option<String>>>,
    refresh_count: AtomicUsize,
    sign_out_count: AtomicUsize,
    verify_count: AtomicUsize,
}

impl MockIdentityProvider {
    /// Create new mock identity provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the outcome of the next `authenticate` call.
    pub fn queue_authenticate(&self, result: Result<TokenBundle, AuthError>) -> &Self {
        self.authenticate_results.lock().unwrap().push_back(result);
        self
    }

    /// Queue the outcome of the next `refresh` call.
    pub fn queue_refresh(&self, result: Result<TokenBundle, AuthError>) -> &Self {
        self.refresh_results.lock().unwrap().push_back(result);
        self
    }

    /// Queue the outcome of the next `verify_session` call.
    pub fn queue_verify(&self, result: Result<(), AuthError>) -> &Self {
        self.verify_results.lock().unwrap().push_back(result);
        self
    }

    /// Delay every refresh, to hold it in flight.
    pub fn set_refresh_delay(&self, delay: Duration) -> &Self {
        *self.refresh_delay.lock().unwrap() = Some(delay);
        self
    }

    /// Usernames passed to `authenticate`.
    pub fn get_authenticate_history(&self) -> Vec<String> {
        self.authenticate_history.lock().unwrap().clone()
    }

    /// Usernames passed to `refresh`.
    pub fn get_refresh_history(&self) -> Vec<Option<String>> {
        self.refresh_history.lock().unwrap().clone()
    }

    pub fn authenticate_count(&self) -> usize {
        self.authenticate_history.lock().unwrap().len()
    }

    pub fn refresh_count(&self) -> usize {
        self.refresh_count.load(Ordering::SeqCst)
    }

    pub fn sign_out_count(&self) -> usize {
        self.sign_out_count.load(Ordering::SeqCst)
    }

    pub fn verify_count(&self) -> usize {
        self.verify_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn authenticate(
        &self,
        username: &str,
        _password: &SecretString,
    ) -> Result<TokenBundle, AuthError> {
        self.authenticate_history
            .lock()
            .unwrap()
            .push(username.to_string());

        self.authenticate_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AuthError::unknown("No mock authenticate result")))
    }

    async fn refresh(
        &self,
        _refresh_token: &SecretString,
        username: Option<&str>,
    ) -> Result<TokenBundle, AuthError> {
        self.refresh_count.fetch_add(1, Ordering::SeqCst);
        self.refresh_history
            .lock()
            .unwrap()
            .push(username.map(String::from));

        let delay = *self.refresh_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.refresh_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AuthError::refresh_failed("No mock refresh result")))
    }

    async fn sign_out(&self, _access_token: Option<&SecretString>) -> Result<(), AuthError> {
        self.sign_out_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn verify_session(&self, _access_token: &SecretString) -> Result<(), AuthError> {
        self.verify_count.fetch_add(1, Ordering::SeqCst);
        self.verify_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }
}

/// Create mock identity provider for testing.
pub fn create_mock_identity_provider() -> MockIdentityProvider {
    MockIdentityProvider::new()
}
