//! Token Lifecycle Manager
//!
//! Owns the current session: signs in and out, hydrates from the persistent
//! store, and hands out identity tokens that are valid for at least the
//! configured refresh skew. Refreshes are single-flight; every caller that
//! needs one while it is pending awaits the same provider call.

use async_trait::async_trait;
use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};
use secrecy::{ExposeSecret, SecretString};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::core::claims::token_preview;
use crate::error::{AuthError, AuthErrorKind, StorageError};
use crate::provider::IdentityProvider;
use crate::telemetry::{AuthMetrics, NoOpMetrics};
use crate::token::admin::is_admin_in;
use crate::token::SessionStore;
use crate::types::{AuthConfig, AuthEvent, Session, StorageKeys};

const EVENT_CAPACITY: usize = 16;

/// Narrow interface used by API clients.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Sign in with email and password.
    async fn sign_in(&self, email: &str, password: SecretString) -> Result<Session, AuthError>;

    /// Discard the current session.
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Identity token valid for at least the refresh skew.
    async fn get_valid_token(&self) -> Result<String, AuthError>;
}

type SharedRefresh = Shared<BoxFuture<'static, Result<Session, AuthError>>>;

struct PendingRefresh {
    id: u64,
    future: SharedRefresh,
}

/// Current session plus a counter bumped on every sign-in and sign-out.
/// A refresh only lands if the counter has not moved since it started.
#[derive(Default)]
struct Current {
    session: Option<Session>,
    generation: u64,
}

#[derive(Default)]
struct SessionState {
    current: RwLock<Current>,
    in_flight: Mutex<Option<PendingRefresh>>,
    next_refresh_id: AtomicU64,
    // Orders store writes between sign-in, sign-out, hydration and refresh.
    persist_lock: tokio::sync::Mutex<()>,
}

impl SessionState {
    fn session(&self) -> Option<Session> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .session
            .clone()
    }

    fn snapshot(&self) -> (u64, Option<Session>) {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        (current.generation, current.session.clone())
    }

    /// Start a new generation with `session` as current.
    fn replace(&self, session: Option<Session>) -> Option<Session> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        current.generation += 1;
        std::mem::replace(&mut current.session, session)
    }

    fn install_if_empty(&self, session: Session) -> bool {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if current.session.is_some() {
            return false;
        }
        current.session = Some(session);
        true
    }

    fn install_refreshed(&self, generation: u64, session: Session) -> bool {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if current.generation != generation || current.session.is_none() {
            return false;
        }
        current.session = Some(session);
        true
    }

    fn cancel_refresh(&self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    fn finish_refresh(&self, id: u64) {
        let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().map(|pending| pending.id) == Some(id) {
            *slot = None;
        }
    }
}

async fn persist<S: SessionStore + ?Sized>(
    store: &S,
    keys: &StorageKeys,
    session: &Session,
    write_refresh_token: bool,
) -> Result<(), StorageError> {
    let details =
        serde_json::to_string(&session.user_details()).map_err(|e| StorageError::WriteFailed {
            message: e.to_string(),
        })?;

    store.set(&keys.token, session.identity_token()).await?;
    store.set(&keys.user_details, &details).await?;

    if write_refresh_token {
        match session.refresh_token() {
            Some(token) => store.set(&keys.refresh_token, token.expose_secret()).await?,
            None => {
                store.remove(&keys.refresh_token).await?;
            }
        }
    }
    Ok(())
}

/// Remove every session key, reporting the first failure.
async fn clear_store<S: SessionStore + ?Sized>(
    store: &S,
    keys: &StorageKeys,
) -> Result<(), StorageError> {
    let mut first_error = None;
    for key in keys.all() {
        if let Err(e) = store.remove(key).await {
            warn!(key, error = %e, "failed to remove stored session key");
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}

fn into_refresh_failure(error: AuthError) -> AuthError {
    match error {
        AuthError::RefreshFailed { .. } => error,
        other => AuthError::RefreshFailed {
            message: Some(other.to_string()),
        },
    }
}

fn into_sign_in_failure(error: AuthError) -> AuthError {
    match error.kind() {
        AuthErrorKind::InvalidCredentials
        | AuthErrorKind::NewPasswordRequired
        | AuthErrorKind::Unknown => error,
        _ => AuthError::unknown(error.to_string()),
    }
}

/// A single provider refresh, shared by every waiting caller.
struct RefreshTask<P, S> {
    id: u64,
    generation: u64,
    session: Session,
    keys: StorageKeys,
    provider: Arc<P>,
    store: Arc<S>,
    state: Arc<SessionState>,
    metrics: Arc<dyn AuthMetrics>,
}

impl<P: IdentityProvider + 'static, S: SessionStore + 'static> RefreshTask<P, S> {
    async fn run(self) -> Result<Session, AuthError> {
        let outcome = self.execute().await;
        self.state.finish_refresh(self.id);

        match &outcome {
            Ok(_) => self.metrics.record_token_refresh(true),
            Err(e) => {
                self.metrics.record_token_refresh(false);
                self.metrics.record_error(e.error_code());
            }
        }
        outcome
    }

    async fn execute(&self) -> Result<Session, AuthError> {
        let refresh_token = self
            .session
            .refresh_token()
            .ok_or_else(|| AuthError::refresh_failed("no refresh token available"))?;

        debug!(subject = %self.session.subject_id, "refreshing identity token");
        let bundle = self
            .provider
            .refresh(refresh_token, Some(self.session.subject_id.as_str()))
            .await
            .map_err(|e| {
                warn!(error = %e, "identity token refresh failed");
                into_refresh_failure(e)
            })?;

        let rotated = bundle.refresh_token.is_some();
        let next = self
            .session
            .refreshed(&bundle, Utc::now())
            .map_err(into_refresh_failure)?;

        let _guard = self.state.persist_lock.lock().await;
        if !self.state.install_refreshed(self.generation, next.clone()) {
            debug!("discarding refresh result for a session that has been replaced");
            return self.state.session().ok_or(AuthError::NoSession);
        }

        if let Err(e) = persist(&*self.store, &self.keys, &next, rotated).await {
            warn!(error = %e, "failed to persist refreshed session");
        }

        info!(
            subject = %next.subject_id,
            expires_at = %next.expires_at,
            rotated,
            "identity token refreshed"
        );
        Ok(next)
    }
}

/// Token lifecycle manager.
///
/// One instance per application, shared as `Arc`.
pub struct TokenLifecycleManager<P: IdentityProvider + 'static, S: SessionStore + 'static> {
    config: AuthConfig,
    provider: Arc<P>,
    store: Arc<S>,
    state: Arc<SessionState>,
    events: broadcast::Sender<AuthEvent>,
    metrics: Arc<dyn AuthMetrics>,
}

impl<P: IdentityProvider + 'static, S: SessionStore + 'static> TokenLifecycleManager<P, S> {
    /// Create new manager. No I/O happens until the first call.
    pub fn new(config: AuthConfig, provider: Arc<P>, store: Arc<S>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            config,
            provider,
            store,
            state: Arc::new(SessionState::default()),
            events,
            metrics: Arc::new(NoOpMetrics),
        }
    }

    /// Set metrics sink.
    pub fn with_metrics(mut self, metrics: Arc<dyn AuthMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Register for session transitions.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: AuthEvent) {
        debug!(event = event.name(), "auth event");
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    /// Sign in with email and password.
    ///
    /// Makes exactly one provider call. On failure nothing is persisted.
    pub async fn sign_in(&self, email: &str, password: SecretString) -> Result<Session, AuthError> {
        match self.sign_in_inner(email, password).await {
            Ok(session) => {
                self.metrics.record_sign_in(true);
                Ok(session)
            }
            Err(e) => {
                self.metrics.record_sign_in(false);
                self.metrics.record_error(e.error_code());
                Err(e)
            }
        }
    }

    async fn sign_in_inner(&self, email: &str, password: SecretString) -> Result<Session, AuthError> {
        let email = email.trim();
        if email.is_empty() || password.expose_secret().is_empty() {
            return Err(AuthError::invalid_credentials(
                "email and password are required",
            ));
        }

        let bundle = self
            .provider
            .authenticate(email, &password)
            .await
            .map_err(|e| {
                debug!(kind = %e.kind(), "sign-in rejected");
                into_sign_in_failure(e)
            })?;
        let session = Session::from_bundle(&bundle, Utc::now()).map_err(into_sign_in_failure)?;

        let keys = &self.config.storage_keys;
        let _guard = self.state.persist_lock.lock().await;
        if let Err(e) = persist(&*self.store, keys, &session, true).await {
            warn!(error = %e, "failed to persist new session");
            let _ = clear_store(&*self.store, keys).await;
            return Err(e.into());
        }

        self.state.cancel_refresh();
        self.state.replace(Some(session.clone()));

        info!(
            subject = %session.subject_id,
            token = %token_preview(session.identity_token()),
            expires_at = %session.expires_at,
            "signed in"
        );
        self.emit(AuthEvent::Ready(session.clone()));
        Ok(session)
    }

    /// Discard the current session in memory and in the store.
    ///
    /// Calling this with nothing signed in is a no-op and emits no event.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let keys = &self.config.storage_keys;
        let _guard = self.state.persist_lock.lock().await;

        self.state.cancel_refresh();
        let previous = self.state.replace(None);

        let had_session = match &previous {
            Some(_) => true,
            None => match self.store.get(&keys.token).await {
                Ok(token) => token.is_some(),
                Err(e) => {
                    warn!(error = %e, "could not read stored session during sign-out");
                    true
                }
            },
        };
        if !had_session {
            return Ok(());
        }

        let access_token = previous.as_ref().and_then(Session::access_token);
        if let Err(e) = self.provider.sign_out(access_token).await {
            warn!(error = %e, "provider sign-out failed");
        }

        let cleared = clear_store(&*self.store, keys).await;

        info!(
            subject = previous.as_ref().map(|s| s.subject_id.as_str()).unwrap_or(""),
            "signed out"
        );
        self.metrics.record_sign_out();
        self.emit(AuthEvent::Cleared);

        cleared.map_err(AuthError::from)
    }

    /// Identity token valid for at least the refresh skew.
    ///
    /// Refreshes when the token is inside the skew window. A failed refresh
    /// returns `RefreshFailed`; the stale token is never handed out.
    pub async fn get_valid_token(&self) -> Result<String, AuthError> {
        let session = match self.state.session() {
            Some(session) => session,
            None => self.hydrate().await?.ok_or(AuthError::NoSession)?,
        };

        if !session.needs_refresh(Utc::now(), self.config.refresh_skew) {
            return Ok(session.identity_token().to_string());
        }

        if !session.has_refresh_token() {
            let error = AuthError::refresh_failed("no refresh token available");
            self.metrics.record_error(error.error_code());
            return Err(error);
        }

        let refreshed = self.refresh().await?;
        Ok(refreshed.identity_token().to_string())
    }

    async fn refresh(&self) -> Result<Session, AuthError> {
        let pending = {
            let mut slot = self
                .state
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            match slot.as_ref() {
                Some(pending) => pending.future.clone(),
                None => {
                    let (generation, current) = self.state.snapshot();
                    let session = current.ok_or(AuthError::NoSession)?;

                    // A refresh may have landed while this caller was waiting.
                    if !session.needs_refresh(Utc::now(), self.config.refresh_skew) {
                        return Ok(session);
                    }

                    let id = self.state.next_refresh_id.fetch_add(1, Ordering::Relaxed);
                    let task = RefreshTask {
                        id,
                        generation,
                        session,
                        keys: self.config.storage_keys.clone(),
                        provider: Arc::clone(&self.provider),
                        store: Arc::clone(&self.store),
                        state: Arc::clone(&self.state),
                        metrics: Arc::clone(&self.metrics),
                    };
                    let future = task.run().boxed().shared();
                    *slot = Some(PendingRefresh {
                        id,
                        future: future.clone(),
                    });
                    future
                }
            }
        };

        pending.await
    }

    async fn hydrate(&self) -> Result<Option<Session>, AuthError> {
        let keys = &self.config.storage_keys;
        let _guard = self.state.persist_lock.lock().await;

        if let Some(session) = self.state.session() {
            return Ok(Some(session));
        }

        let token = match self.store.get(&keys.token).await? {
            Some(token) if !token.is_empty() => token,
            _ => return Ok(None),
        };
        let details = self.store.get(&keys.user_details).await?;
        let refresh_token = self.store.get(&keys.refresh_token).await?;

        let session = match Session::from_persisted(token, details.as_deref(), refresh_token) {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "discarding unreadable stored session");
                let _ = clear_store(&*self.store, keys).await;
                return Ok(None);
            }
        };

        if session.is_expired_at(Utc::now()) && !session.has_refresh_token() {
            info!(subject = %session.subject_id, "stored session expired, clearing");
            let _ = clear_store(&*self.store, keys).await;
            return Ok(None);
        }

        if !self.state.install_if_empty(session.clone()) {
            return Ok(self.state.session());
        }

        debug!(
            subject = %session.subject_id,
            expires_at = %session.expires_at,
            "session restored from store"
        );
        self.emit(AuthEvent::Ready(session.clone()));
        Ok(Some(session))
    }

    /// Load a persisted session at startup.
    ///
    /// Emits `Ready` when a stored session is installed. An expired stored
    /// session without a refresh token is cleared and `None` returned.
    pub async fn restore(&self) -> Result<Option<Session>, AuthError> {
        self.hydrate().await
    }

    /// In-memory session, without hydrating or refreshing.
    pub fn current_session(&self) -> Option<Session> {
        self.state.session()
    }

    /// Ask the provider whether the current session is still accepted.
    ///
    /// Sessions restored from the store carry no access token; for those only
    /// the local expiry is checked.
    pub async fn validate_session(&self) -> Result<(), AuthError> {
        let session = match self.state.session() {
            Some(session) => session,
            None => self.hydrate().await?.ok_or(AuthError::NoSession)?,
        };

        let result = match session.access_token() {
            Some(access_token) => self.provider.verify_session(access_token).await,
            None if session.is_expired_at(Utc::now()) => {
                Err(AuthError::session_invalid("identity token has expired"))
            }
            None => Ok(()),
        };

        if let Err(e) = &result {
            debug!(kind = %e.kind(), "session validation failed");
            self.metrics.record_error(e.error_code());
        }
        result
    }

    /// Admin check against the configured allow-list.
    ///
    /// Decides what the UI shows; never an authorization decision.
    pub fn is_admin(&self, session: &Session) -> bool {
        is_admin_in(session, &self.config.admin_subjects)
    }

    pub fn is_current_admin(&self) -> bool {
        self.state
            .session()
            .map(|session| self.is_admin(&session))
            .unwrap_or(false)
    }
}

#[async_trait]
impl<P: IdentityProvider + 'static, S: SessionStore + 'static> Authenticator
    for TokenLifecycleManager<P, S>
{
    async fn sign_in(&self, email: &str, password: SecretString) -> Result<Session, AuthError> {
        TokenLifecycleManager::sign_in(self, email, password).await
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        TokenLifecycleManager::sign_out(self).await
    }

    async fn get_valid_token(&self) -> Result<String, AuthError> {
        TokenLifecycleManager::get_valid_token(self).await
    }
}

/// Mock authenticator for testing API clients.
///
/// Queued token results are returned in order, then the default token;
/// with neither, `get_valid_token` fails with `NoSession`.
#[derive(Default)]
pub struct MockAuthenticator {
    tokens: Mutex<VecDeque<Result<String, AuthError>>>,
    default_token: Mutex<Option<String>>,
    token_requests: AtomicUsize,
    sign_outs: AtomicUsize,
}

impl MockAuthenticator {
    /// Create new mock authenticator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock that always returns `token`.
    pub fn with_token(token: impl Into<String>) -> Self {
        let mock = Self::new();
        mock.set_default_token(token);
        mock
    }

    pub fn set_default_token(&self, token: impl Into<String>) -> &Self {
        *self.default_token.lock().unwrap() = Some(token.into());
        self
    }

    /// Queue the outcome of the next `get_valid_token` call.
    pub fn queue_token(&self, result: Result<String, AuthError>) -> &Self {
        self.tokens.lock().unwrap().push_back(result);
        self
    }

    pub fn token_request_count(&self) -> usize {
        self.token_requests.load(Ordering::SeqCst)
    }

    pub fn sign_out_count(&self) -> usize {
        self.sign_outs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Authenticator for MockAuthenticator {
    async fn sign_in(&self, _email: &str, _password: SecretString) -> Result<Session, AuthError> {
        Err(AuthError::unknown("MockAuthenticator does not sign in"))
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        *self.default_token.lock().unwrap() = None;
        Ok(())
    }

    async fn get_valid_token(&self) -> Result<String, AuthError> {
        self.token_requests.fetch_add(1, Ordering::SeqCst);
        if let Some(result) = self.tokens.lock().unwrap().pop_front() {
            return result;
        }
        self.default_token
            .lock()
            .unwrap()
            .clone()
            .ok_or(AuthError::NoSession)
    }
}

/// Create mock authenticator for testing.
pub fn create_mock_authenticator() -> MockAuthenticator {
    MockAuthenticator::new()
}
