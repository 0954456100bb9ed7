//! Token session manager.
//!
//! Owns the access/refresh credential pair and its lifecycle:
//!
//! ```text
//! Unauthenticated -> Authenticating -> Authenticated -> Refreshing
//!                                            ^                |
//!                                            +---- ok --------+
//!                                            |                v
//!                                            +-- failure -> Unauthenticated
//! ```
//!
//! Exactly one session exists per process. Repositories and the transport
//! only read it through this manager's narrow interface; nothing else
//! touches persisted credentials.

use std::sync::{Arc, Mutex, RwLock};

use serde::{Deserialize, Serialize};

use crate::core::models::UserProfile;
use crate::error::{ApiError, Result};
use crate::storage::{CacheStore, keys};
use crate::transport::{error_from_response, join_url, map_send_error};

/// Login endpoint path.
const LOGIN_PATH: &str = "api/auth/login/";
/// Token refresh endpoint path.
const REFRESH_PATH: &str = "api/auth/token/refresh/";

// =============================================================================
// Session state
// =============================================================================

/// Lifecycle state of the process-wide session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// No usable credentials.
    Unauthenticated,
    /// A login request is in flight.
    Authenticating,
    /// Credentials are held and presumed valid.
    Authenticated,
    /// A token refresh is in flight.
    Refreshing,
}

/// The in-memory session: credential pair plus an optional profile snapshot.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub profile: Option<UserProfile>,
}

/// Login credentials. The username field also accepts an email address;
/// the service resolves either.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access: String,
    refresh: String,
    #[serde(default)]
    user: UserProfile,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
}

struct Inner {
    state: AuthState,
    session: Option<Session>,
}

type SessionEndedCallback = Arc<dyn Fn() + Send + Sync>;

// =============================================================================
// Session manager
// =============================================================================

/// Owner of the credential pair and the one writer of session state.
pub struct SessionManager {
    http: reqwest::Client,
    base_url: String,
    store: Arc<CacheStore>,
    inner: RwLock<Inner>,
    /// Serializes refreshes: concurrent callers queue here and re-check the
    /// access token after acquiring, so at most one refresh hits the wire.
    refresh_gate: tokio::sync::Mutex<()>,
    listeners: Mutex<Vec<SessionEndedCallback>>,
}

impl SessionManager {
    /// Create a manager with no session.
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, store: Arc<CacheStore>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            store,
            inner: RwLock::new(Inner {
                state: AuthState::Unauthenticated,
                session: None,
            }),
            refresh_gate: tokio::sync::Mutex::new(()),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> AuthState {
        self.read().state
    }

    /// Whether credentials are currently held.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self.state(), AuthState::Authenticated | AuthState::Refreshing)
    }

    /// Current access token, if any.
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.read().session.as_ref().map(|s| s.access_token.clone())
    }

    /// Current profile snapshot, if any. May be stale.
    #[must_use]
    pub fn profile(&self) -> Option<UserProfile> {
        self.read().session.as_ref().and_then(|s| s.profile.clone())
    }

    /// Register a callback fired once each time the session is terminated
    /// by a refresh failure or a terminal authorization rejection. The UI
    /// decides how to react (typically: navigate to login).
    pub fn on_session_ended<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.listeners
            .lock()
            .expect("listener lock poisoned")
            .push(Arc::new(callback));
    }

    // =========================================================================
    // Lifecycle operations
    // =========================================================================

    /// Restore a persisted session at process start.
    ///
    /// Tokens plus a profile snapshot are trusted optimistically: the state
    /// becomes `Authenticated` without a network round-trip. Tokens without
    /// a profile are validated with one refresh; failure purges the
    /// persisted credentials.
    pub async fn restore(&self) -> AuthState {
        let access: Option<String> = self.store.load(keys::AUTH_ACCESS, None);
        let refresh: Option<String> = self.store.load(keys::AUTH_REFRESH, None);

        let (Some(access_token), Some(refresh_token)) = (access, refresh) else {
            // A lone token half is useless; clear any remnant.
            self.purge_persisted();
            return self.state();
        };

        let profile: Option<UserProfile> = self.store.load(keys::AUTH_PROFILE, None);
        let has_profile = profile.is_some();
        {
            let mut inner = self.write();
            inner.session = Some(Session {
                access_token,
                refresh_token,
                profile,
            });
            inner.state = AuthState::Authenticated;
        }

        if !has_profile {
            // Tokens alone are unproven; one refresh validates them.
            tracing::debug!("restored tokens without profile; validating via refresh");
            if self.refresh().await.is_err() {
                return self.state();
            }
        }

        tracing::info!("session restored from persisted storage");
        self.state()
    }

    /// Authenticate against the remote service.
    ///
    /// # Errors
    /// Returns [`ApiError::LoginRejected`] with the service's reason when
    /// the credentials are refused, or a network error. State stays
    /// `Unauthenticated` on any failure.
    pub async fn login(&self, credentials: &Credentials) -> Result<UserProfile> {
        self.write().state = AuthState::Authenticating;

        let url = join_url(&self.base_url, LOGIN_PATH);
        let outcome = self.http.post(&url).json(credentials).send().await;

        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                self.write().state = AuthState::Unauthenticated;
                return Err(map_send_error(e));
            }
        };

        if !response.status().is_success() {
            self.write().state = AuthState::Unauthenticated;
            let err = error_from_response(response).await;
            let reason = match err {
                ApiError::Service { message, .. } => message,
                other => other.to_string(),
            };
            tracing::warn!(%reason, "login rejected");
            return Err(ApiError::LoginRejected { reason });
        }

        let body: LoginResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                self.write().state = AuthState::Unauthenticated;
                return Err(ApiError::ParseResponse(e.to_string()));
            }
        };

        // Serde defaults normalize the profile: missing optionals become
        // explicit defaults before anything downstream sees them.
        let profile = body.user;
        {
            let mut inner = self.write();
            inner.session = Some(Session {
                access_token: body.access.clone(),
                refresh_token: body.refresh.clone(),
                profile: Some(profile.clone()),
            });
            inner.state = AuthState::Authenticated;
        }
        self.persist(&body.access, &body.refresh, &profile);

        tracing::info!(username = %profile.username, "login succeeded");
        Ok(profile)
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// Safe to call from any number of in-flight requests: callers collapse
    /// onto a single network refresh. Failure is fatal for the session —
    /// it forces [`logout`](Self::logout) and fires the session-ended
    /// signal.
    ///
    /// # Errors
    /// Returns [`ApiError::SessionExpired`] when no refresh token is held
    /// or the exchange fails.
    pub async fn refresh(&self) -> Result<String> {
        let before = self.access_token();
        let _gate = self.refresh_gate.lock().await;

        // A refresh that completed while we queued already produced a new
        // token; reuse it instead of spending the (now stale) refresh token.
        if let Some(current) = self.access_token() {
            if before.as_deref() != Some(current.as_str()) {
                return Ok(current);
            }
        }

        let refresh_token = {
            let inner = self.read();
            inner.session.as_ref().map(|s| s.refresh_token.clone())
        };
        let Some(refresh_token) = refresh_token else {
            drop(_gate);
            self.terminate();
            return Err(ApiError::SessionExpired);
        };

        self.write().state = AuthState::Refreshing;
        tracing::debug!("refreshing access token");

        let url = join_url(&self.base_url, REFRESH_PATH);
        let outcome = self
            .http
            .post(&url)
            .json(&RefreshRequest {
                refresh: &refresh_token,
            })
            .send()
            .await;

        let access = match outcome {
            Ok(response) if response.status().is_success() => {
                match response.json::<RefreshResponse>().await {
                    Ok(body) => body.access,
                    Err(e) => {
                        tracing::warn!(error = %e, "refresh response unreadable; ending session");
                        drop(_gate);
                        self.terminate();
                        return Err(ApiError::SessionExpired);
                    }
                }
            }
            Ok(response) => {
                tracing::warn!(status = %response.status(), "refresh rejected; ending session");
                drop(_gate);
                self.terminate();
                return Err(ApiError::SessionExpired);
            }
            Err(e) => {
                tracing::warn!(error = %e, "refresh failed; ending session");
                drop(_gate);
                self.terminate();
                return Err(ApiError::SessionExpired);
            }
        };

        {
            let mut inner = self.write();
            if let Some(session) = inner.session.as_mut() {
                session.access_token = access.clone();
            }
            inner.state = AuthState::Authenticated;
        }
        self.store.save(keys::AUTH_ACCESS, &access);
        tracing::debug!("access token refreshed");
        Ok(access)
    }

    /// Clear the in-memory session and persisted credentials. Idempotent;
    /// fires no network call and no session-ended signal (the caller chose
    /// to log out).
    pub fn logout(&self) {
        let had_session = {
            let mut inner = self.write();
            let had = inner.session.is_some();
            inner.session = None;
            inner.state = AuthState::Unauthenticated;
            had
        };
        self.purge_persisted();
        if had_session {
            tracing::info!("logged out");
        }
    }

    /// Terminate the session involuntarily (refresh failure, terminal 401):
    /// logout plus the session-ended signal. Idempotent.
    pub(crate) fn terminate(&self) {
        let had_session = {
            let inner = self.read();
            inner.session.is_some() || inner.state != AuthState::Unauthenticated
        };
        self.logout();
        if had_session {
            self.notify_session_ended();
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn persist(&self, access: &str, refresh: &str, profile: &UserProfile) {
        self.store.save(keys::AUTH_ACCESS, &access);
        self.store.save(keys::AUTH_REFRESH, &refresh);
        self.store.save(keys::AUTH_PROFILE, profile);
    }

    fn purge_persisted(&self) {
        self.store.remove(keys::AUTH_ACCESS);
        self.store.remove(keys::AUTH_REFRESH);
        self.store.remove(keys::AUTH_PROFILE);
    }

    fn notify_session_ended(&self) {
        // Invoke with the lock released, so a callback may register
        // further listeners without deadlocking.
        let listeners: Vec<SessionEndedCallback> = self
            .listeners
            .lock()
            .expect("listener lock poisoned")
            .clone();
        for listener in &listeners {
            listener();
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().expect("session lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().expect("session lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::NoopBackend;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn manager() -> SessionManager {
        let store = Arc::new(CacheStore::new(Arc::new(NoopBackend)));
        SessionManager::new(reqwest::Client::new(), "http://localhost:1", store)
    }

    #[test]
    fn starts_unauthenticated() {
        let mgr = manager();
        assert_eq!(mgr.state(), AuthState::Unauthenticated);
        assert!(mgr.access_token().is_none());
        assert!(!mgr.is_authenticated());
    }

    #[test]
    fn logout_is_idempotent() {
        let mgr = manager();
        mgr.logout();
        mgr.logout();
        assert_eq!(mgr.state(), AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn refresh_without_token_terminates() {
        let mgr = manager();
        let fired = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&fired);
        mgr.on_session_ended(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let err = mgr.refresh().await.expect_err("no refresh token held");
        assert!(matches!(err, ApiError::SessionExpired));
        // No session existed, so nothing "ended": the signal stays quiet.
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn session_ended_listener_may_register_another_listener() {
        let mgr = Arc::new(manager());
        {
            let mut inner = mgr.write();
            inner.state = AuthState::Authenticated;
            inner.session = Some(Session {
                access_token: "a".into(),
                refresh_token: "r".into(),
                profile: None,
            });
        }

        let fired = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&fired);
        let registrar = Arc::clone(&mgr);
        mgr.on_session_ended(move || {
            seen.fetch_add(1, Ordering::SeqCst);
            registrar.on_session_ended(|| {});
        });

        mgr.terminate();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn restore_without_persisted_tokens_stays_unauthenticated() {
        let mgr = manager();
        assert_eq!(mgr.restore().await, AuthState::Unauthenticated);
    }
}
