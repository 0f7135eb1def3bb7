//! Session token lifecycle
//!
//! A [`SessionManager`] owns the one token a client uses. It logs in on
//! demand, hands the cached token out until the device rejects it or its
//! lease runs out, and serializes logins so concurrent callers never cause
//! more than one login round trip.

use std::sync::Arc;
use std::time::{Duration, Instant};

use cgi_client::{Request, Transport};
use parking_lot::Mutex;
use serde_json::json;

use crate::config::Credentials;
use crate::envelope;
use crate::error::{ApiError, Result};

/// Margin subtracted from the device-reported lease before a token counts as expired
const LEASE_SAFETY_MARGIN: Duration = Duration::from_secs(30);

/// A session token issued by the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    value: String,
    obtained_at: Instant,
    lease: Option<Duration>,
}

impl Token {
    pub fn new(value: impl Into<String>, lease: Option<Duration>) -> Self {
        Self {
            value: value.into(),
            obtained_at: Instant::now(),
            lease,
        }
    }

    /// The opaque token string sent as `token=`
    pub fn value(&self) -> &str {
        &self.value
    }

    /// When the login that produced this token completed
    pub fn obtained_at(&self) -> Instant {
        self.obtained_at
    }

    /// Lease reported by the device, if any
    pub fn lease(&self) -> Option<Duration> {
        self.lease
    }

    /// Whether the lease has (almost) run out at `now`
    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.lease {
            None => false,
            Some(lease) => {
                let margin = LEASE_SAFETY_MARGIN.min(lease / 2);
                now.saturating_duration_since(self.obtained_at) >= lease - margin
            }
        }
    }
}

/// Authentication state of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated(Token),
}

/// Owns and renews the session token for one camera
pub struct SessionManager<T: Transport> {
    transport: Arc<T>,
    credentials: Credentials,
    state: Mutex<SessionState>,
}

impl<T: Transport> SessionManager<T> {
    pub fn new(transport: Arc<T>, credentials: Credentials) -> Self {
        Self {
            transport,
            credentials,
            state: Mutex::new(SessionState::Unauthenticated),
        }
    }

    /// Host of the underlying transport
    pub fn host(&self) -> &str {
        self.transport.host()
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Snapshot of the current state
    pub fn state(&self) -> SessionState {
        self.state.lock().clone()
    }

    /// Whether a token is cached right now
    pub fn is_authenticated(&self) -> bool {
        matches!(*self.state.lock(), SessionState::Authenticated(_))
    }

    /// Return the cached token, logging in first if there is none
    ///
    /// The state lock is held across the login round trip, so a second
    /// caller arriving while a login is in flight waits for it and then
    /// reuses its token instead of logging in again.
    pub fn ensure_authenticated(&self) -> Result<String> {
        let mut state = self.state.lock();

        if let SessionState::Authenticated(token) = &*state {
            if !token.is_expired_at(Instant::now()) {
                return Ok(token.value().to_string());
            }
            tracing::debug!(host = %self.host(), "token lease elapsed, logging in again");
            *state = SessionState::Unauthenticated;
        }

        let token = self.login()?;
        let value = token.value().to_string();
        *state = SessionState::Authenticated(token);
        Ok(value)
    }

    /// Drop the cached token unconditionally
    pub fn invalidate(&self) {
        *self.state.lock() = SessionState::Unauthenticated;
    }

    /// Drop the cached token only if it is still `rejected`
    ///
    /// Returns `true` if the token was cleared. When another caller has
    /// already replaced the rejected token, the fresh one is kept.
    pub fn invalidate_token(&self, rejected: &str) -> bool {
        let mut state = self.state.lock();
        match &*state {
            SessionState::Authenticated(token) if token.value() == rejected => {
                *state = SessionState::Unauthenticated;
                true
            }
            _ => false,
        }
    }

    /// Release the server-side session
    ///
    /// Best effort: failures are logged, never returned. The local state is
    /// `Unauthenticated` afterwards no matter what the device answered.
    pub fn logout(&self) {
        let token = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut *state, SessionState::Unauthenticated) {
                SessionState::Authenticated(token) => token,
                SessionState::Unauthenticated => return,
            }
        };

        let request = Request::post("Logout", envelope::request_body("Logout", 0, None))
            .with_token(token.value());

        let outcome = self
            .transport
            .send(&request)
            .map_err(ApiError::from)
            .and_then(|response| envelope::decode("Logout", &response.body));

        match outcome {
            Ok(_) => tracing::info!(host = %self.host(), "logged out"),
            Err(e) => tracing::warn!(host = %self.host(), error = %e, "logout failed, discarding token"),
        }
    }

    fn login(&self) -> Result<Token> {
        let body = envelope::request_body(
            "Login",
            0,
            Some(&json!({
                "User": {
                    "userName": self.credentials.username,
                    "password": self.credentials.password,
                }
            })),
        );

        tracing::debug!(host = %self.host(), user = %self.credentials.username, "logging in");

        let response = self.transport.send(&Request::post("Login", body))?;
        let item = envelope::parse("Login", &response.body)?;

        if let Some(error) = item.error {
            let detail = error.detail.unwrap_or_else(|| "unknown error".to_string());
            return Err(ApiError::AuthError(format!(
                "Login failed: {} (code {})",
                detail, error.rsp_code
            )));
        }
        if item.code != 0 {
            return Err(ApiError::AuthError(format!(
                "Login failed with code {}",
                item.code
            )));
        }

        let token_obj = item.value.as_ref().and_then(|v| v.get("Token"));
        let name = token_obj
            .and_then(|t| t.get("name"))
            .and_then(|n| n.as_str())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                ApiError::AuthError("Login succeeded but no token returned".to_string())
            })?;
        let lease = token_obj
            .and_then(|t| t.get("leaseTime"))
            .and_then(|l| l.as_u64())
            .map(Duration::from_secs);

        tracing::info!(host = %self.host(), lease_secs = lease.map(|l| l.as_secs()), "logged in");

        Ok(Token::new(name, lease))
    }
}

impl<T: Transport> std::fmt::Debug for SessionManager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("host", &self.host())
            .field("credentials", &self.credentials)
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}
