//! Session context: the bearer credential and who may invalidate it.
//!
//! A [`Session`] is handed to every client constructor instead of living in
//! global state. Reads go through [`Session::token`], which returns an
//! immutable snapshot. The only path that deletes the credential *and*
//! navigates away is [`Session::expire`]; it is guarded so that several
//! requests failing at once produce one redirect, not one per request.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwapOption;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

use crate::error::Error;

/// Default route the navigator is sent to when the session expires.
pub const LOGIN_ROUTE: &str = "/login";

// ── TokenStore ───────────────────────────────────────────────────────

/// Persistent storage for the single bearer credential.
///
/// Implementations keep exactly one value under a fixed key. Reading a
/// store that holds nothing (or that cannot be read) yields `None`: a
/// missing token only means requests go out unauthenticated.
pub trait TokenStore: Send + Sync {
    fn get(&self) -> Option<SecretString>;
    fn set(&self, token: &SecretString) -> Result<(), Error>;
    fn remove(&self) -> Result<(), Error>;
}

/// Process-local token store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: ArcSwapOption<SecretString>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let store = Self::new();
        store
            .token
            .store(Some(Arc::new(SecretString::from(token.into()))));
        store
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<SecretString> {
        self.token.load_full().map(|t| t.as_ref().clone())
    }

    fn set(&self, token: &SecretString) -> Result<(), Error> {
        self.token.store(Some(Arc::new(token.clone())));
        Ok(())
    }

    fn remove(&self) -> Result<(), Error> {
        self.token.store(None);
        Ok(())
    }
}

// ── Navigator ────────────────────────────────────────────────────────

/// The "send the user somewhere else" side effect.
pub trait Navigator: Send + Sync {
    fn redirect(&self, route: &str);
}

/// Navigator that only remembers where it was last sent.
#[derive(Default)]
pub struct MemoryNavigator {
    location: ArcSwapOption<String>,
}

impl MemoryNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last route passed to [`Navigator::redirect`], if any.
    pub fn location(&self) -> Option<String> {
        self.location.load_full().map(|l| l.as_ref().clone())
    }
}

impl Navigator for MemoryNavigator {
    fn redirect(&self, route: &str) {
        self.location.store(Some(Arc::new(route.to_owned())));
    }
}

// ── Session ──────────────────────────────────────────────────────────

/// Owner of the credential lifecycle for one client process.
pub struct Session {
    tokens: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    login_route: String,
    expired: AtomicBool,
}

impl Session {
    pub fn new(tokens: Arc<dyn TokenStore>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            tokens,
            navigator,
            login_route: LOGIN_ROUTE.to_owned(),
            expired: AtomicBool::new(false),
        }
    }

    /// Override the route used on expiry (default `/login`).
    pub fn with_login_route(mut self, route: impl Into<String>) -> Self {
        self.login_route = route.into();
        self
    }

    pub fn login_route(&self) -> &str {
        &self.login_route
    }

    /// Snapshot of the current credential.
    pub fn token(&self) -> Option<SecretString> {
        self.tokens
            .get()
            .filter(|t| !t.expose_secret().trim().is_empty())
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// `Authorization` header value for the current credential.
    pub fn bearer(&self) -> Option<SecretString> {
        self.token()
            .map(|t| SecretString::from(format!("Bearer {}", t.expose_secret())))
    }

    /// Store a fresh credential and re-arm expiry handling.
    pub fn sign_in(&self, token: &SecretString) -> Result<(), Error> {
        self.tokens.set(token)?;
        self.expired.store(false, Ordering::SeqCst);
        info!("signed in");
        Ok(())
    }

    /// Forget the credential without navigating anywhere.
    pub fn sign_out(&self) -> Result<(), Error> {
        self.tokens.remove()?;
        debug!("signed out");
        Ok(())
    }

    /// Declare the credential invalid: delete it, then redirect to the
    /// login route.
    ///
    /// Returns `true` for the caller that actually performed the expiry.
    /// Later callers (until the next [`sign_in`](Self::sign_in)) get
    /// `false` and cause no second redirect.
    pub fn expire(&self) -> bool {
        if self
            .expired
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("session already expired, skipping redirect");
            return false;
        }

        if let Err(e) = self.tokens.remove() {
            warn!(error = %e, "failed to remove expired token");
        }
        info!(route = %self.login_route, "session expired, redirecting");
        self.navigator.redirect(&self.login_route);
        true
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .field("login_route", &self.login_route)
            .field("expired", &self.expired.load(Ordering::SeqCst))
            .finish()
    }
}
