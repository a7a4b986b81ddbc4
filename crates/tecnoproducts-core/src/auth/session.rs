//! Session controller: the one authority on whether the user is logged in.
//!
//! The in-memory flag is the source of truth. Every transition writes through
//! to the credential store and the request authorizer, and nothing else in the
//! crate mutates those two.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError, RequestAuthorizer};

use super::{CredentialPair, CredentialStore, SessionError};

/// Result of a logout request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutOutcome {
    SignedOut,
    /// Nothing was signed in; storage was cleared anyway.
    AlreadySignedOut,
}

#[derive(Clone)]
pub struct SessionController {
    store: Arc<dyn CredentialStore>,
    authorizer: RequestAuthorizer,
    state: Arc<watch::Sender<bool>>,
    /// Bumped by every restore, login and logout. Held while a transition
    /// writes through, so a renewal started under an older epoch never lands.
    epoch: Arc<Mutex<u64>>,
}

impl SessionController {
    /// Create a logged-out controller. Call `restore` to pick up stored tokens.
    pub fn new(store: Arc<dyn CredentialStore>, authorizer: RequestAuthorizer) -> Self {
        let (state, _) = watch::channel(false);
        Self {
            store,
            authorizer,
            state: Arc::new(state),
            epoch: Arc::new(Mutex::new(0)),
        }
    }

    /// The authorizer this controller drives; hand it to `ApiClient::new`.
    pub fn authorizer(&self) -> &RequestAuthorizer {
        &self.authorizer
    }

    pub fn is_authenticated(&self) -> bool {
        *self.state.borrow()
    }

    /// Observe changes to the authenticated flag
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }

    fn lock_epoch(&self) -> MutexGuard<'_, u64> {
        self.epoch.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_authenticated(&self, value: bool) {
        let previous = self.state.send_replace(value);
        if previous != value {
            debug!(authenticated = value, "Session state changed");
        }
    }

    /// Drop local state after a failed write so a later `restore` cannot
    /// resurrect the previous pair.
    fn abandon(&self) {
        self.authorizer.clear();
        self.set_authenticated(false);
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear credential storage");
        }
    }

    /// Inspect the credential store at startup and resume a stored session.
    pub fn restore(&self) -> Result<bool, SessionError> {
        let mut epoch = self.lock_epoch();
        *epoch += 1;

        match self.store.read()? {
            Some(pair) => {
                self.authorizer.set_token(Some(&pair.access))?;
                self.set_authenticated(true);
                info!("Session restored from storage");
                Ok(true)
            }
            None => {
                self.authorizer.clear();
                self.set_authenticated(false);
                debug!("No stored session");
                Ok(false)
            }
        }
    }

    /// Record freshly obtained credentials and mark the session active.
    ///
    /// The network exchange happens elsewhere (see `sign_in`); this only
    /// transitions local state.
    pub fn login(&self, pair: &CredentialPair) -> Result<(), SessionError> {
        if pair.access.is_empty() {
            return Err(SessionError::EmptyToken);
        }

        let mut epoch = self.lock_epoch();
        *epoch += 1;

        self.authorizer.set_token(Some(&pair.access))?;

        if let Err(e) = self.store.write(pair) {
            self.abandon();
            return Err(e.into());
        }

        self.set_authenticated(true);
        info!("Login successful");
        Ok(())
    }

    /// End the session. Safe to call when already logged out.
    pub fn logout(&self) -> Result<LogoutOutcome, SessionError> {
        let mut epoch = self.lock_epoch();
        self.end_session(&mut epoch)
    }

    fn end_session(&self, epoch: &mut u64) -> Result<LogoutOutcome, SessionError> {
        *epoch += 1;
        let was_authenticated = self.is_authenticated();

        self.authorizer.clear();
        self.set_authenticated(false);

        if let Err(e) = self.store.clear() {
            if was_authenticated {
                return Err(e.into());
            }
            warn!(error = %e, "Failed to clear credential storage");
        }

        if was_authenticated {
            info!("Logged out");
            Ok(LogoutOutcome::SignedOut)
        } else {
            debug!("Logout requested without an active session");
            Ok(LogoutOutcome::AlreadySignedOut)
        }
    }

    /// Swap the stored refresh token for a new access token.
    ///
    /// On success the new token is written through, unless the session was
    /// ended or replaced while the request was in flight; the token is then
    /// dropped and `SessionChanged` returned. A rejected refresh token forces
    /// a logout of the session it belonged to. Any other failure leaves state
    /// untouched.
    pub async fn renew_access(&self, api: &ApiClient) -> Result<String, SessionError> {
        let (started, pair) = {
            let epoch = self.lock_epoch();
            if !self.is_authenticated() {
                return Err(SessionError::NoRefreshToken);
            }
            let pair = self
                .store
                .read()?
                .filter(|p| !p.refresh.is_empty())
                .ok_or(SessionError::NoRefreshToken)?;
            (*epoch, pair)
        };

        let result = api.refresh_access_token(&pair.refresh).await;

        let mut epoch = self.lock_epoch();
        let current = *epoch == started && self.is_authenticated();

        match result {
            Ok(_) if !current => {
                debug!("Session changed during token refresh, discarding new token");
                Err(SessionError::SessionChanged)
            }
            Ok(access) => {
                self.authorizer.set_token(Some(&access))?;
                if let Err(e) = self.store.write(&pair.with_access(access.as_str())) {
                    *epoch += 1;
                    self.abandon();
                    return Err(e.into());
                }
                info!("Access token renewed");
                Ok(access)
            }
            Err(ApiError::RefreshRejected(detail)) => {
                if current {
                    warn!(detail = %detail, "Refresh token rejected, forcing logout");
                    self.end_session(&mut epoch)?;
                } else {
                    debug!("Stale refresh token rejected, session already changed");
                }
                Err(ApiError::RefreshRejected(detail).into())
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                Err(e.into())
            }
        }
    }

    /// Run `op`; if it fails as unauthorized, renew the access token once and
    /// retry once. A second failure is returned as-is.
    pub async fn with_refresh_retry<T, F, Fut>(&self, api: &ApiClient, op: F) -> Result<T, SessionError>
    where
        F: Fn(ApiClient) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        match op(api.clone()).await {
            Err(ApiError::Unauthorized) => {
                debug!("Request unauthorized, renewing access token");
                self.renew_access(api).await?;
                Ok(op(api.clone()).await?)
            }
            other => Ok(other?),
        }
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("authenticated", &self.is_authenticated())
            .field("authorizer", &self.authorizer)
            .finish()
    }
}
