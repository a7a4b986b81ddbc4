//! Wiring of the session layer for a running panel.
//!
//! `App` owns one credential store, one request authorizer, the session
//! controller over both, an API client routed through that authorizer, and a
//! route guard reading the same session.

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use crate::api::{ApiClient, ApiError, RequestAuthorizer};
use crate::auth::{
    sign_in, CredentialPair, CredentialStore, LogoutOutcome, Route, RouteDecision, RouteGuard,
    SessionController, SessionError,
};
use crate::config::Config;

pub struct App {
    pub config: Config,
    pub session: SessionController,
    pub api: ApiClient,
    pub guard: RouteGuard,
}

impl App {
    /// Build from config, opening the configured credential backend
    pub fn new(config: Config) -> Result<Self> {
        let store = config.open_credential_store()?;
        Self::with_store(config, store)
    }

    /// Build with an explicit store and resume any stored session
    pub fn with_store(config: Config, store: Arc<dyn CredentialStore>) -> Result<Self> {
        let authorizer = RequestAuthorizer::new();
        let session = SessionController::new(store, authorizer.clone());
        let api = ApiClient::new(&config.api_base_url, config.request_timeout(), authorizer)?;
        let guard = RouteGuard::new(session.clone());

        match session.restore() {
            Ok(restored) => debug!(restored, "Session loaded"),
            Err(e) => warn!(error = %e, "Failed to restore session, starting logged out"),
        }

        Ok(Self {
            config,
            session,
            api,
            guard,
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Password login; remembers the username on success
    pub async fn login(&mut self, username: &str, password: &str) -> Result<CredentialPair, SessionError> {
        let pair = sign_in(&self.session, &self.api, username, password).await?;
        self.config.last_username = Some(username.trim().to_string());
        Ok(pair)
    }

    pub fn logout(&self) -> Result<LogoutOutcome, SessionError> {
        self.session.logout()
    }

    pub async fn refresh(&self) -> Result<String, SessionError> {
        self.session.renew_access(&self.api).await
    }

    pub fn check(&self, route: Route) -> RouteDecision {
        self.guard.check(route)
    }

    /// Run a resource call, applying the configured refresh-and-retry policy
    pub async fn call<T, F, Fut>(&self, op: F) -> Result<T, SessionError>
    where
        F: Fn(ApiClient) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        if self.config.auto_refresh {
            self.session.with_refresh_retry(&self.api, op).await
        } else {
            Ok(op(self.api.clone()).await?)
        }
    }
}
