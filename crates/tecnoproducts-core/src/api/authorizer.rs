//! Shared bearer-token injection for outgoing requests.
//!
//! A `RequestAuthorizer` is an owned handle; clones share the same token slot,
//! separate `RequestAuthorizer::new()` instances never do. Only the session
//! controller is expected to call `set_token`.

use std::sync::{Arc, PoisonError, RwLock};

use reqwest::header::{self, HeaderValue};
use reqwest::RequestBuilder;
use tracing::debug;

use super::ApiError;

#[derive(Clone, Default)]
pub struct RequestAuthorizer {
    header: Arc<RwLock<Option<HeaderValue>>>,
}

impl RequestAuthorizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or clear the access token attached to every request.
    pub fn set_token(&self, token: Option<&str>) -> Result<(), ApiError> {
        let value = match token {
            Some(token) => {
                let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|_| ApiError::InvalidToken)?;
                value.set_sensitive(true);
                Some(value)
            }
            None => None,
        };

        debug!(has_token = value.is_some(), "Authorization header updated");
        *self.header.write().unwrap_or_else(PoisonError::into_inner) = value;
        Ok(())
    }

    /// Drop the token; later requests go out without an `Authorization` header.
    pub fn clear(&self) {
        debug!("Authorization header cleared");
        *self.header.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Whether requests currently go out with an `Authorization` header
    pub fn has_token(&self) -> bool {
        self.header
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// The raw access token currently attached, if any
    pub fn token(&self) -> Option<String> {
        let guard = self.header.read().unwrap_or_else(PoisonError::into_inner);
        guard
            .as_ref()
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string)
    }

    /// Attach the current token to a request. Leaves the request untouched
    /// when no token is set, so no empty header is ever sent.
    pub fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let guard = self.header.read().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(value) => request.header(header::AUTHORIZATION, value.clone()),
            None => request,
        }
    }
}

impl std::fmt::Debug for RequestAuthorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestAuthorizer")
            .field("has_token", &self.has_token())
            .finish()
    }
}
