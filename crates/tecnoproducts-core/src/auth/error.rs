use thiserror::Error;

use super::StoreError;
use crate::api::ApiError;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Access token is empty")]
    EmptyToken,

    #[error("Username and password required")]
    MissingCredentials,

    #[error("No refresh token stored")]
    NoRefreshToken,

    #[error("Session changed while the access token was being renewed")]
    SessionChanged,

    #[error("Credential storage failed: {0}")]
    Storage(#[from] StoreError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl SessionError {
    /// The underlying API error, if this came from the remote side
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            SessionError::Api(e) => Some(e),
            _ => None,
        }
    }

    /// Failures after which the user has to log in again
    pub fn requires_login(&self) -> bool {
        match self {
            SessionError::NoRefreshToken => true,
            SessionError::Api(e) => matches!(e, ApiError::RefreshRejected(_) | ApiError::Unauthorized),
            _ => false,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            SessionError::Api(e) => e.user_message(),
            SessionError::NoRefreshToken => "You are not authenticated. Log in to continue.".to_string(),
            other => other.to_string(),
        }
    }
}
