use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Credentials rejected: {detail}")]
    CredentialsRejected { detail: String },

    #[error("Refresh token rejected: {0}")]
    RefreshRejected(String),

    #[error("Unauthorized - token missing or expired")]
    Unauthorized,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Request rejected: {detail}")]
    BadRequest { detail: String },

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Token cannot be used as a header value")]
    InvalidToken,
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Fallback shown when a login failure carries no `detail`
const LOGIN_FAILED_MESSAGE: &str = "Login failed. Please try again.";

/// Error payload returned by the backend (`{"detail": "..."}`)
#[derive(Debug, Deserialize)]
struct ErrorPayload {
    detail: Option<String>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut cut = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..cut], body.len())
        }
    }

    /// Pull the human-readable `detail` out of an error payload, if any.
    pub fn extract_detail(body: &str) -> Option<String> {
        serde_json::from_str::<ErrorPayload>(body)
            .ok()
            .and_then(|p| p.detail)
            .filter(|d| !d.is_empty())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            400 => ApiError::BadRequest {
                detail: Self::extract_detail(body).unwrap_or(truncated),
            },
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// Map a failed `POST /token/` exchange.
    pub fn from_login_status(status: reqwest::StatusCode, body: &str) -> Self {
        match status.as_u16() {
            400 | 401 => ApiError::CredentialsRejected {
                detail: Self::extract_detail(body)
                    .unwrap_or_else(|| LOGIN_FAILED_MESSAGE.to_string()),
            },
            _ => Self::from_status(status, body),
        }
    }

    /// Map a failed `POST /token/refresh/` exchange.
    pub fn from_refresh_status(status: reqwest::StatusCode, body: &str) -> Self {
        match status.as_u16() {
            400 | 401 => ApiError::RefreshRejected(
                Self::extract_detail(body).unwrap_or_else(|| Self::truncate_body(body)),
            ),
            _ => Self::from_status(status, body),
        }
    }

    /// True for failures that mean the request lacked a usable access token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    /// Transport failures the user may retry by hand.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::NetworkError(_) | ApiError::RateLimited | ApiError::ServerError(_) => true,
            _ => false,
        }
    }

    /// Message suitable for showing to the end user
    pub fn user_message(&self) -> String {
        match self {
            ApiError::CredentialsRejected { detail } => detail.clone(),
            ApiError::RefreshRejected(_) => "Your session has expired. Please log in again.".to_string(),
            ApiError::Unauthorized => "You are not authenticated. Log in to continue.".to_string(),
            ApiError::AccessDenied(_) => "You do not have permission to do that.".to_string(),
            ApiError::BadRequest { detail } => detail.clone(),
            ApiError::RateLimited => "Too many requests. Please wait and try again.".to_string(),
            ApiError::NetworkError(e) if e.is_timeout() => {
                "Connection timed out. Please try again.".to_string()
            }
            ApiError::NetworkError(_) => {
                "Unable to connect to server. Check your internet connection.".to_string()
            }
            other => other.to_string(),
        }
    }
}
