use tracing::{error, info};

use crate::api::ApiClient;

use super::{CredentialPair, SessionController, SessionError};

/// Exchange username and password for tokens and start a session.
///
/// Rejected credentials come back as `ApiError::CredentialsRejected` with the
/// server's `detail`; the session is left exactly as it was.
pub async fn sign_in(
    session: &SessionController,
    api: &ApiClient,
    username: &str,
    password: &str,
) -> Result<CredentialPair, SessionError> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(SessionError::MissingCredentials);
    }

    let pair = match api.authenticate(username, password).await {
        Ok(pair) => pair,
        Err(e) => {
            error!(error = %e, "Login failed");
            return Err(e.into());
        }
    };

    session.login(&pair)?;
    info!(username = username, "Signed in");
    Ok(pair)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::api::{ApiError, RequestAuthorizer};
    use crate::auth::MemoryCredentialStore;

    #[tokio::test]
    async fn test_missing_credentials_never_hit_network() {
        let session = SessionController::new(Arc::new(MemoryCredentialStore::new()), RequestAuthorizer::new());
        let api = ApiClient::new("http://127.0.0.1:9", Duration::from_secs(1), session.authorizer().clone()).unwrap();

        let err = sign_in(&session, &api, "  ", "secret").await.unwrap_err();
        assert!(matches!(err, SessionError::MissingCredentials));

        let err = sign_in(&session, &api, "admin", "").await.unwrap_err();
        assert!(matches!(err, SessionError::MissingCredentials));
    }

    #[tokio::test]
    async fn test_rejected_login_keeps_previous_session() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/token/")
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(r#"{"detail":"No active account found with the given credentials"}"#)
            .create_async()
            .await;

        let session = SessionController::new(Arc::new(MemoryCredentialStore::new()), RequestAuthorizer::new());
        session.login(&CredentialPair::new("A0", "R0")).unwrap();
        let api = ApiClient::new(&server.url(), Duration::from_secs(5), session.authorizer().clone()).unwrap();

        let err = sign_in(&session, &api, "admin", "wrong").await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Api(ApiError::CredentialsRejected { .. })
        ));
        assert!(session.is_authenticated());
        assert_eq!(session.authorizer().token().as_deref(), Some("A0"));
    }
}
