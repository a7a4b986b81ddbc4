use std::sync::Arc;
use std::time::Duration;

use mockito::Matcher;
use serde_json::json;
use tecnoproducts_core::auth::{FileCredentialStore, MemoryCredentialStore};
use tecnoproducts_core::{
    sign_in, ApiClient, ApiError, CredentialPair, CredentialStore, LogoutOutcome,
    RequestAuthorizer, Route, RouteDecision, RouteGuard, SessionController, SessionError,
};

struct Panel {
    session: SessionController,
    api: ApiClient,
    guard: RouteGuard,
}

fn panel(base_url: &str, store: Arc<dyn CredentialStore>) -> Panel {
    let authorizer = RequestAuthorizer::new();
    let session = SessionController::new(store, authorizer.clone());
    let api = ApiClient::new(base_url, Duration::from_secs(5), authorizer).unwrap();
    let guard = RouteGuard::new(session.clone());
    Panel { session, api, guard }
}

async fn mock_login_ok(server: &mut mockito::Server) -> mockito::Mock {
    server
        .mock("POST", "/token/")
        .match_body(Matcher::Json(json!({"username": "admin", "password": "secret"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access":"A1","refresh":"R1"}"#)
        .create_async()
        .await
}

#[tokio::test]
async fn valid_login_admits_product_list() {
    let mut server = mockito::Server::new_async().await;
    let _login = mock_login_ok(&mut server).await;
    let products = server
        .mock("GET", "/Producto/")
        .match_header("authorization", "Bearer A1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("[]")
        .create_async()
        .await;

    let p = panel(&server.url(), Arc::new(MemoryCredentialStore::new()));
    assert_eq!(p.guard.check(Route::Products), RouteDecision::Redirect(Route::Login));

    let pair = sign_in(&p.session, &p.api, "admin", "secret").await.unwrap();
    assert_eq!(pair, CredentialPair::new("A1", "R1"));
    assert!(p.session.is_authenticated());
    assert_eq!(p.guard.check(Route::Products), RouteDecision::Admit(Route::Products));

    p.api.list_products().await.unwrap();
    products.assert_async().await;
}

#[tokio::test]
async fn invalid_login_reports_detail_and_stays_logged_out() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/token/")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"detail":"No active account found with the given credentials"}"#)
        .create_async()
        .await;

    let p = panel(&server.url(), Arc::new(MemoryCredentialStore::new()));
    let err = sign_in(&p.session, &p.api, "admin", "wrong").await.unwrap_err();

    match err {
        SessionError::Api(ApiError::CredentialsRejected { detail }) => {
            assert_eq!(detail, "No active account found with the given credentials");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!p.session.is_authenticated());
    assert_eq!(p.guard.check(Route::Products), RouteDecision::Redirect(Route::Login));
}

#[tokio::test]
async fn logout_strips_authorization_header() {
    let mut server = mockito::Server::new_async().await;
    let _login = mock_login_ok(&mut server).await;
    let anonymous = server
        .mock("GET", "/Categoria/")
        .match_header("authorization", Matcher::Missing)
        .with_status(401)
        .with_body(r#"{"detail":"Authentication credentials were not provided."}"#)
        .create_async()
        .await;

    let p = panel(&server.url(), Arc::new(MemoryCredentialStore::new()));
    sign_in(&p.session, &p.api, "admin", "secret").await.unwrap();

    assert_eq!(p.session.logout().unwrap(), LogoutOutcome::SignedOut);
    assert_eq!(p.session.logout().unwrap(), LogoutOutcome::AlreadySignedOut);
    assert!(!p.session.is_authenticated());

    let err = p.api.list_categories().await.unwrap_err();
    assert!(err.is_unauthorized());
    anonymous.assert_async().await;
    assert_eq!(p.guard.navigate("/Categoria").unwrap(), RouteDecision::Redirect(Route::Login));
}

#[tokio::test]
async fn session_survives_reload_with_file_store() {
    let mut server = mockito::Server::new_async().await;
    let _login = mock_login_ok(&mut server).await;
    let dir = tempfile::tempdir().unwrap();

    {
        let p = panel(&server.url(), Arc::new(FileCredentialStore::new(dir.path().to_path_buf())));
        sign_in(&p.session, &p.api, "admin", "secret").await.unwrap();
    }

    // Fresh process: nothing in memory until restore
    let p = panel(&server.url(), Arc::new(FileCredentialStore::new(dir.path().to_path_buf())));
    assert!(!p.session.is_authenticated());
    assert!(p.session.restore().unwrap());
    assert_eq!(p.session.authorizer().token().as_deref(), Some("A1"));
    assert!(p.guard.check(Route::Sales).is_admitted());

    p.session.logout().unwrap();
    let reloaded = panel(&server.url(), Arc::new(FileCredentialStore::new(dir.path().to_path_buf())));
    assert!(!reloaded.session.restore().unwrap());
}

#[tokio::test]
async fn refresh_mints_new_token_and_rejection_mutates_nothing() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/token/refresh/")
        .match_body(Matcher::Json(json!({"refresh": "R1"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access":"A2"}"#)
        .create_async()
        .await;
    let _mock = server
        .mock("POST", "/token/refresh/")
        .match_body(Matcher::Json(json!({"refresh": "bogus"})))
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"detail":"Token is invalid or expired","code":"token_not_valid"}"#)
        .create_async()
        .await;

    let store = Arc::new(MemoryCredentialStore::new());
    let p = panel(&server.url(), store.clone());
    p.session.login(&CredentialPair::new("A1", "R1")).unwrap();

    let fresh = p.api.refresh_access_token("R1").await.unwrap();
    assert_ne!(fresh, "A1");

    let err = p.api.refresh_access_token("bogus").await.unwrap_err();
    assert!(matches!(err, ApiError::RefreshRejected(_)));

    // The bare procedure never touches shared state
    assert_eq!(p.session.authorizer().token().as_deref(), Some("A1"));
    assert_eq!(store.read().unwrap(), Some(CredentialPair::new("A1", "R1")));
    assert!(p.session.is_authenticated());
}

#[tokio::test]
async fn subscribers_see_login_and_logout() {
    let mut server = mockito::Server::new_async().await;
    let _login = mock_login_ok(&mut server).await;

    let p = panel(&server.url(), Arc::new(MemoryCredentialStore::new()));
    let mut rx = p.session.subscribe();

    sign_in(&p.session, &p.api, "admin", "secret").await.unwrap();
    rx.changed().await.unwrap();
    assert!(*rx.borrow_and_update());

    p.session.logout().unwrap();
    rx.changed().await.unwrap();
    assert!(!*rx.borrow_and_update());
}
