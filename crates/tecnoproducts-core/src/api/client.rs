//! API client for the TecnoProducts REST backend.
//!
//! Every resource request goes through the shared `RequestAuthorizer`, so
//! callers never manage the `Authorization` header themselves. The two token
//! exchanges (`/token/` and `/token/refresh/`) are plain requests that do not
//! read or modify the authorizer.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::CredentialPair;
use crate::models::{Category, CategoryInput, Product, ProductInput, Sale, SaleInput, Supplier};

use super::{ApiError, RequestAuthorizer};

// ============================================================================
// Constants
// ============================================================================

/// Default backend location used by the panel
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api";

/// HTTP request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting
const INITIAL_BACKOFF_MS: u64 = 1000;

const TOKEN_PATH: &str = "/token/";
const TOKEN_REFRESH_PATH: &str = "/token/refresh/";
const CATEGORIES_PATH: &str = "/Categoria/";
const PRODUCTS_PATH: &str = "/Producto/";
const SALES_PATH: &str = "/Venta/";
const SUPPLIERS_PATH: &str = "/Proveedor/";

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access: String,
    refresh: String,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
}

/// API client for the storefront backend.
/// Clone is cheap - reqwest::Client and the authorizer are both Arc-backed.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    authorizer: RequestAuthorizer,
    backoff_ms: u64,
}

impl ApiClient {
    /// Create a new API client bound to `base_url`
    pub fn new(
        base_url: &str,
        timeout: Duration,
        authorizer: RequestAuthorizer,
    ) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            authorizer,
            backoff_ms: INITIAL_BACKOFF_MS,
        })
    }

    /// Override the initial rate-limit backoff (tests use a few milliseconds)
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff_ms = backoff.as_millis() as u64;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn authorizer(&self) -> &RequestAuthorizer {
        &self.authorizer
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ===== Token Exchanges =====

    /// Exchange username and password for a credential pair (`POST /token/`)
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<CredentialPair, ApiError> {
        let url = self.url(TOKEN_PATH);
        debug!(url = %url, "Sending authentication request");

        let response = self
            .client
            .post(&url)
            .json(&LoginRequest { username, password })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_login_status(status, &body));
        }

        let tokens: LoginResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("auth response: {}", e)))?;

        if tokens.access.is_empty() {
            return Err(ApiError::InvalidResponse("empty access token".to_string()));
        }

        Ok(CredentialPair::new(tokens.access, tokens.refresh))
    }

    /// Mint a new access token from a refresh token (`POST /token/refresh/`).
    ///
    /// Side-effect free: the caller decides whether to store the new token
    /// and what to do when the refresh token is rejected.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<String, ApiError> {
        let url = self.url(TOKEN_REFRESH_PATH);
        debug!(url = %url, "Sending token refresh request");

        let response = self
            .client
            .post(&url)
            .json(&RefreshRequest {
                refresh: refresh_token,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_refresh_status(status, &body));
        }

        let refreshed: RefreshResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("refresh response: {}", e)))?;

        if refreshed.access.is_empty() {
            return Err(ApiError::InvalidResponse("empty access token".to_string()));
        }

        Ok(refreshed.access)
    }

    // ===== Request Plumbing =====

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(response: Response) -> Result<Option<Response>, ApiError> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Send an authorized request, retrying with exponential backoff on 429.
    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response, ApiError> {
        let url = self.url(path);
        let mut retries = 0;
        let mut backoff_ms = self.backoff_ms;

        loop {
            let mut request: RequestBuilder = self.client.request(method.clone(), &url);
            if let Some(body) = body {
                request = request.json(body);
            }
            let response = self.authorizer.authorize(request).send().await?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => return Ok(response),
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited);
                    }
                    warn!(url = %url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                }
            }
        }
    }

    async fn parse<T: DeserializeOwned>(response: Response, path: &str) -> Result<T, ApiError> {
        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("{}: {}", path, e)))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send::<()>(Method::GET, path, None).await?;
        Self::parse(response, path).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        let response = self.send(Method::POST, path, Some(body)).await?;
        Self::parse(response, path).await
    }

    async fn put<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        let response = self.send(Method::PUT, path, Some(body)).await?;
        Self::parse(response, path).await
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send::<()>(Method::DELETE, path, None).await?;
        Ok(())
    }

    // ===== Categories =====

    pub async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        self.get(CATEGORIES_PATH).await
    }

    pub async fn create_category(&self, input: &CategoryInput) -> Result<Category, ApiError> {
        self.post(CATEGORIES_PATH, input).await
    }

    pub async fn update_category(&self, id: i64, input: &CategoryInput) -> Result<Category, ApiError> {
        self.put(&format!("{}{}/", CATEGORIES_PATH, id), input).await
    }

    pub async fn delete_category(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("{}{}/", CATEGORIES_PATH, id)).await
    }

    // ===== Products =====

    pub async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        self.get(PRODUCTS_PATH).await
    }

    pub async fn create_product(&self, input: &ProductInput) -> Result<Product, ApiError> {
        self.post(PRODUCTS_PATH, input).await
    }

    pub async fn update_product(&self, id: i64, input: &ProductInput) -> Result<Product, ApiError> {
        self.put(&format!("{}{}/", PRODUCTS_PATH, id), input).await
    }

    pub async fn delete_product(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("{}{}/", PRODUCTS_PATH, id)).await
    }

    // ===== Sales =====

    pub async fn list_sales(&self) -> Result<Vec<Sale>, ApiError> {
        self.get(SALES_PATH).await
    }

    pub async fn create_sale(&self, input: &SaleInput) -> Result<Sale, ApiError> {
        self.post(SALES_PATH, input).await
    }

    pub async fn delete_sale(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("{}{}/", SALES_PATH, id)).await
    }

    // ===== Suppliers =====

    pub async fn list_suppliers(&self) -> Result<Vec<Supplier>, ApiError> {
        self.get(SUPPLIERS_PATH).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn client_for(server: &mockito::Server, authorizer: RequestAuthorizer) -> ApiClient {
        ApiClient::new(&server.url(), Duration::from_secs(5), authorizer)
            .unwrap()
            .with_backoff(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_authenticate_returns_pair() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token/")
            .match_body(Matcher::Json(json!({"username": "admin", "password": "secret"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access":"A1","refresh":"R1"}"#)
            .create_async()
            .await;

        let api = client_for(&server, RequestAuthorizer::new());
        let pair = api.authenticate("admin", "secret").await.unwrap();

        assert_eq!(pair.access, "A1");
        assert_eq!(pair.refresh, "R1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_authenticate_rejected_surfaces_detail() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/token/")
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(r#"{"detail":"No active account found with the given credentials"}"#)
            .create_async()
            .await;

        let api = client_for(&server, RequestAuthorizer::new());
        let err = api.authenticate("admin", "wrong").await.unwrap_err();

        assert_eq!(
            err.user_message(),
            "No active account found with the given credentials"
        );
    }

    #[tokio::test]
    async fn test_refresh_does_not_touch_authorizer() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/token/refresh/")
            .match_body(Matcher::Json(json!({"refresh": "R1"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access":"A2"}"#)
            .create_async()
            .await;

        let authorizer = RequestAuthorizer::new();
        authorizer.set_token(Some("A1")).unwrap();
        let api = client_for(&server, authorizer.clone());

        let access = api.refresh_access_token("R1").await.unwrap();
        assert_eq!(access, "A2");
        assert_eq!(authorizer.token().as_deref(), Some("A1"));
    }

    #[tokio::test]
    async fn test_refresh_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/token/refresh/")
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(r#"{"detail":"Token is invalid or expired","code":"token_not_valid"}"#)
            .create_async()
            .await;

        let api = client_for(&server, RequestAuthorizer::new());
        let err = api.refresh_access_token("stale").await.unwrap_err();
        assert!(matches!(err, ApiError::RefreshRejected(_)));
    }

    #[tokio::test]
    async fn test_resource_requests_carry_bearer_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/Producto/")
            .match_header("authorization", "Bearer A1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"id":1,"nombre":"Mouse","precio":"9.99","stock":4,"categoria":1,"proveedor":1}]"#)
            .create_async()
            .await;

        let authorizer = RequestAuthorizer::new();
        authorizer.set_token(Some("A1")).unwrap();
        let api = client_for(&server, authorizer);

        let products = api.list_products().await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].precio, "9.99");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_no_header_without_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/Categoria/")
            .match_header("authorization", Matcher::Missing)
            .with_status(401)
            .with_body(r#"{"detail":"Authentication credentials were not provided."}"#)
            .create_async()
            .await;

        let api = client_for(&server, RequestAuthorizer::new());
        let err = api.list_categories().await.unwrap_err();

        assert!(err.is_unauthorized());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_sale_over_stock_is_bad_request() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/Venta/")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"detail":"Stock insuficiente"}"#)
            .create_async()
            .await;

        let api = client_for(&server, RequestAuthorizer::new());
        let err = api
            .create_sale(&SaleInput {
                producto: 1,
                cantidad: 500,
                total: "5000.00".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::BadRequest { ref detail } if detail == "Stock insuficiente"));
    }

    #[tokio::test]
    async fn test_delete_uses_trailing_slash_path() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/Categoria/7/")
            .with_status(204)
            .create_async()
            .await;

        let api = client_for(&server, RequestAuthorizer::new());
        api.delete_category(7).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_category_puts_to_item_path() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/Categoria/3/")
            .match_body(Matcher::Json(json!({"nombre": "Audio", "descripcion": "Parlantes"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":3,"nombre":"Audio","descripcion":"Parlantes"}"#)
            .create_async()
            .await;

        let api = client_for(&server, RequestAuthorizer::new());
        let updated = api
            .update_category(
                3,
                &CategoryInput {
                    nombre: "Audio".to_string(),
                    descripcion: "Parlantes".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.nombre, "Audio");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_product_create_and_update_bodies() {
        let mut server = mockito::Server::new_async().await;
        let input = ProductInput {
            nombre: "Teclado".to_string(),
            precio: "45.90".to_string(),
            stock: 10,
            categoria: Some(2),
            proveedor: None,
        };
        let expected = json!({
            "nombre": "Teclado",
            "precio": "45.90",
            "stock": 10,
            "categoria": 2,
            "proveedor": null
        });
        let create = server
            .mock("POST", "/Producto/")
            .match_body(Matcher::Json(expected.clone()))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":8,"nombre":"Teclado","precio":"45.90","stock":10,"categoria":2,"proveedor":null}"#)
            .create_async()
            .await;
        let update = server
            .mock("PUT", "/Producto/8/")
            .match_body(Matcher::Json(expected))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":8,"nombre":"Teclado","precio":"45.90","stock":10,"categoria":2,"proveedor":null}"#)
            .create_async()
            .await;

        let api = client_for(&server, RequestAuthorizer::new());
        let created = api.create_product(&input).await.unwrap();
        assert_eq!(created.id, 8);
        let updated = api.update_product(created.id, &input).await.unwrap();
        assert_eq!(updated.stock, 10);

        create.assert_async().await;
        update.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_product_and_sale_paths() {
        let mut server = mockito::Server::new_async().await;
        let product = server
            .mock("DELETE", "/Producto/5/")
            .with_status(204)
            .create_async()
            .await;
        let sale = server
            .mock("DELETE", "/Venta/12/")
            .with_status(204)
            .create_async()
            .await;

        let api = client_for(&server, RequestAuthorizer::new());
        api.delete_product(5).await.unwrap();
        api.delete_sale(12).await.unwrap();

        product.assert_async().await;
        sale.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limit_gives_up_after_retries() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/Proveedor/")
            .with_status(429)
            .expect((MAX_RATE_LIMIT_RETRIES + 1) as usize)
            .create_async()
            .await;

        let api = client_for(&server, RequestAuthorizer::new());
        let err = api.list_suppliers().await.unwrap_err();

        assert!(matches!(err, ApiError::RateLimited));
        mock.assert_async().await;
    }
}
