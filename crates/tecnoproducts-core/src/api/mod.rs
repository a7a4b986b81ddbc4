//! REST API client module for the TecnoProducts backend.
//!
//! This module provides:
//! - `RequestAuthorizer`: the single place a bearer token is attached to requests
//! - `ApiClient`: token exchanges plus CRUD calls for categories, products,
//!   sales and suppliers
//! - `ApiError`: status-code and payload mapping for failed calls
//!
//! The API uses JWT bearer authentication obtained from `POST /token/`.

pub mod authorizer;
pub mod client;
pub mod error;

pub use authorizer::RequestAuthorizer;
pub use client::{ApiClient, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
pub use error::ApiError;
