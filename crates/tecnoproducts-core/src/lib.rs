//! Core library for the TecnoProducts storefront panel.
//!
//! The interesting part is the session layer in [`auth`]: how a bearer
//! credential is obtained, stored, attached to requests, renewed and dropped,
//! and how protected views are gated on it. [`api`] is the REST client every
//! view goes through, and [`models`] holds the catalog and sales types.

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError, RequestAuthorizer};
pub use app::App;
pub use auth::{
    sign_in, CredentialPair, CredentialStore, LogoutOutcome, Route, RouteDecision, RouteGuard,
    SessionController, SessionError,
};
pub use config::{Config, CredentialBackend};
