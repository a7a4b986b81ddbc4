//! Authentication module for managing the user session.
//!
//! This module provides:
//! - `CredentialStore`: durable storage for the access/refresh token pair
//!   (file, OS keychain, or memory)
//! - `SessionController`: the authenticated flag and its login/logout/renew
//!   transitions
//! - `sign_in`: password login on top of the controller
//! - `RouteGuard`: admit-or-redirect decisions for protected views

pub mod credentials;
pub mod error;
pub mod guard;
pub mod login;
pub mod session;

pub use credentials::{
    CredentialPair, CredentialStore, FileCredentialStore, KeyringCredentialStore,
    MemoryCredentialStore, StoreError,
};
pub use error::SessionError;
pub use guard::{Route, RouteDecision, RouteGuard, UnknownRoute};
pub use login::sign_in;
pub use session::{LogoutOutcome, SessionController};
