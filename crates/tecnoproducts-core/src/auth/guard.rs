//! Navigation gate for protected views.
//!
//! The decision is recomputed from the session flag on every call; nothing is
//! cached, so a logout blocks the very next protected navigation.

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use super::SessionController;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum Route {
    Login,
    Signup,
    Welcome,
    Categories,
    Products,
    Sales,
}

impl Route {
    pub const ALL: [Route; 6] = [
        Route::Login,
        Route::Signup,
        Route::Welcome,
        Route::Categories,
        Route::Products,
        Route::Sales,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Signup => "/Signup",
            Route::Welcome => "/Welcome",
            Route::Categories => "/Categoria",
            Route::Products => "/Producto",
            Route::Sales => "/Venta",
        }
    }

    /// Match a path ignoring case and leading/trailing slashes
    pub fn from_path(path: &str) -> Option<Route> {
        let wanted = path.trim().trim_matches('/');
        Self::ALL
            .into_iter()
            .find(|r| r.path().trim_start_matches('/').eq_ignore_ascii_case(wanted))
    }

    /// Routes that require an active session
    pub fn is_protected(&self) -> bool {
        !matches!(self, Route::Login | Route::Signup)
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum RouteDecision {
    Admit(Route),
    Redirect(Route),
}

impl RouteDecision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, RouteDecision::Admit(_))
    }

    /// Where the user actually ends up
    pub fn destination(&self) -> Route {
        match self {
            RouteDecision::Admit(route) | RouteDecision::Redirect(route) => *route,
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Unknown route: {0}")]
pub struct UnknownRoute(pub String);

#[derive(Clone, Debug)]
pub struct RouteGuard {
    session: SessionController,
}

impl RouteGuard {
    pub fn new(session: SessionController) -> Self {
        Self { session }
    }

    /// Decide whether `route` may render right now.
    pub fn check(&self, route: Route) -> RouteDecision {
        let authenticated = self.session.is_authenticated();
        let decision = match route {
            r if r.is_protected() && !authenticated => RouteDecision::Redirect(Route::Login),
            Route::Login if authenticated => RouteDecision::Redirect(Route::Welcome),
            r => RouteDecision::Admit(r),
        };

        if let RouteDecision::Redirect(to) = decision {
            debug!(from = %route, to = %to, "Navigation redirected");
        }
        decision
    }

    /// Resolve a path and check it
    pub fn navigate(&self, path: &str) -> Result<RouteDecision, UnknownRoute> {
        let route = Route::from_path(path).ok_or_else(|| UnknownRoute(path.to_string()))?;
        Ok(self.check(route))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::api::RequestAuthorizer;
    use crate::auth::{CredentialPair, MemoryCredentialStore};

    fn guard() -> (RouteGuard, SessionController) {
        let session = SessionController::new(Arc::new(MemoryCredentialStore::new()), RequestAuthorizer::new());
        (RouteGuard::new(session.clone()), session)
    }

    #[test]
    fn test_route_from_path_is_lenient() {
        assert_eq!(Route::from_path("/Producto"), Some(Route::Products));
        assert_eq!(Route::from_path("Producto"), Some(Route::Products));
        assert_eq!(Route::from_path("/categoria"), Some(Route::Categories));
        assert_eq!(Route::from_path("/Venta/"), Some(Route::Sales));
        assert_eq!(Route::from_path("/LOGIN"), Some(Route::Login));
        assert_eq!(Route::from_path("/admin"), None);
    }

    #[test]
    fn test_protected_routes_redirect_when_logged_out() {
        let (guard, _session) = guard();
        for route in Route::ALL.into_iter().filter(Route::is_protected) {
            assert_eq!(guard.check(route), RouteDecision::Redirect(Route::Login));
        }
        assert_eq!(guard.check(Route::Login), RouteDecision::Admit(Route::Login));
        assert_eq!(guard.check(Route::Signup), RouteDecision::Admit(Route::Signup));
    }

    #[test]
    fn test_admits_when_logged_in() {
        let (guard, session) = guard();
        session.login(&CredentialPair::new("A1", "R1")).unwrap();

        assert_eq!(guard.check(Route::Products), RouteDecision::Admit(Route::Products));
        assert_eq!(guard.check(Route::Login), RouteDecision::Redirect(Route::Welcome));
        assert_eq!(guard.check(Route::Signup), RouteDecision::Admit(Route::Signup));
    }

    #[test]
    fn test_logout_blocks_next_navigation() {
        let (guard, session) = guard();
        session.login(&CredentialPair::new("A1", "R1")).unwrap();
        assert!(guard.check(Route::Sales).is_admitted());

        // Logout through another handle to the same session
        session.clone().logout().unwrap();
        assert_eq!(guard.check(Route::Sales), RouteDecision::Redirect(Route::Login));
    }

    #[test]
    fn test_navigate_unknown_path() {
        let (guard, _session) = guard();
        assert_eq!(guard.navigate("/nope"), Err(UnknownRoute("/nope".to_string())));
        assert_eq!(
            guard.navigate("Categoria").unwrap().destination(),
            Route::Login
        );
    }
}
