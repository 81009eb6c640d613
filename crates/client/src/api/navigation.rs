//! Route awareness for 401 handling.

use std::sync::{Mutex, PoisonError, RwLock};

/// Entry point users are sent to when their session is rejected.
pub const LOGIN_ROUTE: &str = "/login";

pub const REGISTER_ROUTE: &str = "/register";

/// The front end's router, as seen by the gateway.
pub trait Navigator: Send + Sync {
    /// The route currently displayed.
    fn current_route(&self) -> String;

    /// Move to `route`.
    fn navigate(&self, route: &str);
}

/// Whether a 401 on `route` should redirect to the login page.
#[must_use]
pub fn should_redirect_to_login(route: &str) -> bool {
    route != LOGIN_ROUTE && route != REGISTER_ROUTE
}

/// A [`Navigator`] that only remembers where it is and where it was sent.
#[derive(Debug)]
pub struct RouteTracker {
    current: RwLock<String>,
    redirects: Mutex<Vec<String>>,
}

impl Default for RouteTracker {
    fn default() -> Self {
        Self::new("/")
    }
}

impl RouteTracker {
    #[must_use]
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            current: RwLock::new(initial.into()),
            redirects: Mutex::new(Vec::new()),
        }
    }

    /// Record that the front end is now showing `route`.
    pub fn set_route(&self, route: impl Into<String>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = route.into();
    }

    /// Every navigation requested through [`Navigator::navigate`], oldest first.
    #[must_use]
    pub fn redirects(&self) -> Vec<String> {
        self.redirects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for RouteTracker {
    fn current_route(&self) -> String {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn navigate(&self, route: &str) {
        self.set_route(route);
        self.redirects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(route.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_pages_do_not_redirect() {
        assert!(!should_redirect_to_login("/login"));
        assert!(!should_redirect_to_login("/register"));
        assert!(should_redirect_to_login("/marketplace"));
        assert!(should_redirect_to_login("/"));
    }

    #[test]
    fn test_tracker_records_navigation() {
        let tracker = RouteTracker::new("/orders");
        tracker.navigate(LOGIN_ROUTE);
        assert_eq!(tracker.current_route(), "/login");
        assert_eq!(tracker.redirects(), ["/login"]);
    }
}
