//! Route surface and guard policies.
//!
//! Guards are pure functions of [`AuthState`]; they own no state. Gating here
//! is cosmetic. The backend enforces who may read or write what.

use std::{fmt, str::FromStr};

use tracing::{debug, warn};

use crate::{auth::AuthState, constants::MAX_REDIRECTS};

/// Every view the client exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Landing,
    SignUp,
    SignIn,
    Dashboard,
    Profile,
    AdminDashboard,
}

/// Who may see a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Always renders.
    Public,
    /// Only for visitors who are not signed in; signed-in users go to the dashboard.
    GuestOnly,
    /// Requires a signed-in user.
    Protected,
    /// Requires a signed-in user whose profile role is `admin`.
    AdminOnly,
}

impl Route {
    pub const ALL: [Route; 6] = [
        Route::Landing,
        Route::SignUp,
        Route::SignIn,
        Route::Dashboard,
        Route::Profile,
        Route::AdminDashboard,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Route::Landing => "/",
            Route::SignUp => "/signup",
            Route::SignIn => "/signin",
            Route::Dashboard => "/dashboard",
            Route::Profile => "/profile",
            Route::AdminDashboard => "/admin-dashboard",
        }
    }

    /// Match a path, ignoring any query string, fragment, or trailing slash.
    pub fn from_path(path: &str) -> Option<Route> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };
        Route::ALL.into_iter().find(|route| route.path() == path)
    }

    pub fn access(&self) -> Access {
        match self {
            Route::Landing => Access::Public,
            Route::SignUp | Route::SignIn => Access::GuestOnly,
            Route::Dashboard | Route::Profile => Access::Protected,
            Route::AdminDashboard => Access::AdminOnly,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for Route {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Route::from_path(s).ok_or_else(|| format!("unknown route: {s}"))
    }
}

/// What a guard decided for a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Show the route.
    Render,
    /// Auth state is not resolved yet; show a neutral placeholder.
    Loading,
    /// Go elsewhere. `replace` swaps the current history entry instead of pushing.
    Redirect { to: Route, replace: bool },
}

/// Decide what to do with `route` given the current auth state.
pub fn guard(route: Route, auth: &AuthState) -> Guard {
    let access = route.access();
    if access == Access::Public {
        return Guard::Render;
    }
    if auth.loading {
        return Guard::Loading;
    }
    match access {
        Access::Public => Guard::Render,
        Access::GuestOnly if auth.is_authenticated() => Guard::Redirect {
            to: Route::Dashboard,
            replace: false,
        },
        Access::GuestOnly => Guard::Render,
        _ if !auth.is_authenticated() => Guard::Redirect {
            to: Route::SignIn,
            replace: true,
        },
        Access::AdminOnly if !auth.is_admin() => Guard::Redirect {
            to: Route::Dashboard,
            replace: true,
        },
        Access::Protected | Access::AdminOnly => Guard::Render,
    }
}

/// Navigation stack for a single-window client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    entries: Vec<Route>,
}

impl History {
    pub fn new(start: Route) -> Self {
        Self {
            entries: vec![start],
        }
    }

    pub fn current(&self) -> Route {
        self.entries.last().copied().unwrap_or(Route::Landing)
    }

    pub fn entries(&self) -> &[Route] {
        &self.entries
    }

    pub fn push(&mut self, route: Route) {
        self.entries.push(route);
    }

    pub fn replace(&mut self, route: Route) {
        match self.entries.last_mut() {
            Some(current) => *current = route,
            None => self.entries.push(route),
        }
    }

    /// Pop the current entry. The first entry is never popped.
    pub fn back(&mut self) -> Option<Route> {
        if self.entries.len() > 1 {
            self.entries.pop();
            Some(self.current())
        } else {
            None
        }
    }

    /// Push `to` and follow guard redirects from there.
    pub fn navigate(&mut self, to: Route, auth: &AuthState) -> Guard {
        if self.current() != to {
            self.push(to);
        }
        self.resolve(auth)
    }

    /// Re-run the guard on the current entry, following redirects.
    ///
    /// Call this whenever the auth state changes.
    pub fn resolve(&mut self, auth: &AuthState) -> Guard {
        for _ in 0..MAX_REDIRECTS {
            match guard(self.current(), auth) {
                Guard::Redirect { to, replace } => {
                    debug!(from = %self.current(), %to, replace, "route redirected");
                    if replace {
                        self.replace(to);
                    } else {
                        self.push(to);
                    }
                }
                decision => return decision,
            }
        }
        warn!(route = %self.current(), "redirect limit reached");
        guard(self.current(), auth)
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(Route::Landing)
    }
}
