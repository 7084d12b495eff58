//! Route table.

/// One navigable screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    /// Pattern; `:name` segments match any single segment.
    pub path: &'static str,
    pub name: &'static str,
    pub title: Option<&'static str>,
    pub requires_auth: bool,
    pub requires_admin: bool,
    /// Where the route forwards to once the guard allows it.
    pub redirect: Option<&'static str>,
}

impl Route {
    const fn open(path: &'static str, name: &'static str) -> Self {
        Self {
            path,
            name,
            title: None,
            requires_auth: false,
            requires_admin: false,
            redirect: None,
        }
    }

    const fn private(path: &'static str, name: &'static str, title: &'static str) -> Self {
        Self {
            path,
            name,
            title: Some(title),
            requires_auth: true,
            requires_admin: false,
            redirect: None,
        }
    }

    /// Whether this route's pattern matches `path` (no query string).
    pub fn matches(&self, path: &str) -> bool {
        let mut pattern = self.path.split('/').filter(|s| !s.is_empty());
        let mut actual = path.split('/').filter(|s| !s.is_empty());
        loop {
            match (pattern.next(), actual.next()) {
                (None, None) => return true,
                (Some(p), Some(_)) if p.starts_with(':') => {}
                (Some(p), Some(a)) if p == a => {}
                _ => return false,
            }
        }
    }
}

/// Every known route. Unmatched paths fall through to [`NOT_FOUND`].
pub const ROUTES: &[Route] = &[
    Route::open("/login", "Login"),
    Route::open("/register", "Register"),
    Route {
        redirect: Some("/knowledge"),
        title: None,
        ..Route::private("/", "Home", "")
    },
    Route::private("/knowledge", "Knowledge", "Knowledge Bases"),
    Route::private("/knowledge/:id/documents", "Documents", "Documents"),
    Route::private("/chat", "Chat", "Chat"),
    Route {
        requires_admin: true,
        ..Route::private("/users", "Users", "User Management")
    },
    Route::private("/profile", "Profile", "Profile"),
];

/// Catch-all. Inherits the default of requiring authentication.
pub const NOT_FOUND: Route = Route {
    title: None,
    ..Route::private("/:path*", "NotFound", "")
};

/// Find the route for `full_path`, ignoring any query string.
pub fn match_route(full_path: &str) -> &'static Route {
    let path = full_path.split(['?', '#']).next().unwrap_or(full_path);
    ROUTES
        .iter()
        .find(|route| route.matches(path))
        .unwrap_or(&NOT_FOUND)
}
