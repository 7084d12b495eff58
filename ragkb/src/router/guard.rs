//! Navigation guard.
//!
//! Runs before every navigation and decides, from the user's authentication
//! and role flags alone, whether the target may be entered.

use super::routes::{match_route, Route};
use super::{HOME_PATH, LOGIN_PATH, REGISTER_PATH};

const APP_TITLE: &str = "RAG Knowledge Base";

/// Redirect chains longer than this are cut off; the table has none deeper than two.
const MAX_REDIRECTS: usize = 8;

/// What the guard needs to know about the current user.
pub trait AuthState {
    fn is_logged_in(&self) -> bool;
    fn is_admin(&self) -> bool;
}

/// Copy of the user store's flags taken at navigation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthSnapshot {
    pub logged_in: bool,
    pub admin: bool,
}

impl AuthState for AuthSnapshot {
    fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    fn is_admin(&self) -> bool {
        self.admin
    }
}

/// Outcome of the guard for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(String),
}

/// The guard's view of one navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub route: &'static Route,
    /// Window title computed from the route before deciding.
    pub title: String,
    pub decision: GuardDecision,
}

/// Run the guard for `full_path` (path plus optional query string).
pub fn resolve(full_path: &str, auth: &impl AuthState) -> Resolution {
    let route = match_route(full_path);
    let title = route
        .title
        .map_or_else(|| APP_TITLE.to_string(), |t| format!("{t} - {APP_TITLE}"));
    let path = full_path.split(['?', '#']).next().unwrap_or(full_path);

    let decision = if !route.requires_auth {
        if auth.is_logged_in() && (path == LOGIN_PATH || path == REGISTER_PATH) {
            GuardDecision::Redirect(HOME_PATH.to_string())
        } else {
            GuardDecision::Allow
        }
    } else if !auth.is_logged_in() {
        GuardDecision::Redirect(format!(
            "{LOGIN_PATH}?redirect={}",
            urlencoding::encode(full_path)
        ))
    } else if route.requires_admin && !auth.is_admin() {
        GuardDecision::Redirect(HOME_PATH.to_string())
    } else {
        GuardDecision::Allow
    };

    Resolution {
        route,
        title,
        decision,
    }
}

/// Where a navigation ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub requested: String,
    /// Final location after guard and static redirects.
    pub location: String,
    pub route: &'static Route,
    /// True when the guard turned the navigation away from what was requested.
    pub guard_redirected: bool,
}

/// Tracks the current location and title across navigations.
#[derive(Debug, Clone)]
pub struct Router {
    location: Option<String>,
    title: String,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            location: None,
            title: APP_TITLE.to_string(),
        }
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Navigate to `full_path`, re-running the guard on every redirect.
    pub fn navigate(&mut self, full_path: &str, auth: &impl AuthState) -> Navigation {
        let mut target = full_path.to_string();
        let mut guard_redirected = false;

        for _ in 0..MAX_REDIRECTS {
            let resolution = resolve(&target, auth);
            self.title = resolution.title;

            match resolution.decision {
                GuardDecision::Redirect(next) => {
                    tracing::debug!(from = %target, to = %next, "guard redirect");
                    guard_redirected = true;
                    target = next;
                }
                GuardDecision::Allow => match resolution.route.redirect {
                    Some(next) => target = next.to_string(),
                    None => {
                        self.location = Some(target.clone());
                        return Navigation {
                            requested: full_path.to_string(),
                            location: target,
                            route: resolution.route,
                            guard_redirected,
                        };
                    }
                },
            }
        }

        tracing::warn!(path = full_path, "redirect limit reached");
        self.location = Some(target.clone());
        Navigation {
            requested: full_path.to_string(),
            route: match_route(&target),
            location: target,
            guard_redirected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUEST: AuthSnapshot = AuthSnapshot {
        logged_in: false,
        admin: false,
    };
    const MEMBER: AuthSnapshot = AuthSnapshot {
        logged_in: true,
        admin: false,
    };
    const ADMIN: AuthSnapshot = AuthSnapshot {
        logged_in: true,
        admin: true,
    };

    #[test]
    fn guest_is_sent_to_login_with_return_path() {
        let resolution = resolve("/knowledge/kb 1/documents?page=2", &GUEST);
        assert_eq!(
            resolution.decision,
            GuardDecision::Redirect(
                "/login?redirect=%2Fknowledge%2Fkb%201%2Fdocuments%3Fpage%3D2".into()
            )
        );
    }

    #[test]
    fn guest_may_open_login_and_register() {
        assert_eq!(resolve("/login", &GUEST).decision, GuardDecision::Allow);
        assert_eq!(resolve("/register", &GUEST).decision, GuardDecision::Allow);
        assert_eq!(
            resolve("/login?redirect=%2Fchat", &GUEST).decision,
            GuardDecision::Allow
        );
    }

    #[test]
    fn signed_in_user_skips_login_screen() {
        assert_eq!(
            resolve("/login", &MEMBER).decision,
            GuardDecision::Redirect("/".into())
        );
        assert_eq!(
            resolve("/register", &ADMIN).decision,
            GuardDecision::Redirect("/".into())
        );
    }

    #[test]
    fn admin_routes_turn_members_away() {
        assert_eq!(
            resolve("/users", &MEMBER).decision,
            GuardDecision::Redirect("/".into())
        );
        assert_eq!(resolve("/users", &ADMIN).decision, GuardDecision::Allow);
        assert_eq!(resolve("/profile", &MEMBER).decision, GuardDecision::Allow);
    }

    #[test]
    fn unknown_route_requires_auth() {
        assert!(matches!(
            resolve("/does-not-exist", &GUEST).decision,
            GuardDecision::Redirect(ref to) if to.starts_with("/login?redirect=")
        ));
        assert_eq!(resolve("/does-not-exist", &MEMBER).decision, GuardDecision::Allow);
    }

    #[test]
    fn title_is_set_from_route() {
        assert_eq!(resolve("/chat", &MEMBER).title, "Chat - RAG Knowledge Base");
        assert_eq!(resolve("/login", &GUEST).title, "RAG Knowledge Base");
    }

    #[test]
    fn router_follows_redirects_to_a_final_location() {
        let mut router = Router::new();

        let nav = router.navigate("/users", &MEMBER);
        assert!(nav.guard_redirected);
        assert_eq!(nav.location, "/knowledge");
        assert_eq!(router.title(), "Knowledge Bases - RAG Knowledge Base");

        let nav = router.navigate("/chat", &GUEST);
        assert_eq!(nav.location, "/login?redirect=%2Fchat");
        assert_eq!(nav.route.name, "Login");
        assert_eq!(router.location(), Some("/login?redirect=%2Fchat"));

        let nav = router.navigate("/chat", &MEMBER);
        assert!(!nav.guard_redirected);
        assert_eq!(nav.location, "/chat");
    }
}
