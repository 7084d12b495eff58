//! Authentication endpoints.

use serde::Serialize;

use crate::http::{ApiRequest, Endpoint, Ignored};
use crate::models::{LoginResponse, User};

/// Credentials submitted on the login screen.
#[derive(Debug, Clone, Serialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
struct RefreshTokenRequest<'a> {
    refresh_token: &'a str,
}

/// `POST /auth/login`
pub fn login(form: &LoginForm) -> Endpoint<LoginResponse> {
    ApiRequest::post("/auth/login").json(form).into()
}

/// `POST /auth/logout`
pub fn logout() -> Endpoint<Ignored> {
    ApiRequest::post("/auth/logout").into()
}

/// `POST /auth/refresh`
pub fn refresh_token(refresh_token: &str) -> Endpoint<LoginResponse> {
    ApiRequest::post("/auth/refresh")
        .json(&RefreshTokenRequest { refresh_token })
        .into()
}

/// `GET /auth/me`
pub fn current_user() -> Endpoint<User> {
    ApiRequest::get("/auth/me").into()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::http::Method;

    #[test]
    fn login_posts_credentials() {
        let endpoint = login(&LoginForm {
            username: "alice".into(),
            password: "s3cret".into(),
        });
        let request = endpoint.request();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.path, "/auth/login");
        assert_eq!(
            request.json_body(),
            Some(&json!({"username": "alice", "password": "s3cret"}))
        );
    }

    #[test]
    fn refresh_sends_refresh_token() {
        let endpoint = refresh_token("r-1");
        assert_eq!(endpoint.request().path, "/auth/refresh");
        assert_eq!(
            endpoint.request().json_body(),
            Some(&json!({"refresh_token": "r-1"}))
        );
    }

    #[test]
    fn me_and_logout() {
        assert_eq!(current_user().request().method, Method::GET);
        assert_eq!(current_user().request().path, "/auth/me");
        assert_eq!(logout().request().method, Method::POST);
        assert_eq!(logout().request().path, "/auth/logout");
    }
}
