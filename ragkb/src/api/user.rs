//! User administration endpoints.

use serde::Serialize;

use super::PageQuery;
use crate::http::{ApiRequest, Endpoint, Ignored};
use crate::models::{Page, User};

/// Filters for listing users.
#[derive(Debug, Clone, Default)]
pub struct UserQuery {
    pub page: PageQuery,
    /// Substring matched against username, email and real name.
    pub keyword: Option<String>,
}

/// Body of `POST /users`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub email: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub real_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub phone: String,
    pub is_admin: bool,
}

/// Body of `PUT /users/{id}`. Unset fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub real_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Body of `PUT /users/me/password`.
#[derive(Debug, Clone, Serialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

fn user_path(id: i64) -> String {
    format!("/users/{id}")
}

/// `GET /users`
pub fn list_users(query: &UserQuery) -> Endpoint<Page<User>> {
    query
        .page
        .apply(ApiRequest::get("/users"))
        .query_opt("keyword", query.keyword.as_deref())
        .into()
}

/// `GET /users/{id}`
pub fn get_user(id: i64) -> Endpoint<User> {
    ApiRequest::get(user_path(id)).into()
}

/// `POST /users`
pub fn create_user(body: &CreateUserRequest) -> Endpoint<User> {
    ApiRequest::post("/users").json(body).into()
}

/// `PUT /users/{id}`
pub fn update_user(id: i64, body: &UpdateUserRequest) -> Endpoint<User> {
    ApiRequest::put(user_path(id)).json(body).into()
}

/// `DELETE /users/{id}`
pub fn delete_user(id: i64) -> Endpoint<Ignored> {
    ApiRequest::delete(user_path(id)).into()
}

/// `PUT /users/me/password`
pub fn update_password(body: &ChangePasswordRequest) -> Endpoint<Ignored> {
    ApiRequest::put("/users/me/password").json(body).into()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::http::Method;

    #[test]
    fn list_users_with_keyword() {
        let query = UserQuery {
            page: PageQuery::new(3, 20),
            keyword: Some("ali".into()),
        };
        let endpoint = list_users(&query);
        assert_eq!(endpoint.request().path, "/users");
        assert_eq!(endpoint.request().query_value("page"), Some("3"));
        assert_eq!(endpoint.request().query_value("keyword"), Some("ali"));
    }

    #[test]
    fn crud_mapping() {
        assert_eq!(get_user(7).request().path, "/users/7");
        assert_eq!(delete_user(7).request().method, Method::DELETE);

        let update = update_user(
            7,
            &UpdateUserRequest {
                status: Some("disabled".into()),
                ..UpdateUserRequest::default()
            },
        );
        assert_eq!(update.request().method, Method::PUT);
        assert_eq!(update.request().json_body(), Some(&json!({"status": "disabled"})));

        let create = create_user(&CreateUserRequest {
            username: "dave".into(),
            password: "hunter22".into(),
            email: "dave@example.com".into(),
            real_name: String::new(),
            phone: String::new(),
            is_admin: false,
        });
        assert_eq!(create.request().method, Method::POST);
        assert_eq!(
            create.request().json_body(),
            Some(&json!({
                "username": "dave",
                "password": "hunter22",
                "email": "dave@example.com",
                "is_admin": false
            }))
        );
    }

    #[test]
    fn password_change_targets_me() {
        let endpoint = update_password(&ChangePasswordRequest {
            old_password: "old".into(),
            new_password: "new-password".into(),
        });
        assert_eq!(endpoint.request().method, Method::PUT);
        assert_eq!(endpoint.request().path, "/users/me/password");
    }
}
