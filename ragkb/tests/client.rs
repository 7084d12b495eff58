//! HTTP client behaviour against a live mock backend.

mod common;

use axum::extract::{Multipart, Path};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use common::{fail, ok, Harness};
use ragkb::api::document;
use ragkb::api::{auth, knowledge};
use ragkb::error::{FORBIDDEN, NETWORK_FAILURE, NOT_FOUND, SERVER_FAULT, SESSION_EXPIRED};
use ragkb::http::UploadForm;
use ragkb::router::LOGIN_PATH;
use ragkb::storage::{ACCESS_TOKEN, REFRESH_TOKEN, USER_INFO};
use ragkb::ApiError;
use serde_json::{json, Value};

async fn echo_auth(headers: HeaderMap) -> Json<Value> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    ok(json!({"id": 1, "username": "alice", "real_name": auth}))
}

#[tokio::test]
async fn bearer_token_is_sent_when_stored() {
    let harness = Harness::start(Router::new().route("/auth/me", get(echo_auth)))
        .await
        .with_session("tok-123", "alice");

    let user = harness
        .client
        .call(auth::current_user())
        .await
        .unwrap()
        .require_data()
        .unwrap();
    assert_eq!(user.real_name, "Bearer tok-123");
}

#[tokio::test]
async fn no_header_without_token() {
    let harness = Harness::start(Router::new().route("/auth/me", get(echo_auth))).await;
    let user = harness
        .client
        .call(auth::current_user())
        .await
        .unwrap()
        .require_data()
        .unwrap();
    assert_eq!(user.real_name, "");
}

#[tokio::test]
async fn unauthorized_clears_credentials_and_returns_to_login() {
    let routes = Router::new().route(
        "/knowledge-bases",
        get(|| async { fail(StatusCode::UNAUTHORIZED, "token expired") }),
    );
    let harness = Harness::start(routes).await.with_session("stale", "alice");

    let err = harness
        .client
        .call(knowledge::list_knowledge_bases(&Default::default()))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized { .. }));
    assert_eq!(err.server_message(), Some("token expired"));
    assert_eq!(harness.stored(ACCESS_TOKEN), None);
    assert_eq!(harness.stored(REFRESH_TOKEN), None);
    assert_eq!(harness.stored(USER_INFO), None);
    assert_eq!(harness.history.last().as_deref(), Some(LOGIN_PATH));
    assert_eq!(harness.notice_messages(), [SESSION_EXPIRED]);
}

#[tokio::test]
async fn status_errors_produce_fixed_notices() {
    let routes = Router::new()
        .route(
            "/knowledge-bases/{id}",
            get(|Path(id): Path<String>| async move {
                match id.as_str() {
                    "forbidden" => fail(StatusCode::FORBIDDEN, "no"),
                    "missing" => fail(StatusCode::NOT_FOUND, "no such kb"),
                    "broken" => fail(StatusCode::INTERNAL_SERVER_ERROR, "db down"),
                    _ => fail(StatusCode::BAD_REQUEST, "english_name already exists"),
                }
            }),
        );
    let harness = Harness::start(routes).await.with_session("tok", "alice");

    for id in ["forbidden", "missing", "broken", "conflict"] {
        let _ = harness.client.call(knowledge::get_knowledge_base(id)).await;
    }

    assert_eq!(
        harness.notice_messages(),
        [
            FORBIDDEN,
            NOT_FOUND,
            SERVER_FAULT,
            "english_name already exists"
        ]
    );
    // Only 401 drops the session.
    assert_eq!(harness.stored(ACCESS_TOKEN).as_deref(), Some("tok"));
    assert!(harness.history.entries().is_empty());
}

#[tokio::test]
async fn network_failure_is_reported() {
    let harness = Harness::new("http://127.0.0.1:9/api/v1");
    let err = harness.client.call(auth::current_user()).await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));
    assert_eq!(harness.notice_messages(), [NETWORK_FAILURE]);
}

#[tokio::test]
async fn nonzero_envelope_code_is_an_error() {
    let routes = Router::new().route(
        "/auth/me",
        get(|| async { Json(json!({"code": 1001, "message": "account disabled", "data": null})) }),
    );
    let harness = Harness::start(routes).await;

    let err = harness.client.call(auth::current_user()).await.unwrap_err();
    assert_eq!(err.server_message(), Some("account disabled"));
    assert_eq!(harness.notice_messages(), ["account disabled"]);
}

#[tokio::test]
async fn wrong_shape_is_a_silent_decode_error() {
    let routes = Router::new().route(
        "/auth/me",
        get(|| async { ok(json!({"id": "not-a-number"})) }),
    );
    let harness = Harness::start(routes).await;

    let err = harness.client.call(auth::current_user()).await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
    assert!(harness.notice_messages().is_empty());
}

#[tokio::test]
async fn empty_success_body_is_accepted() {
    let routes = Router::new().route(
        "/knowledge-bases/{id}",
        delete(|| async { StatusCode::NO_CONTENT }),
    );
    let harness = Harness::start(routes).await;

    let response = harness
        .client
        .call(knowledge::delete_knowledge_base("kb-1"))
        .await
        .unwrap();
    assert!(response.data.is_none());
}

async fn receive_upload(Path(kb): Path<String>, mut multipart: Multipart) -> Json<Value> {
    let mut file_name = String::new();
    let mut size = 0;
    let mut kb_field = String::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        match field.name() {
            Some("file") => {
                file_name = field.file_name().unwrap_or_default().to_string();
                size = field.bytes().await.unwrap().len();
            }
            Some("knowledge_base_id") => kb_field = field.text().await.unwrap(),
            _ => {}
        }
    }
    assert_eq!(kb, kb_field);
    ok(json!({
        "id": "doc-1",
        "knowledge_base_id": kb,
        "name": file_name,
        "file_size": size,
        "status": "pending"
    }))
}

#[tokio::test]
async fn upload_sends_multipart_form() {
    let routes = Router::new().route(
        "/knowledge-bases/{kb}/documents/upload",
        post(receive_upload),
    );
    let harness = Harness::start(routes).await.with_session("tok", "alice");

    let doc = harness
        .client
        .call(document::upload_document(
            "kb-7",
            UploadForm::new("notes.md", b"# Notes\n".to_vec()).mime("text/markdown"),
        ))
        .await
        .unwrap()
        .require_data()
        .unwrap();

    assert_eq!(doc.name, "notes.md");
    assert_eq!(doc.knowledge_base_id, "kb-7");
    assert_eq!(doc.file_size, 8);
    assert_eq!(doc.status, "pending");
}
