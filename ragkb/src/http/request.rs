//! Request descriptors.
//!
//! Resource modules never talk to the network. They describe a request as an
//! [`ApiRequest`], wrap it in an [`Endpoint`] naming the payload type the
//! response must decode to, and hand it to the client.

use std::fmt::Display;
use std::marker::PhantomData;

pub use reqwest::Method;
use serde::Serialize;

/// A file to send as `multipart/form-data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadForm {
    /// Form field carrying the file.
    pub field: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// MIME type of the file; the transport default applies when unset.
    pub mime: Option<String>,
    /// Additional text fields sent alongside the file.
    pub fields: Vec<(String, String)>,
}

impl UploadForm {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            field: "file".to_string(),
            file_name: file_name.into(),
            bytes,
            mime: None,
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub(crate) fn to_form(&self) -> Result<reqwest::multipart::Form, reqwest::Error> {
        let mut part =
            reqwest::multipart::Part::bytes(self.bytes.clone()).file_name(self.file_name.clone());
        if let Some(ref mime) = self.mime {
            part = part.mime_str(mime)?;
        }

        let mut form = reqwest::multipart::Form::new();
        for (name, value) in &self.fields {
            form = form.text(name.clone(), value.clone());
        }
        Ok(form.part(self.field.clone(), part))
    }
}

/// Request body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Json(serde_json::Value),
    Multipart(UploadForm),
    /// A body that failed to serialize; the client rejects it before sending.
    Invalid(String),
}

/// Everything needed to issue one HTTP call, relative to the API base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path below the base URL, always starting with `/`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Body,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: Body::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    #[must_use]
    pub fn query(mut self, key: &str, value: impl Display) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Append a query parameter only when a value is present.
    #[must_use]
    pub fn query_opt<V: Display>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.query(key, v),
            None => self,
        }
    }

    #[must_use]
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    #[must_use]
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Self {
        self.body = match serde_json::to_value(body) {
            Ok(value) => Body::Json(value),
            Err(e) => Body::Invalid(e.to_string()),
        };
        self
    }

    #[must_use]
    pub fn multipart(mut self, form: UploadForm) -> Self {
        self.body = Body::Multipart(form);
        self
    }

    /// Value of the first query parameter named `key`.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The JSON body, if this request carries one.
    pub const fn json_body(&self) -> Option<&serde_json::Value> {
        match &self.body {
            Body::Json(value) => Some(value),
            _ => None,
        }
    }
}

/// A request paired with the type its response payload decodes to.
#[derive(Debug, Clone)]
pub struct Endpoint<T> {
    request: ApiRequest,
    _payload: PhantomData<fn() -> T>,
}

impl<T> Endpoint<T> {
    pub const fn new(request: ApiRequest) -> Self {
        Self {
            request,
            _payload: PhantomData,
        }
    }

    pub const fn request(&self) -> &ApiRequest {
        &self.request
    }

    pub fn into_request(self) -> ApiRequest {
        self.request
    }
}

impl<T> From<ApiRequest> for Endpoint<T> {
    fn from(request: ApiRequest) -> Self {
        Self::new(request)
    }
}

/// Percent-encode one path segment.
pub fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_query_values_are_skipped() {
        let request = ApiRequest::get("/users")
            .query_opt("page", Some(2))
            .query_opt::<u32>("page_size", None)
            .query_opt("keyword", Some("ali"));

        assert_eq!(
            request.query,
            vec![
                ("page".to_string(), "2".to_string()),
                ("keyword".to_string(), "ali".to_string()),
            ]
        );
        assert_eq!(request.query_value("keyword"), Some("ali"));
        assert_eq!(request.query_value("page_size"), None);
    }

    #[test]
    fn json_body_is_captured() {
        let request = ApiRequest::post("/auth/login")
            .json(&serde_json::json!({"username": "alice", "password": "pw"}));
        assert_eq!(request.method, Method::POST);
        assert_eq!(
            request.json_body().unwrap()["username"],
            serde_json::json!("alice")
        );
    }

    #[test]
    fn unserializable_body_is_marked_invalid() {
        let mut map = std::collections::HashMap::new();
        map.insert((1, 2), "tuple keys are not JSON");
        let request = ApiRequest::post("/x").json(&map);
        assert!(matches!(request.body, Body::Invalid(_)));
    }

    #[test]
    fn segments_are_escaped() {
        assert_eq!(segment("a b/c"), "a%20b%2Fc");
        assert_eq!(segment("0b7c-11"), "0b7c-11");
    }

    #[test]
    fn upload_form_defaults_to_file_field() {
        let form = UploadForm::new("notes.md", b"# notes".to_vec())
            .mime("text/markdown")
            .text("knowledge_base_id", "kb-1");
        assert_eq!(form.field, "file");
        assert_eq!(form.fields, vec![("knowledge_base_id".into(), "kb-1".into())]);
        assert!(form.to_form().is_ok());
    }
}
