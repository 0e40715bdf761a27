//! Request description passed to [`ApiClient::send`](super::ApiClient::send)

use crate::cache::cache_key;
use bytes::Bytes;
use reqwest::Method;
use serde_json::Value;

/// How a request deals with credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// Attach a token when one is available, otherwise go anonymous
    #[default]
    Optional,
    /// Fail fast without credentials
    Required,
    /// Never attach a token and never refresh on 401
    Skip,
}

/// One field of a multipart form
#[derive(Debug, Clone, PartialEq)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        filename: String,
        content_type: Option<String>,
        bytes: Bytes,
    },
}

impl FormPart {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        FormPart::Text {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn file(
        name: impl Into<String>,
        filename: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        FormPart::File {
            name: name.into(),
            filename: filename.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    /// Set the MIME type of a file part; no-op on text parts
    pub fn with_content_type(mut self, mime: impl Into<String>) -> Self {
        if let FormPart::File { content_type, .. } = &mut self {
            *content_type = Some(mime.into());
        }
        self
    }

    pub fn name(&self) -> &str {
        match self {
            FormPart::Text { name, .. } | FormPart::File { name, .. } => name,
        }
    }
}

/// Request payload
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Body {
    #[default]
    Empty,
    Json(Value),
    Multipart(Vec<FormPart>),
}

/// A backend call, relative to the configured base URL
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Body,
    pub auth: AuthMode,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let path = path.into();
        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{}", path)
        };

        Self {
            method,
            path,
            query: Vec::new(),
            body: Body::Empty,
            auth: AuthMode::Optional,
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

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Add a query parameter only when a value is present
    pub fn query_opt<V: ToString>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Body::Json(body);
        self
    }

    pub fn multipart(mut self, parts: Vec<FormPart>) -> Self {
        self.body = Body::Multipart(parts);
        self
    }

    pub fn auth(mut self, mode: AuthMode) -> Self {
        self.auth = mode;
        self
    }

    pub fn is_get(&self) -> bool {
        self.method == Method::GET
    }

    pub fn cache_key(&self) -> String {
        cache_key(&self.path, &self.query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder() {
        let request = ApiRequest::get("books/")
            .query("page", 2)
            .query_opt("category", Some("poetry"))
            .query_opt::<&str>("search", None)
            .auth(AuthMode::Required);

        assert_eq!(request.path, "/books/");
        assert!(request.is_get());
        assert_eq!(request.auth, AuthMode::Required);
        assert_eq!(request.cache_key(), "/books/?category=poetry&page=2");
    }

    #[test]
    fn test_bodies() {
        let request = ApiRequest::post("/contact/").json(json!({"message": "hi"}));
        assert_eq!(request.body, Body::Json(json!({"message": "hi"})));
        assert!(!request.is_get());

        let avatar = FormPart::file("avatar", "me.png", vec![1u8, 2, 3]).with_content_type("image/png");
        let request = ApiRequest::patch("/auth/profile/")
            .multipart(vec![FormPart::text("first_name", "Ada"), avatar]);
        match &request.body {
            Body::Multipart(parts) => {
                assert_eq!(parts.len(), 2);
                assert_eq!(parts[1].name(), "avatar");
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_content_type_ignored_on_text() {
        let part = FormPart::text("bio", "hello").with_content_type("text/plain");
        assert_eq!(part, FormPart::text("bio", "hello"));
    }
}
