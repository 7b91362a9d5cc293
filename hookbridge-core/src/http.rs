// HTTP request and response types

use crate::{BridgeError, ErrorResponse};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Content-Type written on JSON responses
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// HTTP request as seen by the confirmation handler
#[derive(Debug, Clone, Default)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    /// Header names are stored lowercased
    pub headers: HashMap<String, String>,
    pub query_params: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    /// Build a request from a method and a path that may carry a query string.
    pub fn from_uri(method: impl Into<String>, uri: &str) -> Self {
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (uri, None),
        };

        let mut request = Self::new(method, path);
        if let Some(query) = query {
            request.query_params = url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect();
        }
        request
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn query(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }

    /// Parse the request body as JSON
    pub fn json<T: for<'de> Deserialize<'de>>(&self) -> Result<T, BridgeError> {
        serde_json::from_slice(&self.body).map_err(BridgeError::from)
    }
}

/// HTTP response produced by the handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    pub fn ok() -> Self {
        Self::new(200)
    }

    /// 404 with the standard JSON error body
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::json_error(404, message)
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_json<T: Serialize>(mut self, value: &T) -> Result<Self, BridgeError> {
        self.body = serde_json::to_vec(value).map_err(|e| BridgeError::Http(e.to_string()))?;
        self.headers
            .insert("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string());
        Ok(self)
    }

    /// Standard JSON error: `{"code": <status>, "message": "<message>"}`
    pub fn json_error(status: u16, message: impl Into<String>) -> Self {
        let body = ErrorResponse::new(status, message);
        let response = Self::new(status).with_header("X-Content-Type-Options", "nosniff");

        match response.clone().with_json(&body) {
            Ok(response) => response,
            Err(_) => response.with_body(format!("{{\"code\":{}}}", status)),
        }
    }
}
