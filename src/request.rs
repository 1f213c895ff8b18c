//! Per-request options: method, query parameters, headers, and body.

use crate::error::ConfigError;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;

/// The body payload of a request.
#[derive(Debug, Clone)]
pub enum Body {
    /// A JSON value, sent with `Content-Type: application/json`.
    Json(serde_json::Value),
    /// Raw bytes with an explicit content type.
    Raw {
        /// The `Content-Type` header value for the payload.
        content_type: String,
        /// The payload bytes.
        data: Vec<u8>,
    },
}

/// Options for a single request.
///
/// # Examples
///
/// ```
/// use intervals_client::RequestOptions;
///
/// let options = RequestOptions::get()
///     .with_query("oldest", "2024-01-01")
///     .with_query("newest", "2024-02-01");
/// ```
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// The HTTP method.
    pub method: Method,
    /// Additional headers for this request.
    pub headers: HeaderMap,
    /// Query parameters, appended in insertion order.
    pub query: Vec<(String, String)>,
    /// The request body, if any.
    pub body: Option<Body>,
}

impl RequestOptions {
    /// Creates options for the given method.
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Options for a GET request.
    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    /// Options for a POST request.
    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    /// Options for a PUT request.
    pub fn put() -> Self {
        Self::new(Method::PUT)
    }

    /// Options for a DELETE request.
    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    /// Appends a query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Adds a header.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn with_header(
        mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<Self, ConfigError> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| ConfigError::InvalidHeader(format!("invalid name: {e}")))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| ConfigError::InvalidHeader(format!("invalid value: {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Sets a JSON body from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be serialized.
    pub fn with_json(mut self, body: &impl Serialize) -> Result<Self, ConfigError> {
        self.body = Some(Body::Json(serde_json::to_value(body)?));
        Ok(self)
    }

    /// Sets a raw byte body with an explicit content type.
    pub fn with_raw(mut self, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        self.body = Some(Body::Raw {
            content_type: content_type.into(),
            data,
        });
        self
    }
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_parameters_keep_insertion_order() {
        let options = RequestOptions::get()
            .with_query("b", "2")
            .with_query("a", "1");
        assert_eq!(
            options.query,
            vec![("b".to_string(), "2".to_string()), ("a".to_string(), "1".to_string())]
        );
    }

    #[test]
    fn invalid_header_name_is_rejected() {
        let result = RequestOptions::get().with_header("bad header\n", "x");
        assert!(matches!(result, Err(ConfigError::InvalidHeader(_))));
    }
}
