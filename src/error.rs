//! Error types for API calls.
//!
//! Every ordinary failure mode surfaces as a variant of the closed
//! [`ApiError`] enum through an [`ApiResult`]. Public request methods never
//! panic for API-level failures; callers branch on the returned `Result`.

use http::StatusCode;
use std::time::Duration;

/// Boxed error type carried as a cause on hook failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The closed error taxonomy for API calls.
///
/// Status-classified variants carry the HTTP status, a short message, and
/// the response body when one could be read. Retryable 429 responses are
/// handled internally and only surface as [`ApiError::RateLimit`] once
/// retries are exhausted.
///
/// # Examples
///
/// ```no_run
/// use intervals_client::{ApiError, Client, Credential};
///
/// # async fn example() -> Result<(), intervals_client::ConfigError> {
/// let client = Client::builder().credential(Credential::api_key("k")).build()?;
///
/// match client.get::<serde_json::Value>("athlete/0/activities").await {
///     Ok(activities) => println!("{activities:?}"),
///     Err(ApiError::Unauthorized { status, .. }) => eprintln!("bad credentials ({status})"),
///     Err(ApiError::RateLimit { retry_after_secs, .. }) => {
///         eprintln!("rate limited, retry after {retry_after_secs:?}s");
///     }
///     Err(e) => eprintln!("request failed: {e}"),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    /// The server returned HTTP 401.
    #[error("unauthorized ({status}): {message}")]
    Unauthorized {
        /// The HTTP status code.
        status: StatusCode,
        /// A short description of the failure.
        message: String,
        /// The response body, read best-effort.
        body: Option<serde_json::Value>,
    },

    /// The server returned HTTP 403.
    #[error("forbidden ({status}): {message}")]
    Forbidden {
        /// The HTTP status code.
        status: StatusCode,
        /// A short description of the failure.
        message: String,
        /// The response body, read best-effort.
        body: Option<serde_json::Value>,
    },

    /// The server returned HTTP 404.
    #[error("not found ({status}): {message}")]
    NotFound {
        /// The HTTP status code.
        status: StatusCode,
        /// A short description of the failure.
        message: String,
        /// The response body, read best-effort.
        body: Option<serde_json::Value>,
    },

    /// The server kept returning HTTP 429 until retries were exhausted.
    #[error("rate limited ({status}): {message}")]
    RateLimit {
        /// The HTTP status code.
        status: StatusCode,
        /// A short description of the failure.
        message: String,
        /// The `Retry-After` value of the final response, in seconds.
        retry_after_secs: Option<u64>,
        /// The response body, read best-effort.
        body: Option<serde_json::Value>,
    },

    /// The server returned any other non-2xx status.
    #[error("http error ({status}): {message}")]
    Http {
        /// The HTTP status code.
        status: StatusCode,
        /// A short description of the failure.
        message: String,
        /// The response body, read best-effort.
        body: Option<serde_json::Value>,
    },

    /// A decoder rejected an otherwise-successful response.
    ///
    /// The wrapped [`DecodeError`] preserves the validator's diagnostics
    /// (`issues`) without interpreting them.
    #[error("response validation failed: {0}")]
    Schema(#[from] DecodeError),

    /// The transport signaled a timeout for one attempt.
    #[error("request timed out")]
    Timeout(#[source] reqwest::Error),

    /// The transport failed below the HTTP layer (connection, DNS, TLS).
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Anything that escaped a cleaner classification, including a failing
    /// lifecycle hook.
    #[error("{message}")]
    Unknown {
        /// A short description of the failure.
        message: String,
        /// The underlying cause, when one exists.
        #[source]
        source: Option<BoxError>,
    },
}

impl ApiError {
    /// Classifies a non-2xx response by status code.
    pub(crate) fn from_status(
        status: StatusCode,
        body: Option<serde_json::Value>,
        retry_after: Option<Duration>,
    ) -> Self {
        let message = status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string();
        match status.as_u16() {
            401 => ApiError::Unauthorized {
                status,
                message,
                body,
            },
            403 => ApiError::Forbidden {
                status,
                message,
                body,
            },
            404 => ApiError::NotFound {
                status,
                message,
                body,
            },
            429 => ApiError::RateLimit {
                status,
                message,
                retry_after_secs: retry_after.map(|d| d.as_secs()),
                body,
            },
            _ => ApiError::Http {
                status,
                message,
                body,
            },
        }
    }

    /// Classifies a transport-level failure. Timeouts are distinguished from
    /// other network errors; neither is retried.
    pub(crate) fn from_transport(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ApiError::Timeout(error)
        } else {
            ApiError::Network(error)
        }
    }

    /// Returns the HTTP status code if this error carries one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Unauthorized { status, .. }
            | ApiError::Forbidden { status, .. }
            | ApiError::NotFound { status, .. }
            | ApiError::RateLimit { status, .. }
            | ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the response body if this error carries one.
    pub fn body(&self) -> Option<&serde_json::Value> {
        match self {
            ApiError::Unauthorized { body, .. }
            | ApiError::Forbidden { body, .. }
            | ApiError::NotFound { body, .. }
            | ApiError::RateLimit { body, .. }
            | ApiError::Http { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    /// Returns the validator diagnostics for [`ApiError::Schema`] errors.
    pub fn issues(&self) -> Option<&serde_json::Value> {
        match self {
            ApiError::Schema(decode) => decode.issues.as_ref(),
            _ => None,
        }
    }
}

/// A specialized `Result` for API calls.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Failure raised by a caller-supplied decoder.
///
/// Decoders validate and reshape a raw response body into a typed value.
/// When validation fails they return this error, optionally attaching the
/// validator's own diagnostics as `issues`; the client forwards those
/// opaquely on [`ApiError::Schema`].
#[derive(Debug)]
pub struct DecodeError {
    /// What the decoder rejected.
    pub message: String,
    /// Validator-specific diagnostics, forwarded without interpretation.
    pub issues: Option<serde_json::Value>,
}

impl DecodeError {
    /// Creates a decode error with a message only.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            issues: None,
        }
    }

    /// Attaches validator diagnostics.
    pub fn with_issues(mut self, issues: serde_json::Value) -> Self {
        self.issues = Some(issues);
        self
    }
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for DecodeError {}

impl From<serde_json::Error> for DecodeError {
    fn from(error: serde_json::Error) -> Self {
        DecodeError::new(error.to_string())
    }
}

/// Errors raised while configuring a client or a request.
///
/// These are construction-time programming errors, kept separate from the
/// closed [`ApiError`] taxonomy that classifies request outcomes.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The base URL could not be parsed.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),

    /// A header name or value was invalid.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// No credential was supplied to the builder.
    #[error("a credential is required")]
    MissingCredential,

    /// A request body could not be serialized to JSON.
    #[error("failed to serialize request body: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The HTTP transport could not be constructed.
    #[error("failed to build HTTP transport: {0}")]
    Transport(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification_is_closed_over_the_taxonomy() {
        let cases = [
            (401, "Unauthorized"),
            (403, "Forbidden"),
            (404, "NotFound"),
            (429, "RateLimit"),
            (500, "Http"),
            (418, "Http"),
        ];
        for (code, expected) in cases {
            let status = StatusCode::from_u16(code).unwrap();
            let error = ApiError::from_status(status, None, None);
            let kind = match error {
                ApiError::Unauthorized { .. } => "Unauthorized",
                ApiError::Forbidden { .. } => "Forbidden",
                ApiError::NotFound { .. } => "NotFound",
                ApiError::RateLimit { .. } => "RateLimit",
                ApiError::Http { .. } => "Http",
                _ => "other",
            };
            assert_eq!(kind, expected, "status {code}");
        }
    }

    #[test]
    fn rate_limit_carries_retry_after_seconds() {
        let error = ApiError::from_status(
            StatusCode::TOO_MANY_REQUESTS,
            None,
            Some(Duration::from_secs(42)),
        );
        match error {
            ApiError::RateLimit {
                retry_after_secs, ..
            } => assert_eq!(retry_after_secs, Some(42)),
            other => panic!("expected RateLimit, got {other:?}"),
        }
    }

    #[test]
    fn schema_errors_expose_issues() {
        let issues = serde_json::json!([{ "path": ["id"], "message": "expected number" }]);
        let error = ApiError::from(DecodeError::new("bad shape").with_issues(issues.clone()));
        assert_eq!(error.issues(), Some(&issues));
        assert!(error.status().is_none());
    }
}
