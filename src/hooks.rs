//! Lifecycle hooks fired as a call moves through the request pipeline.
//!
//! Hooks are registered on the [`ClientBuilder`](crate::ClientBuilder) and
//! fire in order: request start, then either response or error, with a retry
//! notification before each backoff sleep. Hooks may be synchronous or
//! asynchronous; each is awaited before the pipeline continues.
//!
//! A failing request, response, or retry hook aborts the call. A failing
//! error hook is swallowed so it can never mask the failure it is reporting.

use crate::error::BoxError;
use http::Method;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

pub(crate) type HookFuture = Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send>>;

pub(crate) type RequestHook = Arc<dyn Fn(RequestEvent) -> HookFuture + Send + Sync>;
pub(crate) type ResponseHook = Arc<dyn Fn(ResponseEvent) -> HookFuture + Send + Sync>;
pub(crate) type ErrorHook = Arc<dyn Fn(ErrorEvent) -> HookFuture + Send + Sync>;
pub(crate) type RetryHook = Arc<dyn Fn(RetryEvent) -> HookFuture + Send + Sync>;

/// Fired once per logical call, before the first attempt is sent.
#[derive(Debug, Clone)]
pub struct RequestEvent {
    /// The HTTP method.
    pub method: Method,
    /// The normalized resource path (no leading slash).
    pub path: String,
    /// Query parameters attached to the call.
    pub query: Vec<(String, String)>,
}

/// Fired when a 2xx response body has been read successfully.
#[derive(Debug, Clone)]
pub struct ResponseEvent {
    /// The HTTP method.
    pub method: Method,
    /// The normalized resource path.
    pub path: String,
    /// The HTTP status code.
    pub status: u16,
    /// Elapsed time since the call started, in milliseconds.
    pub duration_ms: u64,
}

/// Fired when a call fails terminally.
///
/// Carries a rendered summary of the error rather than the error value
/// itself; the caller receives the full [`ApiError`](crate::ApiError) as the
/// call's return value.
#[derive(Debug, Clone)]
pub struct ErrorEvent {
    /// The HTTP method.
    pub method: Method,
    /// The normalized resource path.
    pub path: String,
    /// The HTTP status code, when the failure carries one.
    pub status: Option<u16>,
    /// The rendered error message.
    pub message: String,
    /// Elapsed time since the call started, in milliseconds.
    pub duration_ms: u64,
}

/// Fired before each backoff sleep when a rate-limited attempt is retried.
#[derive(Debug, Clone)]
pub struct RetryEvent {
    /// The HTTP method.
    pub method: Method,
    /// The normalized resource path.
    pub path: String,
    /// The attempt that just failed (1-based).
    pub attempt: u32,
    /// The total attempts the call may make.
    pub max_attempts: u32,
    /// How long the call will sleep before the next attempt.
    pub delay: Duration,
    /// A human-readable reason, e.g. `"Rate limit (429)"`.
    pub reason: String,
}

/// The registered hook functions for a client. Zero or more per event.
#[derive(Clone, Default)]
pub(crate) struct Hooks {
    pub(crate) on_request: Vec<RequestHook>,
    pub(crate) on_response: Vec<ResponseHook>,
    pub(crate) on_error: Vec<ErrorHook>,
    pub(crate) on_retry: Vec<RetryHook>,
}
