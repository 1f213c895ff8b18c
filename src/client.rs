//! The client and its request-execution pipeline.
//!
//! [`Client`] is the main entry point. Every call runs the same pipeline:
//! acquire a concurrency slot, fire the request hook, then attempt the HTTP
//! send with sequential 429 retries, classify the outcome, and return a
//! typed [`ApiResult`].

use crate::{
    auth::Credential,
    error::{ApiError, ApiResult, ConfigError, DecodeError},
    hooks::{ErrorEvent, HookFuture, Hooks, RequestEvent, ResponseEvent, RetryEvent},
    queue::{ConcurrencyPolicy, QueuePermit, RequestQueue},
    request::{Body, RequestOptions},
    retry::{self, RetryPolicy},
    BoxError,
};
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use http::{Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// The Intervals.icu v1 API root, used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "https://intervals.icu/api/v1";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A typed client for the Intervals.icu API.
///
/// The client is cheap to clone and designed to be shared; configuration
/// (credential, retry policy, concurrency bound) is immutable after
/// [`ClientBuilder::build`]. Requests never panic for API-level failures:
/// every outcome is an [`ApiResult`].
///
/// Dropping a call's future cancels it; the in-flight HTTP send is aborted
/// by the transport when its future is dropped.
///
/// # Examples
///
/// ```no_run
/// use intervals_client::{Client, Credential, RetryPolicy};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Athlete {
///     id: String,
///     name: String,
/// }
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = Client::builder()
///         .credential(Credential::api_key("my-api-key"))
///         .retry_policy(RetryPolicy::default())
///         .build()?;
///
///     match client.get::<Athlete>("athlete/0").await {
///         Ok(athlete) => println!("{} ({})", athlete.name, athlete.id),
///         Err(e) => eprintln!("request failed: {e}"),
///     }
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    base_url: Url,
    credential: Credential,
    timeout: Duration,
    retry_policy: RetryPolicy,
    queue: RequestQueue,
    hooks: Hooks,
}

/// Per-call state threaded through the pipeline. Holds the concurrency slot
/// for the whole logical call, body reading and decoding included.
struct CallContext {
    method: Method,
    path: String,
    start: Instant,
    _permit: QueuePermit,
}

impl Client {
    /// Creates a new [`ClientBuilder`].
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Sends a request and returns the parsed JSON body.
    pub async fn request_json(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> ApiResult<serde_json::Value> {
        let (response, ctx) = self.execute(path, options).await?;
        self.read_json(response, &ctx).await
    }

    /// Sends a request and runs `decoder` over the parsed JSON body.
    ///
    /// A decoder failure is returned as [`ApiError::Schema`], forwarding the
    /// decoder's diagnostics untouched.
    pub async fn request_json_with<T, D>(
        &self,
        path: &str,
        options: RequestOptions,
        decoder: D,
    ) -> ApiResult<T>
    where
        D: FnOnce(serde_json::Value) -> Result<T, DecodeError>,
    {
        let (response, ctx) = self.execute(path, options).await?;
        let value = self.read_json(response, &ctx).await?;
        decoder(value).map_err(ApiError::from)
    }

    /// Sends a request and returns the response body as text.
    pub async fn request_text(&self, path: &str, options: RequestOptions) -> ApiResult<String> {
        let (response, ctx) = self.execute(path, options).await?;
        self.read_text(response, &ctx).await
    }

    /// Sends a request and runs `decoder` over the response body text.
    pub async fn request_text_with<T, D>(
        &self,
        path: &str,
        options: RequestOptions,
        decoder: D,
    ) -> ApiResult<T>
    where
        D: FnOnce(String) -> Result<T, DecodeError>,
    {
        let (response, ctx) = self.execute(path, options).await?;
        let text = self.read_text(response, &ctx).await?;
        decoder(text).map_err(ApiError::from)
    }

    /// Sends a request and returns the raw response bytes.
    ///
    /// Used for binary endpoints (e.g. downloading original activity
    /// files); no decoding is applied.
    pub async fn request_bytes(&self, path: &str, options: RequestOptions) -> ApiResult<Vec<u8>> {
        let (response, ctx) = self.execute(path, options).await?;
        let status = response.status();
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(e) => {
                let error = ApiError::from_transport(e);
                self.fire_error(&ctx, &error).await;
                return Err(error);
            }
        };
        self.fire_response(&ctx, status).await?;
        Ok(bytes)
    }

    /// Makes a GET request and deserializes the JSON response.
    pub async fn get<T>(&self, path: &str) -> ApiResult<T>
    where
        T: DeserializeOwned,
    {
        self.request_json_with(path, RequestOptions::get(), decode_json::<T>)
            .await
    }

    /// Makes a POST request with a JSON body and deserializes the response.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let options = json_options(RequestOptions::post(), body)?;
        self.request_json_with(path, options, decode_json::<T>).await
    }

    /// Makes a PUT request with a JSON body and deserializes the response.
    pub async fn put<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let options = json_options(RequestOptions::put(), body)?;
        self.request_json_with(path, options, decode_json::<T>).await
    }

    /// Makes a DELETE request and deserializes the JSON response.
    pub async fn delete<T>(&self, path: &str) -> ApiResult<T>
    where
        T: DeserializeOwned,
    {
        self.request_json_with(path, RequestOptions::delete(), decode_json::<T>)
            .await
    }

    /// Runs the shared pipeline up to a successful (2xx) response.
    ///
    /// Retries of one logical call are strictly sequential: no attempt is
    /// sent before the previous attempt's response or failure is resolved.
    async fn execute(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> ApiResult<(reqwest::Response, CallContext)> {
        let path = path.trim_start_matches('/').to_string();
        let url = self.join_url(&path)?;

        // The slot covers the whole logical call, retries included.
        let permit = self.inner.queue.admit().await?;
        let ctx = CallContext {
            method: options.method.clone(),
            path,
            start: Instant::now(),
            _permit: permit,
        };

        self.fire_request(RequestEvent {
            method: ctx.method.clone(),
            path: ctx.path.clone(),
            query: options.query.clone(),
        })
        .await?;

        let total_attempts = self.inner.retry_policy.total_attempts();
        for attempt in 1..=total_attempts {
            tracing::debug!(
                method = %ctx.method,
                url = %url,
                attempt,
                "dispatching request attempt"
            );

            let response = match self.send_attempt(&url, &options).await {
                Ok(response) => response,
                Err(e) => {
                    let error = ApiError::from_transport(e);
                    tracing::warn!(
                        error = %error,
                        attempt,
                        method = %ctx.method,
                        path = %ctx.path,
                        "transport failure"
                    );
                    self.fire_error(&ctx, &error).await;
                    return Err(error);
                }
            };

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = retry::parse_retry_after(response.headers());
                if let Some(delay) = self.inner.retry_policy.decide(attempt, retry_after) {
                    self.fire_retry(RetryEvent {
                        method: ctx.method.clone(),
                        path: ctx.path.clone(),
                        attempt,
                        max_attempts: total_attempts,
                        delay,
                        reason: "Rate limit (429)".to_string(),
                    })
                    .await?;
                    tracing::info!(
                        delay_ms = delay.as_millis() as u64,
                        attempt,
                        max_attempts = total_attempts,
                        path = %ctx.path,
                        "rate limited, retrying after delay"
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
            }

            if !status.is_success() {
                let retry_after = retry::parse_retry_after(response.headers());
                let body = read_error_body(response).await;
                let error = ApiError::from_status(status, body, retry_after);
                if status.is_client_error() {
                    tracing::error!(
                        status = status.as_u16(),
                        method = %ctx.method,
                        path = %ctx.path,
                        "client error"
                    );
                } else {
                    tracing::warn!(
                        status = status.as_u16(),
                        method = %ctx.method,
                        path = %ctx.path,
                        "server error"
                    );
                }
                self.fire_error(&ctx, &error).await;
                return Err(error);
            }

            return Ok((response, ctx));
        }

        // Unreachable while the attempt budget is at least one; kept as the
        // terminal fallback.
        let error = ApiError::Unknown {
            message: "request failed after retries".to_string(),
            source: None,
        };
        self.fire_error(&ctx, &error).await;
        Err(error)
    }

    /// Sends one HTTP attempt. The Authorization header is rebuilt from the
    /// credential on every attempt; Accept defaults to `application/json`.
    /// Either header yields to a caller-supplied value.
    async fn send_attempt(
        &self,
        url: &Url,
        options: &RequestOptions,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let mut request = self
            .inner
            .http
            .request(options.method.clone(), url.clone())
            .timeout(self.inner.timeout);

        if !options.headers.contains_key(AUTHORIZATION) {
            request = request.header(AUTHORIZATION, self.inner.credential.header_value());
        }
        if !options.headers.contains_key(ACCEPT) {
            request = request.header(ACCEPT, "application/json");
        }
        for (name, value) in &options.headers {
            request = request.header(name, value);
        }
        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        match &options.body {
            Some(Body::Json(value)) => request = request.json(value),
            Some(Body::Raw { content_type, data }) => {
                request = request
                    .header(CONTENT_TYPE, content_type.as_str())
                    .body(data.clone());
            }
            None => {}
        }

        request.send().await
    }

    async fn read_json(
        &self,
        response: reqwest::Response,
        ctx: &CallContext,
    ) -> ApiResult<serde_json::Value> {
        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                let error = ApiError::from_transport(e);
                self.fire_error(ctx, &error).await;
                return Err(error);
            }
        };
        let value = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(e) => {
                let error = ApiError::Schema(DecodeError::new(format!(
                    "response was not valid JSON: {e}"
                )));
                tracing::error!(
                    status = status.as_u16(),
                    path = %ctx.path,
                    "failed to parse response body"
                );
                self.fire_error(ctx, &error).await;
                return Err(error);
            }
        };
        self.fire_response(ctx, status).await?;
        Ok(value)
    }

    async fn read_text(&self, response: reqwest::Response, ctx: &CallContext) -> ApiResult<String> {
        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                let error = ApiError::from_transport(e);
                self.fire_error(ctx, &error).await;
                return Err(error);
            }
        };
        self.fire_response(ctx, status).await?;
        Ok(text)
    }

    fn join_url(&self, path: &str) -> ApiResult<Url> {
        let mut base = self.inner.base_url.clone();
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        base.join(path).map_err(|e| ApiError::Unknown {
            message: format!("invalid request path: {path}"),
            source: Some(Box::new(e)),
        })
    }

    async fn fire_request(&self, event: RequestEvent) -> ApiResult<()> {
        for hook in &self.inner.hooks.on_request {
            hook(event.clone()).await.map_err(|e| ApiError::Unknown {
                message: "request hook failed".to_string(),
                source: Some(e),
            })?;
        }
        Ok(())
    }

    async fn fire_response(&self, ctx: &CallContext, status: StatusCode) -> ApiResult<()> {
        let duration_ms = ctx.start.elapsed().as_millis() as u64;
        tracing::info!(
            status = status.as_u16(),
            latency_ms = duration_ms,
            method = %ctx.method,
            path = %ctx.path,
            "request completed"
        );
        for hook in &self.inner.hooks.on_response {
            hook(ResponseEvent {
                method: ctx.method.clone(),
                path: ctx.path.clone(),
                status: status.as_u16(),
                duration_ms,
            })
            .await
            .map_err(|e| ApiError::Unknown {
                message: "response hook failed".to_string(),
                source: Some(e),
            })?;
        }
        Ok(())
    }

    /// Error hooks are observers only: a failing error hook is logged and
    /// swallowed so it can never mask the failure it reports.
    async fn fire_error(&self, ctx: &CallContext, error: &ApiError) {
        for hook in &self.inner.hooks.on_error {
            let event = ErrorEvent {
                method: ctx.method.clone(),
                path: ctx.path.clone(),
                status: error.status().map(|s| s.as_u16()),
                message: error.to_string(),
                duration_ms: ctx.start.elapsed().as_millis() as u64,
            };
            if let Err(hook_error) = hook(event).await {
                tracing::warn!(error = %hook_error, "error hook failed");
            }
        }
    }

    async fn fire_retry(&self, event: RetryEvent) -> ApiResult<()> {
        for hook in &self.inner.hooks.on_retry {
            hook(event.clone()).await.map_err(|e| ApiError::Unknown {
                message: "retry hook failed".to_string(),
                source: Some(e),
            })?;
        }
        Ok(())
    }
}

fn decode_json<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, DecodeError> {
    serde_json::from_value(value).map_err(DecodeError::from)
}

fn json_options<B: Serialize>(options: RequestOptions, body: &B) -> ApiResult<RequestOptions> {
    options.with_json(body).map_err(|e| ApiError::Unknown {
        message: "failed to serialize request body".to_string(),
        source: Some(Box::new(e)),
    })
}

/// Reads a non-2xx body best-effort so unexpected error shapes still
/// surface on the returned [`ApiError`]:
/// JSON content type -> parsed JSON, or nothing if the parse fails;
/// anything else -> parsed JSON if the text happens to be JSON, else the
/// raw text; nothing if the body itself cannot be read.
async fn read_error_body(response: reqwest::Response) -> Option<serde_json::Value> {
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("application/json"));

    let text = response.text().await.ok()?;
    match serde_json::from_str(&text) {
        Ok(value) => Some(value),
        Err(_) if is_json => None,
        Err(_) => Some(serde_json::Value::String(text)),
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use intervals_client::{ClientBuilder, ConcurrencyPolicy, Credential, RetryPolicy};
/// use std::time::Duration;
///
/// # fn example() -> Result<(), intervals_client::ConfigError> {
/// let client = ClientBuilder::new()
///     .credential(Credential::api_key("my-api-key"))
///     .timeout(Duration::from_secs(30))
///     .concurrency(ConcurrencyPolicy::bounded(4))
///     .on_retry(|event| async move {
///         eprintln!(
///             "attempt {}/{} retrying in {:?}: {}",
///             event.attempt, event.max_attempts, event.delay, event.reason
///         );
///         Ok(())
///     })
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    base_url: Option<Url>,
    credential: Option<Credential>,
    timeout: Duration,
    retry_policy: RetryPolicy,
    concurrency: ConcurrencyPolicy,
    hooks: Hooks,
    http: Option<reqwest::Client>,
}

impl ClientBuilder {
    /// Creates a builder with the default base URL, a 30 second timeout,
    /// the default retry policy, and unbounded concurrency.
    pub fn new() -> Self {
        Self {
            base_url: None,
            credential: None,
            timeout: DEFAULT_TIMEOUT,
            retry_policy: RetryPolicy::default(),
            concurrency: ConcurrencyPolicy::default(),
            hooks: Hooks::default(),
            http: None,
        }
    }

    /// Overrides the base URL (defaults to [`DEFAULT_BASE_URL`]).
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self, ConfigError> {
        self.base_url = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Sets the credential. Required.
    pub fn credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Sets the per-attempt request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the retry policy for rate-limited requests.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Sets the concurrency bound for logical calls.
    pub fn concurrency(mut self, policy: ConcurrencyPolicy) -> Self {
        self.concurrency = policy;
        self
    }

    /// Supplies a preconfigured HTTP transport instead of the default.
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Registers a hook fired before each logical call's first attempt.
    ///
    /// A failing request hook aborts the call.
    pub fn on_request<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(RequestEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.hooks
            .on_request
            .push(Arc::new(move |event| {
                let fut: HookFuture = Box::pin(hook(event));
                fut
            }));
        self
    }

    /// Registers a hook fired when a successful response has been read.
    ///
    /// A failing response hook aborts the call.
    pub fn on_response<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(ResponseEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.hooks
            .on_response
            .push(Arc::new(move |event| {
                let fut: HookFuture = Box::pin(hook(event));
                fut
            }));
        self
    }

    /// Registers a hook fired when a call fails terminally.
    ///
    /// Failures from this hook are swallowed.
    pub fn on_error<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(ErrorEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.hooks
            .on_error
            .push(Arc::new(move |event| {
                let fut: HookFuture = Box::pin(hook(event));
                fut
            }));
        self
    }

    /// Registers a hook fired before each retry's backoff sleep.
    ///
    /// A failing retry hook aborts the call.
    pub fn on_retry<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(RetryEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.hooks
            .on_retry
            .push(Arc::new(move |event| {
                let fut: HookFuture = Box::pin(hook(event));
                fut
            }));
        self
    }

    /// Builds the configured [`Client`].
    ///
    /// # Errors
    ///
    /// Returns an error if no credential was supplied or the transport
    /// cannot be constructed.
    pub fn build(self) -> Result<Client, ConfigError> {
        let credential = self.credential.ok_or(ConfigError::MissingCredential)?;
        let base_url = match self.base_url {
            Some(url) => url,
            None => Url::parse(DEFAULT_BASE_URL)?,
        };
        let http = match self.http {
            Some(client) => client,
            None => reqwest::Client::builder().build()?,
        };

        Ok(Client {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                credential,
                timeout: self.timeout,
                retry_policy: self.retry_policy,
                queue: RequestQueue::new(self.concurrency),
                hooks: self.hooks,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
