//! # intervals-client — a typed client for the Intervals.icu API
//!
//! A retry-aware, type-safe client for the Intervals.icu fitness API, built
//! on `reqwest`. It constructs authenticated requests, rides out HTTP 429
//! rate limiting with `Retry-After`-aware exponential backoff, bounds the
//! number of in-flight calls, and returns every outcome as a typed
//! `Result` — callers never catch exceptions for ordinary API failures.
//!
//! ## Quick start
//!
//! ```no_run
//! use intervals_client::{Client, Credential, RetryPolicy};
//! use serde::Deserialize;
//! use std::time::Duration;
//!
//! #[derive(Deserialize)]
//! struct Activity {
//!     id: String,
//!     name: Option<String>,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::builder()
//!         .credential(Credential::api_key("my-api-key"))
//!         .timeout(Duration::from_secs(30))
//!         .retry_policy(RetryPolicy {
//!             max_retries: 3,
//!             initial_delay: Duration::from_millis(1000),
//!             max_delay: Duration::from_millis(8000),
//!             jitter: true,
//!             jitter_factor: 0.2,
//!         })
//!         .build()?;
//!
//!     match client.get::<Vec<Activity>>("athlete/0/activities").await {
//!         Ok(activities) => println!("{} activities", activities.len()),
//!         Err(e) => eprintln!("request failed: {e}"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Non-throwing results** — every call returns [`ApiResult`]; failures
//!   are values of the closed [`ApiError`] taxonomy (`Unauthorized`,
//!   `RateLimit`, `Schema`, `Timeout`, ...), never panics.
//! - **Rate-limit resilience** — 429 responses are retried with exponential
//!   backoff and jitter; a server-supplied `Retry-After` is honored exactly.
//!   Retries of one call are strictly sequential.
//! - **Bounded concurrency** — [`ConcurrencyPolicy`] caps in-flight calls;
//!   waiting calls are admitted FIFO, and a slot spans a call's full retry
//!   sequence.
//! - **Lifecycle hooks** — observe request start, response, error, and each
//!   retry decision; see [`hooks`].
//! - **Caller-supplied decoders** — validate and reshape responses with
//!   your own `fn(Value) -> Result<T, DecodeError>`; validator diagnostics
//!   are forwarded on [`ApiError::Schema`].
//!
//! ## Error handling
//!
//! ```no_run
//! use intervals_client::{ApiError, Client, Credential};
//!
//! # async fn example() -> Result<(), intervals_client::ConfigError> {
//! let client = Client::builder()
//!     .credential(Credential::api_key("my-api-key"))
//!     .build()?;
//!
//! match client.get::<serde_json::Value>("wellness/2024-06-01").await {
//!     Ok(day) => println!("{day}"),
//!     Err(ApiError::NotFound { .. }) => println!("no wellness entry for that day"),
//!     Err(ApiError::RateLimit { retry_after_secs, .. }) => {
//!         eprintln!("still rate limited after retries ({retry_after_secs:?}s)");
//!     }
//!     Err(e) => eprintln!("request failed: {e}"),
//! }
//! # Ok(())
//! # }
//! ```

mod auth;
mod client;
mod error;
pub mod hooks;
mod queue;
mod request;
pub mod retry;

pub use auth::Credential;
pub use client::{Client, ClientBuilder, DEFAULT_BASE_URL};
pub use error::{ApiError, ApiResult, BoxError, ConfigError, DecodeError};
pub use hooks::{ErrorEvent, RequestEvent, ResponseEvent, RetryEvent};
pub use queue::ConcurrencyPolicy;
pub use request::{Body, RequestOptions};
pub use retry::RetryPolicy;
