//! Credentials and `Authorization` header construction.

use base64::{engine::general_purpose, Engine as _};

/// The credential used to authenticate every request.
///
/// Supplied once at client construction and immutable for the lifetime of
/// the client. The header value is recomputed for each outgoing attempt.
///
/// # Examples
///
/// ```
/// use intervals_client::Credential;
///
/// let key = Credential::api_key("my-api-key");
/// assert!(key.header_value().starts_with("Basic "));
///
/// let token = Credential::bearer("my-token");
/// assert_eq!(token.header_value(), "Bearer my-token");
/// ```
#[derive(Debug, Clone)]
pub enum Credential {
    /// An Intervals.icu API key, sent as HTTP Basic auth with the fixed
    /// `API_KEY` username.
    ApiKey {
        /// The API key.
        key: String,
    },

    /// A bearer token, sent verbatim without encoding.
    Bearer {
        /// The token.
        token: String,
    },
}

impl Credential {
    /// Creates an API-key credential.
    pub fn api_key(key: impl Into<String>) -> Self {
        Credential::ApiKey { key: key.into() }
    }

    /// Creates a bearer-token credential.
    pub fn bearer(token: impl Into<String>) -> Self {
        Credential::Bearer {
            token: token.into(),
        }
    }

    /// Builds the `Authorization` header value for this credential.
    ///
    /// API keys produce `Basic base64("API_KEY:" + key)`; bearer tokens
    /// produce `Bearer token` unmodified. Deterministic and infallible.
    pub fn header_value(&self) -> String {
        match self {
            Credential::ApiKey { key } => {
                let encoded = general_purpose::STANDARD.encode(format!("API_KEY:{key}"));
                format!("Basic {encoded}")
            }
            Credential::Bearer { token } => format!("Bearer {token}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_uses_basic_auth_with_fixed_username() {
        let credential = Credential::api_key("secret");
        // base64("API_KEY:secret")
        assert_eq!(credential.header_value(), "Basic QVBJX0tFWTpzZWNyZXQ=");
    }

    #[test]
    fn api_key_is_deterministic() {
        let credential = Credential::api_key("abc123");
        assert_eq!(credential.header_value(), credential.header_value());
        assert_eq!(credential.header_value(), "Basic QVBJX0tFWTphYmMxMjM=");
    }

    #[test]
    fn empty_api_key_still_encodes() {
        let credential = Credential::api_key("");
        // base64("API_KEY:")
        assert_eq!(credential.header_value(), "Basic QVBJX0tFWTo=");
    }

    #[test]
    fn bearer_token_passes_through_verbatim() {
        let credential = Credential::bearer("tok-with-:-and-=");
        assert_eq!(credential.header_value(), "Bearer tok-with-:-and-=");
    }

    #[test]
    fn empty_bearer_token() {
        let credential = Credential::bearer("");
        assert_eq!(credential.header_value(), "Bearer ");
    }
}
