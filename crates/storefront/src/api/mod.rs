//! Client for the GreenCart catalog, auth and cart HTTP API.
//!
//! # Architecture
//!
//! - `reqwest` for HTTP, JSON bodies both ways
//! - The server is the source of truth for products and the server-side cart
//! - Single products, featured lists and categories are cached in memory via
//!   `moka` (TTL from configuration)
//!
//! # Endpoints
//!
//! ## Public
//! - `/products`, `/products/{id}`, `/products/search`,
//!   `/products/category/{category}`, `/products/featured`,
//!   `/products/categories`
//! - `/auth/login`, `/auth/signup`
//!
//! ## Bearer token
//! - `/auth/logout`
//! - `/cart/...`
//!
//! # Example
//!
//! ```rust,ignore
//! use greencart_storefront::api::ApiClient;
//!
//! let client = ApiClient::new(&config)?;
//! let featured = client.get_featured_products(8).await?;
//!
//! client.set_token(session.token.clone());
//! let count = client.get_cart_item_count(session.user_id).await?;
//! ```

mod cache;
mod client;
pub mod types;

pub use client::ApiClient;
pub use types::*;

use reqwest::Method;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors that can occur when talking to the API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never got a response (DNS, connect, TLS, body read).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("{}", describe_http_error(*.status, .body))]
    Http { status: u16, body: String },

    /// The response body did not have the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The configured base URL and path did not form a valid URL.
    #[error("invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    /// HTTP status, for [`ApiError::Http`].
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the failure points at our side or the network rather than
    /// at the shopper's input.
    #[must_use]
    pub const fn is_unexpected(&self) -> bool {
        match self {
            Self::Http { status, .. } => *status >= 500,
            Self::Network(_) | Self::Decode(_) | Self::InvalidUrl(_) => true,
        }
    }
}

/// The server's error text, falling back to the status when the body is empty.
fn describe_http_error(status: u16, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        format!("HTTP error! status: {status}")
    } else {
        body.to_string()
    }
}

/// A successful response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiResponse {
    /// The response declared a JSON content type.
    Json(serde_json::Value),
    /// Anything else, verbatim.
    Text(String),
}

impl ApiResponse {
    /// Decode the body into `T`.
    ///
    /// Text bodies are parsed as JSON too, so a bare `3` served as
    /// `text/plain` still decodes into a number.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Decode`] if the body does not match `T`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        let value = match self {
            Self::Json(value) => serde_json::from_value(value)?,
            Self::Text(text) => serde_json::from_str(&text)?,
        };
        Ok(value)
    }
}

/// Method, query and body for [`ApiClient::request`].
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Method,
    pub query: Vec<(&'static str, String)>,
    pub body: Option<serde_json::Value>,
}

impl RequestOptions {
    #[must_use]
    pub fn get() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn method(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    /// A `POST` with a JSON body.
    #[must_use]
    pub fn post(body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            body: Some(body),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn query(mut self, key: &'static str, value: impl ToString) -> Self {
        self.query.push((key, value.to_string()));
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_uses_body() {
        let err = ApiError::Http {
            status: 401,
            body: "Invalid credentials\n".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid credentials");
        assert_eq!(err.status(), Some(401));
        assert!(!err.is_unexpected());
    }

    #[test]
    fn test_http_error_empty_body() {
        let err = ApiError::Http {
            status: 503,
            body: String::new(),
        };
        assert_eq!(err.to_string(), "HTTP error! status: 503");
        assert!(err.is_unexpected());
    }

    #[test]
    fn test_decode_json_and_text() {
        let json = ApiResponse::Json(serde_json::json!([1, 2]));
        assert_eq!(json.decode::<Vec<u8>>().unwrap(), vec![1, 2]);

        let text = ApiResponse::Text("3".to_string());
        assert_eq!(text.decode::<u64>().unwrap(), 3);

        let text = ApiResponse::Text("Logged out".to_string());
        assert!(matches!(text.decode::<u64>(), Err(ApiError::Decode(_))));
    }

    #[test]
    fn test_request_options() {
        let options = RequestOptions::get().query("page", 0).query("size", 12);
        assert_eq!(options.method, Method::GET);
        assert_eq!(
            options.query,
            vec![("page", "0".to_string()), ("size", "12".to_string())]
        );

        let options = RequestOptions::post(serde_json::json!({"a": 1}));
        assert_eq!(options.method, Method::POST);
        assert!(options.body.is_some());
    }
}
