//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `GREENCART_API_BASE_URL` - API base URL (default: `http://localhost:8081/api`)
//! - `GREENCART_STORAGE_DIR` - Directory for the local cart, wishlist and
//!   session (default: `.greencart`)
//! - `GREENCART_PAGE_SIZE` - Products per listing page (default: 12)
//! - `GREENCART_FEATURED_LIMIT` - Products requested for the featured strip (default: 8)
//! - `GREENCART_CACHE_TTL_SECS` - Catalog cache TTL in seconds (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8081/api";
pub const DEFAULT_STORAGE_DIR: &str = ".greencart";
pub const DEFAULT_PAGE_SIZE: u32 = 12;
pub const DEFAULT_FEATURED_LIMIT: u32 = 8;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Base URL every API path is appended to
    pub api_base_url: Url,
    /// Where the local persistence files live
    pub storage_dir: PathBuf,
    /// Page size for catalog listings
    pub page_size: u32,
    /// How many featured products to request
    pub featured_limit: u32,
    /// TTL for cached products and categories
    pub cache_ttl: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. `production`)
    pub sentry_environment: Option<String>,
}

impl StorefrontConfig {
    /// Defaults for everything except the API base URL.
    #[must_use]
    pub fn new(api_base_url: Url) -> Self {
        Self {
            api_base_url,
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            page_size: DEFAULT_PAGE_SIZE,
            featured_limit: DEFAULT_FEATURED_LIMIT,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base_url = parse_base_url(
            "GREENCART_API_BASE_URL",
            &get_env_or_default("GREENCART_API_BASE_URL", DEFAULT_API_BASE_URL),
        )?;
        let storage_dir =
            PathBuf::from(get_env_or_default("GREENCART_STORAGE_DIR", DEFAULT_STORAGE_DIR));
        let page_size = get_optional_env("GREENCART_PAGE_SIZE")
            .map(|value| parse_positive("GREENCART_PAGE_SIZE", &value))
            .transpose()?
            .unwrap_or(DEFAULT_PAGE_SIZE);
        let featured_limit = get_optional_env("GREENCART_FEATURED_LIMIT")
            .map(|value| parse_positive("GREENCART_FEATURED_LIMIT", &value))
            .transpose()?
            .unwrap_or(DEFAULT_FEATURED_LIMIT);
        let cache_ttl_secs = get_optional_env("GREENCART_CACHE_TTL_SECS")
            .map(|value| parse_positive("GREENCART_CACHE_TTL_SECS", &value))
            .transpose()?
            .unwrap_or(DEFAULT_CACHE_TTL_SECS);

        Ok(Self {
            api_base_url,
            storage_dir,
            page_size,
            featured_limit,
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

fn parse_base_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}' (expected http or https)", url.scheme()),
        ));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must not contain a query or fragment".to_string(),
        ));
    }

    Ok(url)
}

fn parse_positive<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr + PartialEq + Default,
    T::Err: std::fmt::Display,
{
    let parsed = value
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    if parsed == T::default() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(parsed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StorefrontConfig::new(Url::parse(DEFAULT_API_BASE_URL).unwrap());
        assert_eq!(config.page_size, 12);
        assert_eq!(config.featured_limit, 8);
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.storage_dir, PathBuf::from(".greencart"));
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_parse_base_url() {
        let url = parse_base_url("K", " https://shop.example.com/api ").unwrap();
        assert_eq!(url.as_str(), "https://shop.example.com/api");

        assert!(parse_base_url("K", "not a url").is_err());
        assert!(parse_base_url("K", "ftp://example.com/api").is_err());
        assert!(parse_base_url("K", "http://example.com/api?x=1").is_err());
    }

    #[test]
    fn test_parse_positive() {
        assert_eq!(parse_positive::<u32>("K", "24").unwrap(), 24);
        assert!(parse_positive::<u32>("K", "0").is_err());
        assert!(parse_positive::<u32>("K", "-3").is_err());

        let err = parse_positive::<u64>("GREENCART_CACHE_TTL_SECS", "soon").unwrap_err();
        assert!(err.to_string().contains("GREENCART_CACHE_TTL_SECS"));
    }
}
