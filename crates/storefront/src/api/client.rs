use std::sync::{Arc, PoisonError, RwLock};

use greencart_core::{CartItemId, ProductId, UserId};
use moka::future::Cache;
use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, instrument};
use url::Url;

use super::cache::{CacheKey, CacheValue};
use super::types::ProductListing;
use super::{
    ApiError, ApiResponse, AuthResponse, CartItemRequest, LoginRequest, RemoteCartItem,
    RequestOptions, SignupRequest,
};
use crate::config::StorefrontConfig;
use crate::models::Product;

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the GreenCart HTTP API.
///
/// Cheap to clone; clones share the connection pool, the cache and the
/// bearer token.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    token: RwLock<Option<SecretString>>,
    cache: Cache<CacheKey, CacheValue>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("has_token", &self.has_token())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client for the configured API base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &StorefrontConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("greencart/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.api_base_url.clone(),
                token: RwLock::new(None),
                cache,
            }),
        })
    }

    /// The API base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    // =========================================================================
    // Bearer token
    // =========================================================================

    /// Use `token` for authenticated requests from now on.
    pub fn set_token(&self, token: SecretString) {
        *self
            .inner
            .token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    pub fn clear_token(&self) {
        *self
            .inner
            .token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    #[must_use]
    pub fn has_token(&self) -> bool {
        self.inner
            .token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn bearer(&self) -> Option<String> {
        self.inner
            .token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|token| format!("Bearer {}", token.expose_secret()))
    }

    // =========================================================================
    // Transport
    // =========================================================================

    fn url_for(&self, path: &str, query: &[(&'static str, String)]) -> Result<Url, ApiError> {
        let base = self.inner.base_url.as_str().trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}{path}"))?;

        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(key, value)| (*key, value.as_str())));
        }

        Ok(url)
    }

    /// Send a request to `path` (relative to the base URL).
    ///
    /// With `use_auth`, the current bearer token is attached if there is one;
    /// a missing token just omits the header. Non-success statuses become
    /// [`ApiError::Http`] carrying the response text.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    #[instrument(skip(self, options), fields(method = %options.method))]
    pub async fn request(
        &self,
        path: &str,
        options: RequestOptions,
        use_auth: bool,
    ) -> Result<ApiResponse, ApiError> {
        let url = self.url_for(path, &options.query)?;
        let mut request = self.inner.client.request(options.method, url);

        if use_auth && let Some(bearer) = self.bearer() {
            request = request.header(reqwest::header::AUTHORIZATION, bearer);
        }
        if let Some(body) = &options.body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("json"));

        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(
                        status = status.as_u16(),
                        error = %e,
                        "Failed to read error response body"
                    );
                    String::new()
                }
            };
            tracing::warn!(
                status = status.as_u16(),
                body = %body.chars().take(200).collect::<String>(),
                "API returned non-success status"
            );
            return Err(ApiError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        debug!(status = status.as_u16(), bytes = text.len(), "API response");

        if is_json && !text.trim().is_empty() {
            Ok(ApiResponse::Json(serde_json::from_str(&text)?))
        } else {
            Ok(ApiResponse::Text(text))
        }
    }

    async fn post_json<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
        use_auth: bool,
    ) -> Result<ApiResponse, ApiError> {
        let body = serde_json::to_value(body)?;
        self.request(path, RequestOptions::post(body), use_auth).await
    }

    // =========================================================================
    // Catalog (public)
    // =========================================================================

    /// Get one page of the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_products(
        &self,
        page: u32,
        size: u32,
        sort: &str,
    ) -> Result<Vec<Product>, ApiError> {
        let options = RequestOptions::get()
            .query("page", page)
            .query("size", size)
            .query("sort", sort);
        let listing: ProductListing = self.request("/products", options, false).await?.decode()?;
        Ok(listing.into())
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found or the API request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product, ApiError> {
        let cache_key = CacheKey::Product(id);

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let product: Product = self
            .request(&format!("/products/{id}"), RequestOptions::get(), false)
            .await?
            .decode()?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Full-text search over the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn search_products(
        &self,
        query: &str,
        page: u32,
        size: u32,
    ) -> Result<Vec<Product>, ApiError> {
        let options = RequestOptions::get()
            .query("q", query)
            .query("page", page)
            .query("size", size);
        let listing: ProductListing = self
            .request("/products/search", options, false)
            .await?
            .decode()?;
        Ok(listing.into())
    }

    /// Get one page of a category.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_products_by_category(
        &self,
        category: &str,
        page: u32,
        size: u32,
    ) -> Result<Vec<Product>, ApiError> {
        let path = format!("/products/category/{}", urlencoding::encode(category));
        let options = RequestOptions::get().query("page", page).query("size", size);
        let listing: ProductListing = self.request(&path, options, false).await?.decode()?;
        Ok(listing.into())
    }

    /// Get the featured products.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_featured_products(&self, limit: u32) -> Result<Vec<Product>, ApiError> {
        let cache_key = CacheKey::Featured { limit };

        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for featured products");
            return Ok(products);
        }

        let options = RequestOptions::get().query("limit", limit);
        let listing: ProductListing = self
            .request("/products/featured", options, false)
            .await?
            .decode()?;
        let products: Vec<Product> = listing.into();

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    /// Get all category names.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_categories(&self) -> Result<Vec<String>, ApiError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories: Vec<String> = self
            .request("/products/categories", RequestOptions::get(), false)
            .await?
            .decode()?;

        self.inner
            .cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(categories.clone()),
            )
            .await;

        Ok(categories)
    }

    /// Drop a cached product.
    pub async fn invalidate_product(&self, id: ProductId) {
        self.inner.cache.invalidate(&CacheKey::Product(id)).await;
    }

    // =========================================================================
    // Auth
    // =========================================================================

    /// Exchange credentials for a token.
    ///
    /// Does not store the token; callers decide when a session starts.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are rejected or the request fails.
    #[instrument(skip_all, fields(email = %credentials.email))]
    pub async fn login(&self, credentials: &LoginRequest) -> Result<AuthResponse, ApiError> {
        self.post_json("/auth/login", credentials, false)
            .await?
            .decode()
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the account or the request fails.
    #[instrument(skip_all, fields(email = %user.email))]
    pub async fn signup(&self, user: &SignupRequest) -> Result<AuthResponse, ApiError> {
        self.post_json("/auth/signup", user, false).await?.decode()
    }

    /// End the server-side session.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), ApiError> {
        self.request("/auth/logout", RequestOptions::method(Method::POST), true)
            .await?;
        Ok(())
    }

    // =========================================================================
    // Server-side cart (authenticated, never cached)
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_cart_items(&self, user_id: UserId) -> Result<Vec<RemoteCartItem>, ApiError> {
        self.request(&format!("/cart/{user_id}"), RequestOptions::get(), true)
            .await?
            .decode()
    }

    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(product_id = %item.product_id))]
    pub async fn add_cart_item(&self, item: &CartItemRequest) -> Result<RemoteCartItem, ApiError> {
        self.post_json("/cart/add", item, true).await?.decode()
    }

    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(cart_item_id = %id))]
    pub async fn update_cart_item(
        &self,
        id: CartItemId,
        quantity: u32,
    ) -> Result<RemoteCartItem, ApiError> {
        let options = RequestOptions::method(Method::PUT).query("quantity", quantity);
        self.request(&format!("/cart/update/{id}"), options, true)
            .await?
            .decode()
    }

    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(cart_item_id = %id))]
    pub async fn remove_cart_item(&self, id: CartItemId) -> Result<(), ApiError> {
        self.request(
            &format!("/cart/remove/{id}"),
            RequestOptions::method(Method::DELETE),
            true,
        )
        .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn clear_cart(&self, user_id: UserId) -> Result<(), ApiError> {
        self.request(
            &format!("/cart/clear/{user_id}"),
            RequestOptions::method(Method::DELETE),
            true,
        )
        .await?;
        Ok(())
    }

    /// Total quantity in the server-side cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the body is not a number.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_cart_item_count(&self, user_id: UserId) -> Result<u64, ApiError> {
        self.request(&format!("/cart/count/{user_id}"), RequestOptions::get(), true)
            .await?
            .decode()
    }
}
