//! Integration test support for the GreenCart storefront client.
//!
//! [`MockApi`] serves the GreenCart HTTP API with `axum` on an ephemeral
//! port, records every request it sees, and keeps a small server-side cart.
//! [`RecordingRenderer`] captures everything the storefront draws.
//!
//! ```rust,ignore
//! let api = MockApi::start().await?;
//! let client = ApiClient::new(&api.config())?;
//! client.get_featured_products(8).await?;
//! assert_eq!(api.requests()[0].path, "/api/products/featured");
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use axum::extract::{Path, Query, Request, State};
use axum::http::{HeaderMap, Method, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use greencart_storefront::StorefrontConfig;
use greencart_storefront::views::{CartCount, CartView, Notice, ProductCard, Renderer, Route};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use url::Url;

/// Password the mock accepts for every account.
pub const VALID_PASSWORD: &str = "correct-horse";

/// User id the mock assigns on login.
pub const USER_ID: i64 = 42;

// =============================================================================
// Fixtures
// =============================================================================

/// The mock catalog, in server order.
#[must_use]
pub fn catalog() -> Vec<Value> {
    vec![
        json!({"id": 1, "name": "Chia Seeds", "description": "Omega rich seeds", "category": "seeds",
               "price": 120, "originalPrice": 150, "imageUrl": "/img/chia.jpg", "rating": 4.2, "reviews": 31}),
        json!({"id": 2, "name": "Almonds", "description": "California almonds", "category": "dry fruits",
               "price": 650, "imageUrl": "/img/almonds.jpg", "rating": 4.8, "reviews": 120}),
        json!({"id": 3, "name": "Flax Seeds", "description": "Roasted", "category": "seeds",
               "price": 45, "imageUrl": "/img/flax.jpg", "rating": 3.9, "reviews": 12}),
        json!({"id": 4, "name": "Cold-pressed Coconut Oil", "description": null, "category": "oils",
               "price": 400, "originalPrice": 500, "imageUrl": "/img/coconut.jpg", "rating": 4.6}),
        json!({"id": 5, "name": "Dates", "description": "Medjool dates", "category": "dry fruits",
               "price": 100, "imageUrl": "/img/dates.jpg"}),
        json!({"id": 6, "name": "basil seeds", "description": "Sabja", "category": "seeds",
               "price": 50, "imageUrl": "/img/basil.jpg", "rating": 4.7, "reviews": 5}),
    ]
}

fn find_product(id: i64) -> Option<Value> {
    catalog().into_iter().find(|product| product["id"] == id)
}

// =============================================================================
// Recorded requests
// =============================================================================

/// A request as the mock received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: Method,
    /// Raw (still percent-encoded) path.
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Debug, Default)]
struct MockData {
    requests: Vec<RecordedRequest>,
    cart: Vec<Value>,
    next_cart_item_id: i64,
    last_login: Option<Value>,
}

#[derive(Debug, Clone, Default)]
struct MockState {
    data: Arc<Mutex<MockData>>,
}

impl MockState {
    fn with<T>(&self, f: impl FnOnce(&mut MockData) -> T) -> T {
        let mut data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut data)
    }
}

fn header_string(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

async fn record(State(state): State<MockState>, request: Request, next: Next) -> Response {
    let recorded = RecordedRequest {
        method: request.method().clone(),
        path: request.uri().path().to_string(),
        query: request.uri().query().map(str::to_string),
        authorization: header_string(request.headers(), header::AUTHORIZATION),
        content_type: header_string(request.headers(), header::CONTENT_TYPE),
    };
    state.with(|data| data.requests.push(recorded));
    next.run(request).await
}

// =============================================================================
// Handlers
// =============================================================================

fn is_authorized(headers: &HeaderMap) -> bool {
    header_string(headers, header::AUTHORIZATION)
        .is_some_and(|value| value.starts_with("Bearer jwt-"))
}

fn unauthorized() -> Response {
    StatusCode::UNAUTHORIZED.into_response()
}

fn param<T: std::str::FromStr>(query: &HashMap<String, String>, key: &str, default: T) -> T {
    query
        .get(key)
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

fn page_of(products: Vec<Value>, query: &HashMap<String, String>) -> Vec<Value> {
    let page: usize = param(query, "page", 0);
    let size: usize = param(query, "size", 12);
    products.into_iter().skip(page * size).take(size).collect()
}

fn lowercase_field(product: &Value, field: &str) -> String {
    product[field].as_str().unwrap_or_default().to_lowercase()
}

/// Paged object, like a Spring `Page`.
async fn list_products(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    let mut products = catalog();
    match query.get("sort").map(String::as_str) {
        Some("name") => products.sort_by_key(|p| lowercase_field(p, "name")),
        Some("price") => products.sort_by(|a, b| {
            a["price"]
                .as_f64()
                .unwrap_or_default()
                .total_cmp(&b["price"].as_f64().unwrap_or_default())
        }),
        _ => {}
    }
    let total = products.len();
    Json(json!({"content": page_of(products, &query), "totalElements": total}))
}

/// Bare array.
async fn featured_products(Query(query): Query<HashMap<String, String>>) -> Json<Vec<Value>> {
    let limit: usize = param(&query, "limit", 8);
    Json(catalog().into_iter().take(limit).collect())
}

async fn search_products(Query(query): Query<HashMap<String, String>>) -> Json<Vec<Value>> {
    let term = query.get("q").map(|q| q.to_lowercase()).unwrap_or_default();
    let matches = catalog()
        .into_iter()
        .filter(|product| lowercase_field(product, "name").contains(&term))
        .collect();
    Json(page_of(matches, &query))
}

async fn products_by_category(
    Path(category): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Vec<Value>> {
    let matches = catalog()
        .into_iter()
        .filter(|product| product["category"] == category.as_str())
        .collect();
    Json(page_of(matches, &query))
}

async fn categories() -> Json<Vec<&'static str>> {
    Json(vec!["dry fruits", "oils", "seeds"])
}

async fn product(Path(id): Path<i64>) -> Response {
    find_product(id).map_or_else(
        || (StatusCode::NOT_FOUND, "Product not found").into_response(),
        |product| Json(product).into_response(),
    )
}

async fn login(State(state): State<MockState>, Json(body): Json<Value>) -> Response {
    state.with(|data| data.last_login = Some(body.clone()));

    if body["password"] != VALID_PASSWORD {
        return (StatusCode::UNAUTHORIZED, "Invalid credentials").into_response();
    }
    let email = body["email"].as_str().unwrap_or_default();
    Json(json!({
        "token": format!("jwt-{USER_ID}"),
        "userId": USER_ID,
        "email": email,
        "name": "Asha"
    }))
    .into_response()
}

/// Nested `user` object, unlike login.
async fn signup(Json(body): Json<Value>) -> Response {
    if body["email"] == "taken@example.com" {
        return (StatusCode::CONFLICT, "Email already registered").into_response();
    }
    Json(json!({
        "token": "jwt-new",
        "user": {"id": USER_ID + 1, "email": body["email"], "name": body["name"]}
    }))
    .into_response()
}

async fn logout(headers: HeaderMap) -> Response {
    if !is_authorized(&headers) {
        return unauthorized();
    }
    "Logged out".into_response()
}

async fn cart_items(State(state): State<MockState>, headers: HeaderMap) -> Response {
    if !is_authorized(&headers) {
        return unauthorized();
    }
    Json(state.with(|data| data.cart.clone())).into_response()
}

async fn add_cart_item(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !is_authorized(&headers) {
        return unauthorized();
    }
    let item = state.with(|data| {
        data.next_cart_item_id += 1;
        let product_id = body["productId"].as_i64().unwrap_or_default();
        let item = json!({
            "id": data.next_cart_item_id,
            "productId": product_id,
            "product": find_product(product_id),
            "quantity": body["quantity"],
            "size": body.get("size")
        });
        data.cart.push(item.clone());
        item
    });
    Json(item).into_response()
}

async fn update_cart_item(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !is_authorized(&headers) {
        return unauthorized();
    }
    let quantity: u32 = param(&query, "quantity", 0);
    let updated = state.with(|data| {
        data.cart
            .iter_mut()
            .find(|item| item["id"] == id)
            .map(|item| {
                item["quantity"] = json!(quantity);
                item.clone()
            })
    });
    updated.map_or_else(
        || (StatusCode::NOT_FOUND, "Cart item not found").into_response(),
        |item| Json(item).into_response(),
    )
}

async fn remove_cart_item(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if !is_authorized(&headers) {
        return unauthorized();
    }
    state.with(|data| data.cart.retain(|item| item["id"] != id));
    StatusCode::NO_CONTENT.into_response()
}

async fn clear_cart(State(state): State<MockState>, headers: HeaderMap) -> Response {
    if !is_authorized(&headers) {
        return unauthorized();
    }
    state.with(|data| data.cart.clear());
    StatusCode::OK.into_response()
}

/// Plain-text number.
async fn cart_count(State(state): State<MockState>, headers: HeaderMap) -> Response {
    if !is_authorized(&headers) {
        return unauthorized();
    }
    let count: u64 = state.with(|data| {
        data.cart
            .iter()
            .map(|item| item["quantity"].as_u64().unwrap_or_default())
            .sum()
    });
    count.to_string().into_response()
}

async fn broken() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

fn router(state: MockState) -> Router {
    Router::new()
        .route("/api/products", get(list_products))
        .route("/api/products/featured", get(featured_products))
        .route("/api/products/search", get(search_products))
        .route("/api/products/categories", get(categories))
        .route("/api/products/category/{category}", get(products_by_category))
        .route("/api/products/{id}", get(product))
        .route("/api/auth/login", post(login))
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/logout", post(logout))
        .route("/api/cart/add", post(add_cart_item))
        .route("/api/cart/update/{id}", put(update_cart_item))
        .route("/api/cart/remove/{id}", delete(remove_cart_item))
        .route("/api/cart/clear/{user_id}", delete(clear_cart))
        .route("/api/cart/count/{user_id}", get(cart_count))
        .route("/api/cart/{user_id}", get(cart_items))
        .route("/api/broken", get(broken))
        .layer(middleware::from_fn_with_state(state.clone(), record))
        .with_state(state)
}

// =============================================================================
// MockApi
// =============================================================================

/// A running mock of the GreenCart API.
///
/// The server task stops when the test's runtime shuts down.
#[derive(Debug)]
pub struct MockApi {
    base_url: Url,
    state: MockState,
}

impl MockApi {
    /// Bind `127.0.0.1:0` and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let base_url = Url::parse(&format!("http://{addr}/api"))
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        let state = MockState::default();
        let app = router(state.clone());

        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self { base_url, state })
    }

    /// The API base URL, `http://127.0.0.1:<port>/api`.
    #[must_use]
    pub fn base_url(&self) -> Url {
        self.base_url.clone()
    }

    /// Storefront configuration pointing at this server.
    #[must_use]
    pub fn config(&self) -> StorefrontConfig {
        StorefrontConfig::new(self.base_url())
    }

    /// Every request received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.with(|data| data.requests.clone())
    }

    /// Requests whose path is exactly `path`.
    #[must_use]
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.path == path)
            .collect()
    }

    /// The JSON body of the most recent login attempt.
    #[must_use]
    pub fn last_login(&self) -> Option<Value> {
        self.state.with(|data| data.last_login.clone())
    }
}

// =============================================================================
// RecordingRenderer
// =============================================================================

/// Everything the storefront asked the renderer to do, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderEvent {
    CartCount(u64),
    Cart(CartView),
    Products(Vec<ProductCard>),
    Notice(Notice),
    Redirect(Route),
}

/// A [`Renderer`] that records calls instead of drawing.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub events: Vec<RenderEvent>,
}

impl RecordingRenderer {
    #[must_use]
    pub fn notices(&self) -> Vec<&Notice> {
        self.events
            .iter()
            .filter_map(|event| match event {
                RenderEvent::Notice(notice) => Some(notice),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn redirects(&self) -> Vec<Route> {
        self.events
            .iter()
            .filter_map(|event| match event {
                RenderEvent::Redirect(route) => Some(*route),
                _ => None,
            })
            .collect()
    }

    /// The most recent product grid.
    #[must_use]
    pub fn last_products(&self) -> Option<&[ProductCard]> {
        self.events.iter().rev().find_map(|event| match event {
            RenderEvent::Products(cards) => Some(cards.as_slice()),
            _ => None,
        })
    }

    /// The most recent cart badge count.
    #[must_use]
    pub fn last_count(&self) -> Option<u64> {
        self.events.iter().rev().find_map(|event| match event {
            RenderEvent::CartCount(count) => Some(*count),
            _ => None,
        })
    }
}

impl Renderer for RecordingRenderer {
    fn render_cart_count(&mut self, count: &CartCount) {
        self.events.push(RenderEvent::CartCount(count.count));
    }

    fn render_cart(&mut self, cart: &CartView) {
        self.events.push(RenderEvent::Cart(cart.clone()));
    }

    fn render_products(&mut self, products: &[ProductCard]) {
        self.events.push(RenderEvent::Products(products.to_vec()));
    }

    fn notify(&mut self, notice: &Notice) {
        self.events.push(RenderEvent::Notice(notice.clone()));
    }

    fn redirect(&mut self, route: Route) {
        self.events.push(RenderEvent::Redirect(route));
    }
}
