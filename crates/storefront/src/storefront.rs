//! The storefront facade.
//!
//! [`Storefront`] wires the device state, the API client and a renderer
//! together. Every operation follows the same shape: mutate or fetch, then
//! redraw, then notify. Failures are reported, shown to the shopper and
//! returned; none of them leave the storefront unusable.

use greencart_core::{Email, ProductId};
use secrecy::SecretString;
use tracing::{info, instrument, warn};

use crate::api::{ApiClient, LoginRequest, RemoteCartItem, SignupRequest};
use crate::catalog::{FEATURED_COUNT, ProductFilter, featured};
use crate::config::StorefrontConfig;
use crate::error::{Result, StorefrontError, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::models::{Product, Session};
use crate::state::{CartChange, ShopState, StateError, WishlistChange};
use crate::storage::KeyValueStore;
use crate::views::{CartCount, CartView, Notice, ProductCard, Renderer, Route};

pub const MSG_ADDED_TO_CART: &str = "Item added to cart successfully!";
pub const MSG_LOGIN_FOR_CART: &str = "Please login to add items to cart";
pub const MSG_ADDED_TO_WISHLIST: &str = "Item added to wishlist!";
pub const MSG_ALREADY_IN_WISHLIST: &str = "Item already in wishlist";
pub const MSG_LOGIN_FOR_WISHLIST: &str = "Please login to add items to wishlist";
pub const MSG_PRODUCTS_UNAVAILABLE: &str =
    "Unable to load products. Please login or try again later.";

/// Storefront over a store `S` and a renderer `R`.
pub struct Storefront<S, R> {
    config: StorefrontConfig,
    api: ApiClient,
    state: ShopState<S>,
    renderer: R,
}

impl<S: KeyValueStore, R: Renderer> Storefront<S, R> {
    /// Build a storefront, restoring state from `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: StorefrontConfig, store: S, renderer: R) -> Result<Self> {
        let api = ApiClient::new(&config)?;
        Ok(Self::with_client(config, api, store, renderer))
    }

    /// Build a storefront around an existing client.
    ///
    /// Restores state, hands a restored session's token to the client and
    /// draws the cart badge.
    pub fn with_client(config: StorefrontConfig, api: ApiClient, store: S, renderer: R) -> Self {
        let state = ShopState::restore(store);

        if let Some(session) = state.session() {
            api.set_token(session.token.clone());
            set_sentry_user(&session.user_id, session.email.as_ref().map(Email::as_str));
        }

        let mut storefront = Self {
            config,
            api,
            state,
            renderer,
        };
        storefront.render_cart_count();
        storefront
    }

    #[must_use]
    pub const fn config(&self) -> &StorefrontConfig {
        &self.config
    }

    #[must_use]
    pub const fn api(&self) -> &ApiClient {
        &self.api
    }

    #[must_use]
    pub const fn state(&self) -> &ShopState<S> {
        &self.state
    }

    #[must_use]
    pub const fn renderer(&self) -> &R {
        &self.renderer
    }

    pub const fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    #[must_use]
    pub fn into_renderer(self) -> R {
        self.renderer
    }

    // =========================================================================
    // Failure handling
    // =========================================================================

    /// Report, show and hand back a failure.
    ///
    /// A missing session shows `login_message` when given, then redirects to
    /// the login page.
    fn fail(&mut self, err: StorefrontError, login_message: Option<&str>) -> StorefrontError {
        err.report();

        let notice = match login_message {
            Some(message) if err.is_auth_required() => Notice::error(message),
            _ => err.notice(),
        };
        self.renderer.notify(&notice);

        if err.is_auth_required() {
            self.renderer.redirect(Route::Login);
        }
        err
    }

    fn settle<T>(&mut self, result: Result<T>, login_message: Option<&str>) -> Result<T> {
        result.map_err(|err| self.fail(err, login_message))
    }

    fn render_cart_count(&mut self) {
        let count = CartCount {
            count: self.state.item_count(),
        };
        self.renderer.render_cart_count(&count);
    }

    fn render_cart(&mut self) {
        let view = CartView::from(self.state.cart());
        self.renderer.render_cart(&view);
    }

    // =========================================================================
    // Auth
    // =========================================================================

    fn start_session(&mut self, session: Session) -> Result<()> {
        self.api.set_token(session.token.clone());
        set_sentry_user(&session.user_id, session.email.as_ref().map(Email::as_str));
        info!(user_id = %session.user_id, "Signed in");

        let saved = self.state.sign_in(session);
        self.render_cart_count();
        saved.map_err(StorefrontError::from)
    }

    async fn try_login(&mut self, email: &str, password: SecretString) -> Result<()> {
        let email = Email::parse(email)?;
        add_breadcrumb("auth", "Login attempt", None);

        let response = self
            .api
            .login(&LoginRequest {
                email: email.clone(),
                password,
            })
            .await
            .map_err(StorefrontError::from_auth)?;
        let mut session = response
            .into_session()
            .ok_or(StorefrontError::IncompleteLogin)?;
        session.email.get_or_insert(email);

        self.start_session(session)
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed email, rejected credentials, or a
    /// failure to reach the server or save the session.
    #[instrument(skip_all)]
    pub async fn login(&mut self, email: &str, password: SecretString) -> Result<()> {
        let result = self.try_login(email, password).await;
        self.settle(result, None)?;

        self.renderer.notify(&Notice::success("Login successful!"));
        self.renderer.redirect(Route::Home);
        Ok(())
    }

    async fn try_signup(&mut self, request: &SignupRequest) -> Result<()> {
        add_breadcrumb("auth", "Signup attempt", None);
        let response = self
            .api
            .signup(request)
            .await
            .map_err(StorefrontError::from_auth)?;
        let mut session = response
            .into_session()
            .ok_or(StorefrontError::IncompleteLogin)?;
        session.email.get_or_insert_with(|| request.email.clone());
        if session.name.is_none() {
            session.name = Some(request.name.clone());
        }

        self.start_session(session)
    }

    /// Create an account and sign in with it.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the account or the session
    /// could not be saved.
    #[instrument(skip_all, fields(email = %request.email))]
    pub async fn signup(&mut self, request: &SignupRequest) -> Result<()> {
        let result = self.try_signup(request).await;
        self.settle(result, None)?;

        self.renderer.notify(&Notice::success("Account created successfully!"));
        self.renderer.redirect(Route::Home);
        Ok(())
    }

    /// Sign out locally, telling the server first.
    ///
    /// A failed server call is logged and does not stop the local logout.
    ///
    /// # Errors
    ///
    /// Returns an error if the local state could not be removed from the
    /// store. The in-memory state is cleared either way.
    #[instrument(skip(self))]
    pub async fn logout(&mut self) -> Result<()> {
        if self.state.is_authenticated()
            && let Err(e) = self.api.logout().await
        {
            warn!(error = %e, "Server-side logout failed");
        }

        self.api.clear_token();
        clear_sentry_user();
        add_breadcrumb("auth", "Logged out", None);

        let cleared = self.state.logout().map_err(StorefrontError::from);
        self.render_cart_count();
        self.render_cart();
        self.settle(cleared, None)?;

        self.renderer.redirect(Route::Home);
        Ok(())
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Add `quantity` of `product` to the cart.
    ///
    /// # Errors
    ///
    /// Returns an error when signed out, for a zero quantity, or if the cart
    /// could not be saved.
    pub fn add_to_cart(
        &mut self,
        product: &Product,
        quantity: u32,
        variant: Option<&str>,
    ) -> Result<CartChange> {
        let result = self
            .state
            .add_to_cart(product, quantity, variant)
            .map_err(StorefrontError::from);
        let changed = !matches!(
            result,
            Err(StorefrontError::State(
                StateError::AuthRequired | StateError::InvalidQuantity(_)
            ))
        );
        if changed {
            self.render_cart_count();
        }
        let change = self.settle(result, Some(MSG_LOGIN_FOR_CART))?;

        let product_id = product.id.to_string();
        add_breadcrumb("cart", "Added to cart", Some(&[("product_id", &product_id)]));
        self.renderer.notify(&Notice::success(MSG_ADDED_TO_CART));
        Ok(change)
    }

    /// Fetch a product by id and add it to the cart.
    ///
    /// # Errors
    ///
    /// As [`Self::add_to_cart`], plus failures fetching the product.
    pub async fn add_product_to_cart(
        &mut self,
        id: ProductId,
        quantity: u32,
        variant: Option<&str>,
    ) -> Result<CartChange> {
        if !self.state.is_authenticated() {
            let err = StorefrontError::from(StateError::AuthRequired);
            return Err(self.fail(err, Some(MSG_LOGIN_FOR_CART)));
        }

        let fetched = self.api.get_product(id).await.map_err(StorefrontError::from);
        let product = self.settle(fetched, None)?;
        self.add_to_cart(&product, quantity, variant)
    }

    /// Remove a cart line.
    ///
    /// # Errors
    ///
    /// Returns an error when signed out or if the cart could not be saved.
    pub fn remove_from_cart(
        &mut self,
        product_id: ProductId,
        variant: Option<&str>,
    ) -> Result<CartChange> {
        let result = self
            .state
            .remove_from_cart(product_id, variant)
            .map_err(StorefrontError::from);
        let change = self.settle(result, None)?;

        self.render_cart_count();
        self.render_cart();
        self.notify_cart_change(change);
        Ok(change)
    }

    /// Set a line's quantity; zero or less removes it.
    ///
    /// # Errors
    ///
    /// Returns an error when signed out or if the cart could not be saved.
    pub fn update_quantity(
        &mut self,
        product_id: ProductId,
        variant: Option<&str>,
        quantity: i64,
    ) -> Result<CartChange> {
        let result = self
            .state
            .update_quantity(product_id, variant, quantity)
            .map_err(StorefrontError::from);
        let change = self.settle(result, None)?;

        self.render_cart_count();
        self.render_cart();
        self.notify_cart_change(change);
        Ok(change)
    }

    fn notify_cart_change(&mut self, change: CartChange) {
        let notice = match change {
            CartChange::Added { .. } | CartChange::Incremented { .. } => {
                Notice::success(MSG_ADDED_TO_CART)
            }
            CartChange::Updated { .. } => Notice::success("Cart updated"),
            CartChange::Removed => Notice::info("Item removed from cart"),
            CartChange::NotInCart => Notice::info("Item is not in your cart"),
        };
        self.renderer.notify(&notice);
    }

    /// Draw the cart.
    pub fn show_cart(&mut self) {
        self.render_cart();
    }

    // =========================================================================
    // Wishlist
    // =========================================================================

    /// Save `product` to the wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error when signed out or if the wishlist could not be saved.
    pub fn add_to_wishlist(&mut self, product: &Product) -> Result<WishlistChange> {
        let result = self
            .state
            .add_to_wishlist(product)
            .map_err(StorefrontError::from);
        let change = self.settle(result, Some(MSG_LOGIN_FOR_WISHLIST))?;

        let notice = match change {
            WishlistChange::AlreadyPresent => Notice::info(MSG_ALREADY_IN_WISHLIST),
            _ => Notice::success(MSG_ADDED_TO_WISHLIST),
        };
        self.renderer.notify(&notice);
        Ok(change)
    }

    /// Fetch a product by id and save it to the wishlist.
    ///
    /// # Errors
    ///
    /// As [`Self::add_to_wishlist`], plus failures fetching the product.
    pub async fn add_product_to_wishlist(&mut self, id: ProductId) -> Result<WishlistChange> {
        if !self.state.is_authenticated() {
            let err = StorefrontError::from(StateError::AuthRequired);
            return Err(self.fail(err, Some(MSG_LOGIN_FOR_WISHLIST)));
        }

        let fetched = self.api.get_product(id).await.map_err(StorefrontError::from);
        let product = self.settle(fetched, None)?;
        self.add_to_wishlist(&product)
    }

    /// Drop a product from the wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error when signed out or if the wishlist could not be saved.
    pub fn remove_from_wishlist(&mut self, product_id: ProductId) -> Result<WishlistChange> {
        let result = self
            .state
            .remove_from_wishlist(product_id)
            .map_err(StorefrontError::from);
        let change = self.settle(result, None)?;

        let notice = match change {
            WishlistChange::NotInWishlist => Notice::info("Item is not in your wishlist"),
            _ => Notice::info("Item removed from wishlist"),
        };
        self.renderer.notify(&notice);
        self.show_wishlist();
        Ok(change)
    }

    /// Draw the wishlist as product cards.
    pub fn show_wishlist(&mut self) {
        let cards: Vec<ProductCard> = self.state.wishlist().iter().map(ProductCard::from).collect();
        self.renderer.render_products(&cards);
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    fn products_unavailable(&mut self, err: StorefrontError) -> StorefrontError {
        err.report();
        self.renderer.render_products(&[]);
        self.renderer.notify(&Notice::error(MSG_PRODUCTS_UNAVAILABLE));
        err
    }

    /// Draw the best-rated featured products.
    ///
    /// # Errors
    ///
    /// Returns an error if the products could not be fetched; an empty grid
    /// is drawn in that case.
    #[instrument(skip(self))]
    pub async fn show_featured(&mut self) -> Result<Vec<Product>> {
        match self.api.get_featured_products(self.config.featured_limit).await {
            Ok(products) => {
                let top = featured(&products, FEATURED_COUNT);
                let cards: Vec<ProductCard> = top.iter().map(ProductCard::from).collect();
                self.renderer.render_products(&cards);
                Ok(top)
            }
            Err(e) => Err(self.products_unavailable(e.into())),
        }
    }

    /// Draw the catalog after applying `filter`.
    ///
    /// A category filter is resolved by the server; price, search and sort
    /// are applied to the fetched page.
    ///
    /// # Errors
    ///
    /// Returns an error if the products could not be fetched; an empty grid
    /// is drawn in that case.
    #[instrument(skip(self))]
    pub async fn show_products(&mut self, filter: &ProductFilter) -> Result<Vec<Product>> {
        let page_size = self.config.page_size;
        let fetched = match filter.category.as_deref().filter(|c| !c.is_empty()) {
            Some(category) => {
                self.api
                    .get_products_by_category(category, 0, page_size)
                    .await
            }
            None => {
                self.api
                    .get_products(0, page_size, filter.sort.api_field())
                    .await
            }
        };

        match fetched {
            Ok(products) => {
                let shown = filter.apply(&products);
                let cards: Vec<ProductCard> = shown.iter().map(ProductCard::from).collect();
                self.renderer.render_products(&cards);
                Ok(shown)
            }
            Err(e) => Err(self.products_unavailable(e.into())),
        }
    }

    /// Draw a single product.
    ///
    /// # Errors
    ///
    /// Returns an error if the product could not be fetched.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn show_product(&mut self, id: ProductId) -> Result<Product> {
        let fetched = self.api.get_product(id).await.map_err(StorefrontError::from);
        let product = self.settle(fetched, None)?;
        self.renderer.render_products(&[ProductCard::from(&product)]);
        Ok(product)
    }

    /// All category names.
    ///
    /// # Errors
    ///
    /// Returns an error if the categories could not be fetched.
    pub async fn categories(&mut self) -> Result<Vec<String>> {
        let fetched = self.api.get_categories().await.map_err(StorefrontError::from);
        self.settle(fetched, None)
    }

    // =========================================================================
    // Server-side cart
    // =========================================================================

    fn require_session(&mut self) -> Result<Session> {
        match self.state.session() {
            Some(session) => Ok(session.clone()),
            None => Err(self.fail(StateError::AuthRequired.into(), None)),
        }
    }

    /// Lines of the signed-in user's server-side cart.
    ///
    /// # Errors
    ///
    /// Returns an error when signed out or if the request fails.
    pub async fn remote_cart(&mut self) -> Result<Vec<RemoteCartItem>> {
        let session = self.require_session()?;
        let fetched = self
            .api
            .get_cart_items(session.user_id)
            .await
            .map_err(StorefrontError::from);
        self.settle(fetched, None)
    }

    /// Item count of the signed-in user's server-side cart.
    ///
    /// # Errors
    ///
    /// Returns an error when signed out or if the request fails.
    pub async fn remote_cart_count(&mut self) -> Result<u64> {
        let session = self.require_session()?;
        let fetched = self
            .api
            .get_cart_item_count(session.user_id)
            .await
            .map_err(StorefrontError::from);
        self.settle(fetched, None)
    }

    /// Empty the signed-in user's server-side cart.
    ///
    /// # Errors
    ///
    /// Returns an error when signed out or if the request fails.
    pub async fn clear_remote_cart(&mut self) -> Result<()> {
        let session = self.require_session()?;
        let cleared = self
            .api
            .clear_cart(session.user_id)
            .await
            .map_err(StorefrontError::from);
        self.settle(cleared, None)?;
        self.renderer.notify(&Notice::success("Cart cleared"));
        Ok(())
    }
}
