//! View-models handed to the renderer.
//!
//! Everything here is plain data already formatted for display. Renderers
//! never see raw products or line items, so they never build markup from
//! unescaped catalog strings.

use greencart_core::{Price, ProductId};
use rust_decimal::Decimal;

use crate::models::{LineItem, Product, cart_total};

// =============================================================================
// Notices & Routing
// =============================================================================

/// Severity of a transient message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// A transient message shown to the shopper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Pages the storefront can ask the renderer to navigate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
}

/// The presentation side of the storefront.
///
/// Called after every state change with fresh view-models.
pub trait Renderer {
    /// Update the cart badge.
    fn render_cart_count(&mut self, count: &CartCount);

    /// Draw the full cart.
    fn render_cart(&mut self, cart: &CartView);

    /// Draw a grid of product cards. An empty slice is the empty state.
    fn render_products(&mut self, products: &[ProductCard]);

    /// Show a transient message.
    fn notify(&mut self, notice: &Notice);

    /// Navigate to another page.
    fn redirect(&mut self, route: Route);
}

// =============================================================================
// Product Cards
// =============================================================================

/// One of the five rating stars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Star {
    Full,
    Half,
    Empty,
}

/// Five stars for a 0-5 rating. Star `i` is half when `i - 0.5 <= rating < i`.
#[must_use]
pub fn star_rating(rating: f64) -> [Star; 5] {
    let mut stars = [Star::Empty; 5];
    for (i, star) in (1_u8..=5).zip(stars.iter_mut()) {
        let position = f64::from(i);
        if position <= rating {
            *star = Star::Full;
        } else if position - 0.5 <= rating {
            *star = Star::Half;
        }
    }
    stars
}

/// Product card display data.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductCard {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub category: String,
    pub image_url: String,
    pub price: String,
    /// Struck-through original price, only for marked-down products.
    pub original_price: Option<String>,
    /// Percentage for the "N% OFF" badge.
    pub discount_percent: Option<u8>,
    pub stars: [Star; 5],
    pub review_count: u32,
}

impl From<&Product> for ProductCard {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            description: product.description.clone(),
            category: product.category.clone(),
            image_url: product.image_url.clone(),
            price: Price::inr(product.price).display(),
            original_price: product
                .marked_down_from()
                .map(|original| Price::inr(original).display()),
            discount_percent: product.discount_percent(),
            stars: star_rating(product.rating.unwrap_or(0.0)),
            review_count: product.reviews.unwrap_or(0),
        }
    }
}

impl ProductCard {
    /// Badge text such as `20% OFF`.
    #[must_use]
    pub fn discount_badge(&self) -> Option<String> {
        self.discount_percent.map(|percent| format!("{percent}% OFF"))
    }
}

// =============================================================================
// Cart
// =============================================================================

/// Cart line display data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItemView {
    pub product_id: ProductId,
    pub name: String,
    pub variant: Option<String>,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
    pub image_url: String,
}

impl From<&LineItem> for CartItemView {
    fn from(line: &LineItem) -> Self {
        Self {
            product_id: line.product_id,
            name: line.name.clone(),
            variant: line.variant.clone(),
            quantity: line.quantity,
            price: Price::inr(line.unit_price).display(),
            line_price: Price::inr(line.line_total()).display(),
            image_url: line.image_ref.clone(),
        }
    }
}

/// Cart display data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub item_count: u64,
}

impl CartView {
    /// Create an empty cart.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            subtotal: Price::inr(Decimal::ZERO).display(),
            item_count: 0,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl From<&[LineItem]> for CartView {
    fn from(lines: &[LineItem]) -> Self {
        let subtotal = cart_total(lines);
        Self {
            items: lines.iter().map(CartItemView::from).collect(),
            subtotal: Price::inr(subtotal).display(),
            item_count: lines.iter().map(|line| u64::from(line.quantity)).sum(),
        }
    }
}

/// Cart badge display data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartCount {
    pub count: u64,
}
