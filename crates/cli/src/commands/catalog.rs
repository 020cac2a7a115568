//! Catalog browsing commands.

use greencart_core::ProductId;
use greencart_storefront::StorefrontError;
use greencart_storefront::catalog::{PriceRange, ProductFilter, SortKey};

use super::Shop;

/// `greencart products`
///
/// # Errors
///
/// Returns an error if the products could not be fetched.
pub async fn products(
    shop: &mut Shop,
    category: Option<String>,
    search: Option<String>,
    price_range: Option<PriceRange>,
    sort: SortKey,
) -> Result<(), StorefrontError> {
    let filter = ProductFilter {
        category,
        price_range,
        search,
        sort,
    };
    shop.show_products(&filter).await?;
    Ok(())
}

/// `greencart featured`
///
/// # Errors
///
/// Returns an error if the products could not be fetched.
pub async fn featured(shop: &mut Shop) -> Result<(), StorefrontError> {
    shop.show_featured().await?;
    Ok(())
}

/// `greencart product <id>`
///
/// Prints the description below the card.
///
/// # Errors
///
/// Returns an error if the product could not be fetched.
pub async fn product(shop: &mut Shop, id: ProductId) -> Result<(), StorefrontError> {
    let product = shop.show_product(id).await?;
    if !product.description.is_empty() {
        shop.renderer_mut().line("");
        shop.renderer_mut().line(&product.description);
    }
    Ok(())
}

/// `greencart categories`
///
/// # Errors
///
/// Returns an error if the categories could not be fetched.
pub async fn categories(shop: &mut Shop) -> Result<(), StorefrontError> {
    let categories = shop.categories().await?;
    let renderer = shop.renderer_mut();
    if categories.is_empty() {
        renderer.line("No categories found");
    }
    for category in &categories {
        renderer.line(category);
    }
    Ok(())
}
