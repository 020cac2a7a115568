//! Cart line items and wishlist entries.
//!
//! The stored field names (`id`, `price`, `image`, `size`) match the blobs the
//! original browser storefront wrote, so existing carts rehydrate unchanged.

use greencart_core::ProductId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::null_as_default;
use super::product::Product;

/// A wishlist entry is a snapshot of the product at the time it was saved.
pub type WishlistItem = Product;

/// Identity of a line item: the same product in two sizes is two lines.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CartKey {
    pub product_id: ProductId,
    pub variant: Option<String>,
}

impl CartKey {
    #[must_use]
    pub fn new(product_id: ProductId, variant: Option<&str>) -> Self {
        Self {
            product_id,
            variant: variant.map(str::to_owned),
        }
    }
}

/// One product entry in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(rename = "id")]
    pub product_id: ProductId,
    pub name: String,
    #[serde(rename = "price")]
    pub unit_price: Decimal,
    #[serde(rename = "image", default, deserialize_with = "null_as_default")]
    pub image_ref: String,
    /// Always at least 1 while the item is in a cart.
    pub quantity: u32,
    /// Variant label such as a size; `None` for products without variants.
    #[serde(rename = "size", default)]
    pub variant: Option<String>,
}

impl LineItem {
    /// Build a new line from a catalog product.
    #[must_use]
    pub fn from_product(product: &Product, quantity: u32, variant: Option<&str>) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            unit_price: product.price,
            image_ref: product.image_url.clone(),
            quantity,
            variant: variant.map(str::to_owned),
        }
    }

    /// Whether this line has the given identity.
    #[must_use]
    pub fn matches(&self, product_id: ProductId, variant: Option<&str>) -> bool {
        self.product_id == product_id && self.variant.as_deref() == variant
    }

    #[must_use]
    pub fn key(&self) -> CartKey {
        CartKey::new(self.product_id, self.variant.as_deref())
    }

    /// Unit price times quantity, saturating at the `Decimal` bounds.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price.saturating_mul(Decimal::from(self.quantity))
    }
}

/// Sum of line totals, saturating at the `Decimal` bounds.
#[must_use]
pub fn cart_total(lines: &[LineItem]) -> Decimal {
    lines
        .iter()
        .map(LineItem::line_total)
        .fold(Decimal::ZERO, Decimal::saturating_add)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product() -> Product {
        serde_json::from_str(
            r#"{"id": 8, "name": "Basmati Rice", "price": 180, "imageUrl": "/rice.jpg"}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_from_product() {
        let line = LineItem::from_product(&product(), 2, Some("5kg"));
        assert_eq!(line.product_id, ProductId::new(8));
        assert_eq!(line.image_ref, "/rice.jpg");
        assert_eq!(line.variant.as_deref(), Some("5kg"));
        assert_eq!(line.line_total(), Decimal::from(360));
        assert_eq!(cart_total(&[line.clone(), line]), Decimal::from(720));
    }

    #[test]
    fn test_matches_on_variant() {
        let line = LineItem::from_product(&product(), 1, Some("1kg"));
        assert!(line.matches(ProductId::new(8), Some("1kg")));
        assert!(!line.matches(ProductId::new(8), Some("5kg")));
        assert!(!line.matches(ProductId::new(8), None));
        assert!(!line.matches(ProductId::new(9), Some("1kg")));
    }

    #[test]
    fn test_reads_legacy_browser_format() {
        let json = r#"{"id": 4, "name": "Jaggery", "price": 85.5, "image": "/j.png", "quantity": 3, "size": null}"#;
        let line: LineItem = serde_json::from_str(json).unwrap();

        assert_eq!(line.key(), CartKey::new(ProductId::new(4), None));
        assert_eq!(line.quantity, 3);
        assert_eq!(line.line_total(), Decimal::new(2565, 1));
    }

    #[test]
    fn test_writes_browser_field_names() {
        let line = LineItem::from_product(&product(), 1, None);
        let value = serde_json::to_value(&line).unwrap();

        assert_eq!(value["id"], 8);
        assert_eq!(value["image"], "/rice.jpg");
        assert!(value.get("size").is_some());
        assert!(value.get("product_id").is_none());
    }

    #[test]
    fn test_totals_saturate_instead_of_overflowing() {
        let pricey: Product = serde_json::from_str(
            r#"{"id": 9, "name": "Saffron", "price": "100000000000000000000"}"#,
        )
        .unwrap();
        let line = LineItem::from_product(&pricey, u32::MAX, None);

        assert_eq!(line.line_total(), Decimal::MAX);
        assert_eq!(cart_total(&[line.clone(), line]), Decimal::MAX);
    }
}
