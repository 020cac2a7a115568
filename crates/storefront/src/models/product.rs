//! Catalog product.

use greencart_core::{ProductId, discount_percent};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::null_as_default;

/// A product as returned by the catalog endpoints.
///
/// Products are read-only on the client. The wishlist stores full snapshots
/// of this type, so it must serialize back into the same shape it was read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<Decimal>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub image_url: String,
    /// Average review score on a 0-5 scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    /// Number of reviews behind `rating`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews: Option<u32>,
}

impl Product {
    /// Percentage off the original price, if the product is marked down.
    #[must_use]
    pub fn discount_percent(&self) -> Option<u8> {
        self.original_price
            .and_then(|original| discount_percent(original, self.price))
    }

    /// The original price, only when it is higher than the current price.
    #[must_use]
    pub fn marked_down_from(&self) -> Option<Decimal> {
        self.original_price.filter(|original| *original > self.price)
    }
}
