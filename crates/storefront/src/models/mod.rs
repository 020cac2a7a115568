//! Domain models for the storefront client.
//!
//! - [`product`] - Catalog products as served by the remote API
//! - [`cart`] - Cart line items and wishlist entries kept on the device
//! - [`session`] - The signed-in user's opaque session

pub mod cart;
pub mod product;
pub mod session;

pub use cart::{CartKey, LineItem, WishlistItem, cart_total};
pub use product::Product;
pub use session::Session;

use serde::{Deserialize, Deserializer};

/// Deserialize a field that may be `null` or missing as its default value.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
