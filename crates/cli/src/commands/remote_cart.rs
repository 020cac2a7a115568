//! Read-only views of the server-side cart.

use greencart_storefront::StorefrontError;
use greencart_storefront::api::RemoteCartItem;

use super::Shop;

fn describe(item: &RemoteCartItem) -> String {
    let product = match (&item.product, item.resolved_product_id()) {
        (Some(product), _) => format!("#{} {}", product.id, product.name),
        (None, Some(id)) => format!("#{id}"),
        (None, None) => "unknown product".to_string(),
    };
    let size = item
        .size
        .as_deref()
        .map(|size| format!(" [{size}]"))
        .unwrap_or_default();
    format!("line {}: {product}{size} x {}", item.id, item.quantity)
}

/// `greencart remote-cart show`
///
/// # Errors
///
/// Returns an error when signed out or if the request fails.
pub async fn show(shop: &mut Shop) -> Result<(), StorefrontError> {
    let items = shop.remote_cart().await?;
    let renderer = shop.renderer_mut();
    if items.is_empty() {
        renderer.line("Server cart is empty");
    }
    for item in &items {
        renderer.line(&describe(item));
    }
    Ok(())
}

/// `greencart remote-cart count`
///
/// # Errors
///
/// Returns an error when signed out or if the request fails.
pub async fn count(shop: &mut Shop) -> Result<(), StorefrontError> {
    let count = shop.remote_cart_count().await?;
    shop.renderer_mut().line(&count.to_string());
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        let item: RemoteCartItem = serde_json::from_value(serde_json::json!({
            "id": 11,
            "product": {"id": 3, "name": "Chia Seeds", "price": 120},
            "quantity": 2,
            "size": "250g"
        }))
        .unwrap();
        assert_eq!(describe(&item), "line 11: #3 Chia Seeds [250g] x 2");

        let item: RemoteCartItem = serde_json::from_value(serde_json::json!({
            "id": 12, "productId": 9, "quantity": 1
        }))
        .unwrap();
        assert_eq!(describe(&item), "line 12: #9 x 1");
    }
}
