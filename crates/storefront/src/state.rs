//! Cart, wishlist and session state kept on the device.
//!
//! [`ShopState`] owns the in-memory lists and mirrors every change to the
//! injected store. Each mutation is one synchronous find, mutate and persist
//! step on `&mut self`, so no other operation can observe a half-applied change.
//! Rendering is the caller's job: mutations return what changed and the
//! caller decides what to redraw.

use greencart_core::ProductId;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

use crate::models::{LineItem, Product, Session, WishlistItem, cart_total};
use crate::storage::{KeyValueStore, Persistence, StorageError, keys};

/// Errors from cart and wishlist mutations.
#[derive(Debug, Error)]
pub enum StateError {
    /// No active session. Nothing was changed.
    #[error("login required")]
    AuthRequired,

    /// Quantity to add must be at least 1. Nothing was changed.
    #[error("quantity must be at least 1 (got {0})")]
    InvalidQuantity(i64),

    /// The in-memory change was applied but could not be saved.
    #[error("change applied but not saved: {0}")]
    Storage(#[from] StorageError),
}

/// What a cart mutation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartChange {
    /// A new line was appended with this quantity.
    Added { quantity: u32 },
    /// An existing line's quantity grew to this value.
    Incremented { quantity: u32 },
    /// An existing line's quantity was set to this value.
    Updated { quantity: u32 },
    /// The matching line was deleted.
    Removed,
    /// No line had the given identity.
    NotInCart,
}

/// What a wishlist mutation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WishlistChange {
    Added,
    AlreadyPresent,
    Removed,
    NotInWishlist,
}

/// The client's cart, wishlist and session.
#[derive(Debug)]
pub struct ShopState<S> {
    persistence: Persistence<S>,
    session: Option<Session>,
    cart: Vec<LineItem>,
    wishlist: Vec<WishlistItem>,
}

impl<S: KeyValueStore> ShopState<S> {
    /// Empty, signed-out state over `store`. Nothing is read from the store.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self {
            persistence: Persistence::new(store),
            session: None,
            cart: Vec::new(),
            wishlist: Vec::new(),
        }
    }

    /// Rehydrate session, cart and wishlist from `store`.
    ///
    /// Missing or malformed blobs load as empty. A stored cart with duplicate
    /// lines or zero quantities is normalized.
    #[must_use]
    pub fn restore(store: S) -> Self {
        let persistence = Persistence::new(store);

        let session = persistence.load::<Session>(keys::CURRENT_USER);
        let cart = normalize_cart(
            persistence
                .load::<Vec<LineItem>>(keys::CART)
                .unwrap_or_default(),
        );
        let wishlist = normalize_wishlist(
            persistence
                .load::<Vec<WishlistItem>>(keys::WISHLIST)
                .unwrap_or_default(),
        );

        debug!(
            signed_in = session.is_some(),
            cart_lines = cart.len(),
            wishlist_items = wishlist.len(),
            "Restored local state"
        );

        Self {
            persistence,
            session,
            cart,
            wishlist,
        }
    }

    // =========================================================================
    // Session
    // =========================================================================

    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    /// Enter the authenticated state and persist the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session could not be saved. The session is
    /// active in memory either way.
    pub fn sign_in(&mut self, session: Session) -> Result<(), StorageError> {
        debug!(user_id = %session.user_id, "Signing in");
        let result = self.persistence.save(keys::CURRENT_USER, &session);
        self.session = Some(session);
        result
    }

    /// Clear session, cart and wishlist from memory and from the store.
    ///
    /// # Errors
    ///
    /// Returns the first storage error. Memory is cleared regardless, and
    /// every key is attempted.
    pub fn logout(&mut self) -> Result<(), StorageError> {
        self.session = None;
        self.cart.clear();
        self.wishlist.clear();

        let results = [
            self.persistence.remove(keys::CURRENT_USER),
            self.persistence.remove(keys::CART),
            self.persistence.remove(keys::WISHLIST),
        ];
        results.into_iter().collect()
    }

    // =========================================================================
    // Cart
    // =========================================================================

    #[must_use]
    pub fn cart(&self) -> &[LineItem] {
        &self.cart
    }

    /// Add `quantity` of `product` in the given variant.
    ///
    /// Merges into the existing line with the same identity, otherwise
    /// appends a new line.
    ///
    /// # Errors
    ///
    /// [`StateError::AuthRequired`] when signed out and
    /// [`StateError::InvalidQuantity`] for a zero quantity; neither changes
    /// anything. [`StateError::Storage`] if the change could not be saved.
    pub fn add_to_cart(
        &mut self,
        product: &Product,
        quantity: u32,
        variant: Option<&str>,
    ) -> Result<CartChange, StateError> {
        self.require_session()?;
        if quantity == 0 {
            return Err(StateError::InvalidQuantity(0));
        }

        let change = if let Some(line) = self
            .cart
            .iter_mut()
            .find(|line| line.matches(product.id, variant))
        {
            line.quantity = line.quantity.saturating_add(quantity);
            CartChange::Incremented {
                quantity: line.quantity,
            }
        } else {
            self.cart
                .push(LineItem::from_product(product, quantity, variant));
            CartChange::Added { quantity }
        };

        debug!(product_id = %product.id, ?variant, ?change, "Cart add");
        self.persist_cart()?;
        Ok(change)
    }

    /// Remove the line with the given identity.
    ///
    /// # Errors
    ///
    /// [`StateError::AuthRequired`] when signed out, [`StateError::Storage`]
    /// if the change could not be saved.
    pub fn remove_from_cart(
        &mut self,
        product_id: ProductId,
        variant: Option<&str>,
    ) -> Result<CartChange, StateError> {
        self.require_session()?;

        let before = self.cart.len();
        self.cart.retain(|line| !line.matches(product_id, variant));
        if self.cart.len() == before {
            return Ok(CartChange::NotInCart);
        }

        debug!(%product_id, ?variant, "Cart remove");
        self.persist_cart()?;
        Ok(CartChange::Removed)
    }

    /// Set the quantity of an existing line. Zero or less removes it.
    ///
    /// There is no upper bound; stock limits are enforced by the server.
    ///
    /// # Errors
    ///
    /// [`StateError::AuthRequired`] when signed out, [`StateError::Storage`]
    /// if the change could not be saved.
    pub fn update_quantity(
        &mut self,
        product_id: ProductId,
        variant: Option<&str>,
        new_quantity: i64,
    ) -> Result<CartChange, StateError> {
        self.require_session()?;

        if new_quantity <= 0 {
            return self.remove_from_cart(product_id, variant);
        }
        let quantity = u32::try_from(new_quantity).unwrap_or(u32::MAX);

        let Some(line) = self
            .cart
            .iter_mut()
            .find(|line| line.matches(product_id, variant))
        else {
            return Ok(CartChange::NotInCart);
        };
        line.quantity = quantity;

        debug!(%product_id, ?variant, quantity, "Cart quantity update");
        self.persist_cart()?;
        Ok(CartChange::Updated { quantity })
    }

    /// Sum of unit price times quantity over all lines.
    #[must_use]
    pub fn total(&self) -> Decimal {
        cart_total(&self.cart)
    }

    /// Total number of units in the cart, for the badge.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.cart.iter().map(|line| u64::from(line.quantity)).sum()
    }

    // =========================================================================
    // Wishlist
    // =========================================================================

    #[must_use]
    pub fn wishlist(&self) -> &[WishlistItem] {
        &self.wishlist
    }

    /// Save a snapshot of `product`. Adding a product twice is a no-op.
    ///
    /// # Errors
    ///
    /// [`StateError::AuthRequired`] when signed out, [`StateError::Storage`]
    /// if the change could not be saved.
    pub fn add_to_wishlist(&mut self, product: &Product) -> Result<WishlistChange, StateError> {
        self.require_session()?;

        if self.is_in_wishlist(product.id) {
            return Ok(WishlistChange::AlreadyPresent);
        }
        self.wishlist.push(product.clone());

        debug!(product_id = %product.id, "Wishlist add");
        self.persist_wishlist()?;
        Ok(WishlistChange::Added)
    }

    /// Drop the wishlist entry for `product_id`.
    ///
    /// # Errors
    ///
    /// [`StateError::AuthRequired`] when signed out, [`StateError::Storage`]
    /// if the change could not be saved.
    pub fn remove_from_wishlist(
        &mut self,
        product_id: ProductId,
    ) -> Result<WishlistChange, StateError> {
        self.require_session()?;

        let before = self.wishlist.len();
        self.wishlist.retain(|item| item.id != product_id);
        if self.wishlist.len() == before {
            return Ok(WishlistChange::NotInWishlist);
        }

        debug!(%product_id, "Wishlist remove");
        self.persist_wishlist()?;
        Ok(WishlistChange::Removed)
    }

    #[must_use]
    pub fn is_in_wishlist(&self, product_id: ProductId) -> bool {
        self.wishlist.iter().any(|item| item.id == product_id)
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// The persistence adapter, for inspecting what was saved.
    #[must_use]
    pub const fn persistence(&self) -> &Persistence<S> {
        &self.persistence
    }

    /// Give back the underlying store.
    #[must_use]
    pub fn into_store(self) -> S {
        self.persistence.into_store()
    }

    const fn require_session(&self) -> Result<(), StateError> {
        if self.session.is_some() {
            Ok(())
        } else {
            Err(StateError::AuthRequired)
        }
    }

    fn persist_cart(&mut self) -> Result<(), StorageError> {
        self.persistence.save(keys::CART, &self.cart)
    }

    fn persist_wishlist(&mut self) -> Result<(), StorageError> {
        self.persistence.save(keys::WISHLIST, &self.wishlist)
    }
}

/// Drop zero-quantity lines and merge lines sharing an identity, keeping the
/// position of the first occurrence.
fn normalize_cart(lines: Vec<LineItem>) -> Vec<LineItem> {
    let mut merged: Vec<LineItem> = Vec::with_capacity(lines.len());

    for line in lines.into_iter().filter(|line| line.quantity > 0) {
        if let Some(existing) = merged
            .iter_mut()
            .find(|existing| existing.matches(line.product_id, line.variant.as_deref()))
        {
            existing.quantity = existing.quantity.saturating_add(line.quantity);
        } else {
            merged.push(line);
        }
    }

    merged
}

/// Keep the first snapshot of each product.
fn normalize_wishlist(items: Vec<WishlistItem>) -> Vec<WishlistItem> {
    let mut seen = Vec::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| {
            if seen.contains(&item.id) {
                false
            } else {
                seen.push(item.id);
                true
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use greencart_core::UserId;
    use secrecy::SecretString;

    use super::*;
    use crate::storage::{FailingStore, MemoryStore};

    fn product(id: i64, price: i64) -> Product {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "name": format!("Product {id}"),
            "price": price,
            "imageUrl": format!("/img/{id}.jpg"),
        }))
        .unwrap()
    }

    fn signed_in() -> ShopState<MemoryStore> {
        let mut state = ShopState::new(MemoryStore::new());
        state
            .sign_in(Session::new(UserId::new(1), SecretString::from("tok")))
            .unwrap();
        state
    }

    #[test]
    fn test_add_same_key_increments() {
        let mut state = signed_in();
        let p = product(1, 10);

        assert_eq!(
            state.add_to_cart(&p, 2, None).unwrap(),
            CartChange::Added { quantity: 2 }
        );
        assert_eq!(
            state.add_to_cart(&p, 3, None).unwrap(),
            CartChange::Incremented { quantity: 5 }
        );

        assert_eq!(state.cart().len(), 1);
        assert_eq!(state.cart()[0].quantity, 5);
    }

    #[test]
    fn test_variants_are_separate_lines() {
        let mut state = signed_in();
        let p = product(1, 10);

        state.add_to_cart(&p, 1, Some("S")).unwrap();
        state.add_to_cart(&p, 1, Some("L")).unwrap();
        state.add_to_cart(&p, 1, None).unwrap();
        state.add_to_cart(&p, 4, Some("L")).unwrap();

        let quantities: Vec<_> = state
            .cart()
            .iter()
            .map(|line| (line.variant.clone(), line.quantity))
            .collect();
        assert_eq!(
            quantities,
            vec![
                (Some("S".to_string()), 1),
                (Some("L".to_string()), 5),
                (None, 1)
            ]
        );
        assert_eq!(state.item_count(), 7);
    }

    #[test]
    fn test_add_zero_quantity_rejected() {
        let mut state = signed_in();
        let result = state.add_to_cart(&product(1, 10), 0, None);

        assert!(matches!(result, Err(StateError::InvalidQuantity(0))));
        assert!(state.cart().is_empty());
        assert!(state.persistence().load::<Vec<LineItem>>(keys::CART).is_none());
    }

    #[test]
    fn test_update_to_zero_removes() {
        let mut state = signed_in();
        state.add_to_cart(&product(1, 10), 1, None).unwrap();

        assert_eq!(
            state.update_quantity(ProductId::new(1), None, 0).unwrap(),
            CartChange::Removed
        );
        assert!(state.cart().is_empty());
    }

    #[test]
    fn test_update_negative_removes() {
        let mut state = signed_in();
        state.add_to_cart(&product(1, 10), 4, Some("M")).unwrap();

        state.update_quantity(ProductId::new(1), Some("M"), -2).unwrap();
        assert!(state.cart().is_empty());
    }

    #[test]
    fn test_update_sets_quantity() {
        let mut state = signed_in();
        state.add_to_cart(&product(1, 10), 1, None).unwrap();

        assert_eq!(
            state.update_quantity(ProductId::new(1), None, 12).unwrap(),
            CartChange::Updated { quantity: 12 }
        );
        assert_eq!(state.item_count(), 12);

        let saved: Vec<LineItem> = state.persistence().load(keys::CART).unwrap();
        assert_eq!(saved[0].quantity, 12);
    }

    #[test]
    fn test_update_missing_line_is_noop() {
        let mut state = signed_in();
        state.add_to_cart(&product(1, 10), 1, Some("S")).unwrap();

        assert_eq!(
            state.update_quantity(ProductId::new(1), Some("L"), 3).unwrap(),
            CartChange::NotInCart
        );
        assert_eq!(state.cart()[0].quantity, 1);
    }

    #[test]
    fn test_remove_only_matching_variant() {
        let mut state = signed_in();
        let p = product(2, 5);
        state.add_to_cart(&p, 1, Some("S")).unwrap();
        state.add_to_cart(&p, 1, Some("L")).unwrap();

        assert_eq!(
            state.remove_from_cart(ProductId::new(2), Some("S")).unwrap(),
            CartChange::Removed
        );
        assert_eq!(
            state.remove_from_cart(ProductId::new(2), Some("S")).unwrap(),
            CartChange::NotInCart
        );
        assert_eq!(state.cart().len(), 1);
        assert_eq!(state.cart()[0].variant.as_deref(), Some("L"));
    }

    #[test]
    fn test_total() {
        let mut state = signed_in();
        state.add_to_cart(&product(1, 10), 2, None).unwrap();
        state.add_to_cart(&product(2, 5), 3, None).unwrap();

        assert_eq!(state.total(), Decimal::from(35));
        assert_eq!(state.item_count(), 5);
    }

    #[test]
    fn test_total_empty_cart() {
        let state = ShopState::new(MemoryStore::new());
        assert_eq!(state.total(), Decimal::ZERO);
        assert_eq!(state.item_count(), 0);
    }

    #[test]
    fn test_wishlist_idempotent() {
        let mut state = signed_in();
        let p = product(3, 99);

        assert_eq!(state.add_to_wishlist(&p).unwrap(), WishlistChange::Added);
        assert_eq!(
            state.add_to_wishlist(&p).unwrap(),
            WishlistChange::AlreadyPresent
        );
        assert_eq!(state.wishlist().len(), 1);
        assert!(state.is_in_wishlist(ProductId::new(3)));
    }

    #[test]
    fn test_wishlist_remove() {
        let mut state = signed_in();
        state.add_to_wishlist(&product(3, 99)).unwrap();

        assert_eq!(
            state.remove_from_wishlist(ProductId::new(3)).unwrap(),
            WishlistChange::Removed
        );
        assert_eq!(
            state.remove_from_wishlist(ProductId::new(3)).unwrap(),
            WishlistChange::NotInWishlist
        );
        assert!(!state.is_in_wishlist(ProductId::new(3)));
    }

    #[test]
    fn test_mutations_require_session() {
        let mut state = ShopState::new(MemoryStore::new());
        let p = product(1, 10);

        assert!(matches!(
            state.add_to_cart(&p, 1, None),
            Err(StateError::AuthRequired)
        ));
        assert!(matches!(
            state.update_quantity(p.id, None, 3),
            Err(StateError::AuthRequired)
        ));
        assert!(matches!(
            state.remove_from_cart(p.id, None),
            Err(StateError::AuthRequired)
        ));
        assert!(matches!(
            state.add_to_wishlist(&p),
            Err(StateError::AuthRequired)
        ));
        assert!(matches!(
            state.remove_from_wishlist(p.id),
            Err(StateError::AuthRequired)
        ));

        assert!(state.cart().is_empty());
        assert!(state.wishlist().is_empty());
        assert!(state.into_store().is_empty());
    }

    #[test]
    fn test_persisted_cart_roundtrip() {
        let mut state = signed_in();
        state.add_to_cart(&product(4, 12), 1, Some("500g")).unwrap();
        state.add_to_cart(&product(2, 7), 6, None).unwrap();
        state.add_to_cart(&product(9, 150), 2, None).unwrap();
        state.add_to_wishlist(&product(5, 30)).unwrap();
        let cart = state.cart().to_vec();

        let restored = ShopState::restore(state.into_store());
        assert_eq!(restored.cart(), cart.as_slice());
        assert_eq!(restored.wishlist().len(), 1);
        assert_eq!(restored.session().unwrap().user_id, UserId::new(1));
    }

    #[test]
    fn test_logout_clears_memory_and_store() {
        let mut state = signed_in();
        state.add_to_cart(&product(1, 10), 1, None).unwrap();
        state.add_to_wishlist(&product(2, 10)).unwrap();

        state.logout().unwrap();
        assert!(!state.is_authenticated());
        assert!(state.cart().is_empty());
        assert!(state.wishlist().is_empty());
        assert!(state.into_store().is_empty());
    }

    #[test]
    fn test_restore_malformed_is_empty() {
        let mut store = MemoryStore::new();
        store.set(keys::CART, "not json").unwrap();
        store.set(keys::CURRENT_USER, r#"{"token": 5}"#).unwrap();

        let state = ShopState::restore(store);
        assert!(state.cart().is_empty());
        assert!(!state.is_authenticated());
    }

    #[test]
    fn test_restore_normalizes_stored_cart() {
        let mut store = MemoryStore::new();
        store
            .set(
                keys::CART,
                r#"[
                    {"id": 1, "name": "A", "price": 10, "image": "", "quantity": 2, "size": null},
                    {"id": 2, "name": "B", "price": 5, "image": "", "quantity": 0, "size": null},
                    {"id": 1, "name": "A", "price": 10, "image": "", "quantity": 3, "size": null},
                    {"id": 1, "name": "A", "price": 10, "image": "", "quantity": 1, "size": "L"}
                ]"#,
            )
            .unwrap();
        store
            .set(
                keys::WISHLIST,
                r#"[{"id": 7, "name": "W", "price": 1}, {"id": 7, "name": "W2", "price": 2}]"#,
            )
            .unwrap();

        let state = ShopState::restore(store);
        assert_eq!(state.cart().len(), 2);
        assert_eq!(state.cart()[0].quantity, 5);
        assert_eq!(state.cart()[1].variant.as_deref(), Some("L"));
        assert_eq!(state.wishlist().len(), 1);
        assert_eq!(state.wishlist()[0].name, "W");
    }

    #[test]
    fn test_total_saturates_for_huge_quantities() {
        let mut state = signed_in();
        let pricey: Product = serde_json::from_value(serde_json::json!({
            "id": 9, "name": "Saffron", "price": "100000000000000000000"
        }))
        .unwrap();
        state.add_to_cart(&pricey, 1, None).unwrap();

        let change = state
            .update_quantity(ProductId::new(9), None, i64::MAX)
            .unwrap();
        assert_eq!(change, CartChange::Updated { quantity: u32::MAX });
        assert_eq!(state.total(), Decimal::MAX);
    }

    #[test]
    fn test_sign_in_keeps_session_when_save_fails() {
        let mut state = ShopState::new(FailingStore::default());
        let err = state
            .sign_in(Session::new(UserId::new(3), SecretString::from("tok")))
            .unwrap_err();

        assert!(matches!(err, StorageError::Io { .. }));
        assert!(state.is_authenticated());
        assert_eq!(state.into_store().attempted, vec![keys::CURRENT_USER]);
    }

    #[test]
    fn test_failed_save_keeps_in_memory_change() {
        let mut state = ShopState::new(FailingStore::default());
        let _ = state.sign_in(Session::new(UserId::new(3), SecretString::from("tok")));

        let err = state.add_to_cart(&product(1, 10), 2, None).unwrap_err();
        assert!(matches!(err, StateError::Storage(StorageError::Io { .. })));
        assert_eq!(state.cart().len(), 1);
        assert_eq!(state.item_count(), 2);

        let err = state.add_to_wishlist(&product(2, 10)).unwrap_err();
        assert!(matches!(err, StateError::Storage(_)));
        assert!(state.is_in_wishlist(ProductId::new(2)));
    }

    #[test]
    fn test_logout_tries_every_key_and_clears_memory() {
        let mut seed = MemoryStore::new();
        seed.set(
            keys::CURRENT_USER,
            r#"{"userId": 3, "token": "tok"}"#,
        )
        .unwrap();
        seed.set(
            keys::CART,
            r#"[{"id": 1, "name": "A", "price": 10, "image": "", "quantity": 1, "size": null}]"#,
        )
        .unwrap();
        let mut state = ShopState::restore(FailingStore::new(seed));
        assert!(state.is_authenticated());
        assert_eq!(state.cart().len(), 1);

        let err = state.logout().unwrap_err();
        let StorageError::Io { path, .. } = err else {
            panic!("expected an I/O error, got {err:?}");
        };
        assert_eq!(path, std::path::PathBuf::from("currentUser.json"));

        assert!(!state.is_authenticated());
        assert!(state.cart().is_empty());
        assert!(state.wishlist().is_empty());
        assert_eq!(
            state.into_store().attempted,
            vec![keys::CURRENT_USER, keys::CART, keys::WISHLIST]
        );
    }
}
