//! Client-side cart store persisted to [`ClientStorage`].

use crate::core::cart::{Cart, LineItem, OrderSummary, Product};
use crate::core::storage::{CART_KEY, ClientStorage};
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct CartStore {
    cart: Cart,
    count: u64,
    storage: Arc<dyn ClientStorage>,
}

impl CartStore {
    /// Restores the cart saved in `storage`. Missing or unreadable data gives
    /// an empty cart.
    pub fn load(storage: Arc<dyn ClientStorage>) -> Self {
        let cart = match storage.get_item(CART_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<LineItem>>(&raw) {
                Ok(items) => Cart::from_items(items),
                Err(e) => {
                    warn!(error = %e, "Ignoring malformed saved cart");
                    Cart::new()
                }
            },
            Ok(None) => Cart::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read saved cart");
                Cart::new()
            }
        };
        debug!("Loaded cart with {} line(s)", cart.items().len());

        let count = cart.count();
        Self {
            cart,
            count,
            storage,
        }
    }

    pub fn items(&self) -> &[LineItem] {
        self.cart.items()
    }

    pub fn is_empty(&self) -> bool {
        self.cart.is_empty()
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn total(&self) -> Decimal {
        self.cart.total()
    }

    pub fn summary(&self) -> OrderSummary {
        self.cart.summary()
    }

    pub fn add(&mut self, product: &Product, quantity: u32, size: Option<&str>) -> Result<()> {
        debug!(product = %product.id, quantity, ?size, "Adding to cart");
        let mut next = self.cart.clone();
        next.add(product, quantity, size);
        self.commit(next)
    }

    pub fn remove(&mut self, product_id: &str, size: Option<&str>) -> Result<()> {
        let mut next = self.cart.clone();
        if !next.remove(product_id, size) {
            debug!(product = %product_id, ?size, "Nothing to remove");
            return Ok(());
        }
        self.commit(next)
    }

    /// Zero removes the line; an unknown line is left alone.
    pub fn set_quantity(&mut self, product_id: &str, size: Option<&str>, quantity: u32) -> Result<()> {
        let mut next = self.cart.clone();
        if !next.set_quantity(product_id, size, quantity) {
            debug!(product = %product_id, ?size, "No cart line to update");
            return Ok(());
        }
        self.commit(next)
    }

    pub fn clear(&mut self) -> Result<()> {
        self.storage
            .remove_item(CART_KEY)
            .context("Failed to erase saved cart")?;
        self.cart.clear();
        self.count = 0;
        Ok(())
    }

    // The snapshot is written before the in-memory cart changes, so a failed
    // write leaves the store as it was.
    fn commit(&mut self, next: Cart) -> Result<()> {
        let snapshot = serde_json::to_string(&next).context("Failed to serialize cart")?;
        self.storage
            .set_item(CART_KEY, &snapshot)
            .context("Failed to save cart")?;
        self.count = next.count();
        self.cart = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStorage;
    use anyhow::anyhow;
    use rust_decimal_macros::dec;

    struct ReadOnlyStorage {
        inner: MemoryStorage,
    }

    impl ClientStorage for ReadOnlyStorage {
        fn get_item(&self, key: &str) -> Result<Option<String>> {
            self.inner.get_item(key)
        }

        fn set_item(&self, _key: &str, _value: &str) -> Result<()> {
            Err(anyhow!("quota exceeded"))
        }

        fn remove_item(&self, _key: &str) -> Result<()> {
            Err(anyhow!("quota exceeded"))
        }
    }

    fn memory() -> Arc<dyn ClientStorage> {
        Arc::new(MemoryStorage::new())
    }

    #[test]
    fn test_cart_survives_reload() {
        let storage = memory();
        let mut store = CartStore::load(Arc::clone(&storage));
        store.add(&Product::new("p", dec!(20)), 2, Some("M")).unwrap();
        store.add(&Product::new("q", dec!(30)), 1, None).unwrap();
        store.add(&Product::new("p", dec!(20)), 1, Some("M")).unwrap();

        let reloaded = CartStore::load(storage);
        assert_eq!(reloaded.items(), store.items());
        assert_eq!(reloaded.count(), 4);
        assert_eq!(reloaded.total(), dec!(90));
    }

    #[test]
    fn test_malformed_saved_cart_loads_empty() {
        let storage = memory();
        storage.set_item(CART_KEY, "{not json").unwrap();

        let store = CartStore::load(storage);
        assert!(store.is_empty());
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_saved_cart_accepts_numeric_prices() {
        let storage = memory();
        storage
            .set_item(
                CART_KEY,
                r#"[{"productId":"p","unitPrice":19.99,"size":null,"quantity":2}]"#,
            )
            .unwrap();

        let store = CartStore::load(storage);
        assert_eq!(store.total(), dec!(39.98));
    }

    #[test]
    fn test_clear_erases_snapshot() {
        let storage = memory();
        let mut store = CartStore::load(Arc::clone(&storage));
        store.add(&Product::new("p", dec!(20)), 1, None).unwrap();
        store.clear().unwrap();

        assert!(store.is_empty());
        assert_eq!(store.count(), 0);
        assert!(storage.get_item(CART_KEY).unwrap().is_none());
    }

    #[test]
    fn test_count_follows_mutations() {
        let mut store = CartStore::load(memory());
        store.add(&Product::new("p", dec!(20)), 2, Some("M")).unwrap();
        store.add(&Product::new("q", dec!(5)), 3, None).unwrap();
        assert_eq!(store.count(), 5);

        store.set_quantity("p", Some("M"), 1).unwrap();
        assert_eq!(store.count(), 4);

        store.set_quantity("q", None, 0).unwrap();
        assert_eq!(store.count(), 1);

        store.remove("p", Some("M")).unwrap();
        assert_eq!(store.count(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_missing_line_is_noop() {
        let mut store = CartStore::load(memory());
        store.remove("ghost", None).unwrap();
        store.set_quantity("ghost", Some("XL"), 3).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_failed_write_keeps_previous_state() {
        let inner = MemoryStorage::new();
        inner
            .set_item(
                CART_KEY,
                r#"[{"productId":"p","unitPrice":"10","size":"M","quantity":1}]"#,
            )
            .unwrap();
        let mut store = CartStore::load(Arc::new(ReadOnlyStorage { inner }));
        assert_eq!(store.count(), 1);

        assert!(store.add(&Product::new("q", dec!(5)), 1, None).is_err());
        assert!(store.clear().is_err());
        assert_eq!(store.count(), 1);
        assert_eq!(store.items().len(), 1);
    }
}
