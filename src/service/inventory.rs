//! Inventory ledger
//!
//! Sole writer of `Product.stock`. Every decrement goes through the store's
//! atomic conditional update, never a read-then-write, so stock can never go
//! negative under concurrent reservations.

use std::sync::Arc;

use uuid::Uuid;

use crate::store::ProductStore;
use crate::{Error, Result};

pub struct InventoryLedger {
    products: Arc<dyn ProductStore>,
}

impl InventoryLedger {
    pub fn new(products: Arc<dyn ProductStore>) -> Self {
        Self { products }
    }

    /// Reserves `quantity` units of one product. The availability check and
    /// the decrement are one conditional store update; the preceding read
    /// only supplies the product name for the error.
    #[tracing::instrument(skip(self))]
    pub async fn reserve(&self, product_id: Uuid, quantity: u32) -> Result<()> {
        let product = self
            .products
            .get(product_id)
            .await?
            .ok_or(Error::ProductNotFound)?;
        if !self.products.deduct_stock(product_id, quantity).await? {
            return Err(Error::InsufficientStock(product.name));
        }
        Ok(())
    }

    /// Returns `quantity` units to stock. Compensation for a failed
    /// multi-item reservation; also the hook for future cancellation flows.
    #[tracing::instrument(skip(self))]
    pub async fn release(&self, product_id: Uuid, quantity: u32) -> Result<()> {
        self.products.restock(product_id, quantity).await
    }

    /// All-or-nothing reservation across the items of one order: every item
    /// is validated before any stock moves, and if a conditional decrement
    /// still loses a race mid-sequence, the decrements already applied are
    /// released before the error propagates.
    #[tracing::instrument(skip(self, items))]
    pub async fn reserve_all(&self, items: &[(Uuid, u32)]) -> Result<()> {
        let mut names = Vec::with_capacity(items.len());
        for &(product_id, quantity) in items {
            let product = self
                .products
                .get(product_id)
                .await?
                .ok_or(Error::ProductNotFound)?;
            if (product.stock as i64) < quantity as i64 {
                return Err(Error::InsufficientStock(product.name));
            }
            names.push(product.name);
        }

        for (idx, &(product_id, quantity)) in items.iter().enumerate() {
            if self.products.deduct_stock(product_id, quantity).await? {
                continue;
            }
            // Lost a race after pre-validation: roll the earlier items back.
            for &(applied_id, applied_qty) in &items[..idx] {
                if let Err(err) = self.products.restock(applied_id, applied_qty).await {
                    tracing::error!(%applied_id, applied_qty, %err, "failed to release stock during rollback");
                }
            }
            return Err(Error::InsufficientStock(names[idx].clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Product;
    use crate::store::MemoryStore;

    async fn seed(store: &MemoryStore, name: &str, stock: i32) -> Uuid {
        let product = Product::new(name, "gadgets", 1_000, stock);
        store.insert(&product).await.unwrap();
        product.id
    }

    async fn stock_of(store: &MemoryStore, id: Uuid) -> i32 {
        ProductStore::get(store, id).await.unwrap().unwrap().stock
    }

    #[tokio::test]
    async fn test_reserve_decrements_stock() {
        let store = Arc::new(MemoryStore::new());
        let id = seed(&store, "Widget", 5).await;
        let ledger = InventoryLedger::new(store.clone());

        ledger.reserve(id, 2).await.unwrap();
        assert_eq!(stock_of(&store, id).await, 3);
    }

    #[tokio::test]
    async fn test_reserve_insufficient_names_product() {
        let store = Arc::new(MemoryStore::new());
        let id = seed(&store, "Blue Widget", 5).await;
        let ledger = InventoryLedger::new(store.clone());

        let err = ledger.reserve(id, 10).await.unwrap_err();
        assert!(matches!(err, Error::InsufficientStock(ref name) if name == "Blue Widget"));
        assert_eq!(stock_of(&store, id).await, 5);
    }

    #[tokio::test]
    async fn test_reserve_missing_product() {
        let store = Arc::new(MemoryStore::new());
        let ledger = InventoryLedger::new(store);
        let err = ledger.reserve(Uuid::new_v4(), 1).await.unwrap_err();
        assert!(matches!(err, Error::ProductNotFound));
    }

    #[tokio::test]
    async fn test_release_restores_stock() {
        let store = Arc::new(MemoryStore::new());
        let id = seed(&store, "Widget", 5).await;
        let ledger = InventoryLedger::new(store.clone());

        ledger.reserve(id, 5).await.unwrap();
        ledger.release(id, 5).await.unwrap();
        assert_eq!(stock_of(&store, id).await, 5);
    }

    #[tokio::test]
    async fn test_reserve_all_fails_without_partial_effect() {
        let store = Arc::new(MemoryStore::new());
        let p1 = seed(&store, "Widget", 5).await;
        let p2 = seed(&store, "Gadget", 1).await;
        let ledger = InventoryLedger::new(store.clone());

        let err = ledger.reserve_all(&[(p1, 2), (p2, 3)]).await.unwrap_err();
        assert!(matches!(err, Error::InsufficientStock(ref name) if name == "Gadget"));
        assert_eq!(stock_of(&store, p1).await, 5);
        assert_eq!(stock_of(&store, p2).await, 1);
    }

    #[tokio::test]
    async fn test_reserve_all_rolls_back_on_mid_sequence_race() {
        let store = Arc::new(MemoryStore::new());
        // The same product twice: each line passes pre-validation on its
        // own, but the second conditional decrement must fail, forcing the
        // first one to be rolled back.
        let p1 = seed(&store, "Widget", 5).await;
        let ledger = InventoryLedger::new(store.clone());

        let err = ledger.reserve_all(&[(p1, 3), (p1, 3)]).await.unwrap_err();
        assert!(matches!(err, Error::InsufficientStock(_)));
        assert_eq!(stock_of(&store, p1).await, 5);
    }

    #[tokio::test]
    async fn test_reserve_all_applies_every_item() {
        let store = Arc::new(MemoryStore::new());
        let p1 = seed(&store, "Widget", 5).await;
        let p2 = seed(&store, "Gadget", 4).await;
        let ledger = InventoryLedger::new(store.clone());

        ledger.reserve_all(&[(p1, 2), (p2, 4)]).await.unwrap();
        assert_eq!(stock_of(&store, p1).await, 3);
        assert_eq!(stock_of(&store, p2).await, 0);
    }
}
