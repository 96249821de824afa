//! In-memory store used by unit tests. Mirrors the conditional-update
//! semantics of the Postgres implementation, including the atomic
//! check-and-decrement on stock.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Order, Product};
use crate::store::{CategoryCount, DailySales, OrderStore, ProductStore};
use crate::{Error, Result};

#[derive(Default)]
pub struct MemoryStore {
    products: Mutex<HashMap<Uuid, Product>>,
    orders: Mutex<HashMap<Uuid, Order>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_products(&self) -> Result<std::sync::MutexGuard<'_, HashMap<Uuid, Product>>> {
        self.products
            .lock()
            .map_err(|_| Error::Storage("poisoned product lock".into()))
    }

    fn lock_orders(&self) -> Result<std::sync::MutexGuard<'_, HashMap<Uuid, Order>>> {
        self.orders
            .lock()
            .map_err(|_| Error::Storage("poisoned order lock".into()))
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn insert(&self, product: &Product) -> Result<()> {
        self.lock_products()?.insert(product.id, product.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Product>> {
        Ok(self.lock_products()?.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Product>> {
        let mut products: Vec<Product> = self.lock_products()?.values().cloned().collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(products)
    }

    async fn update(&self, product: &Product) -> Result<()> {
        let mut products = self.lock_products()?;
        let existing = products.get_mut(&product.id).ok_or(Error::ProductNotFound)?;
        // Stock is owned by the inventory operations; keep the stored value.
        let stock = existing.stock;
        *existing = product.clone();
        existing.stock = stock;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.lock_products()?.remove(&id).is_some())
    }

    async fn deduct_stock(&self, id: Uuid, quantity: u32) -> Result<bool> {
        let mut products = self.lock_products()?;
        match products.get_mut(&id) {
            Some(p) if p.stock >= quantity as i32 => {
                p.stock -= quantity as i32;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn restock(&self, id: Uuid, quantity: u32) -> Result<()> {
        let mut products = self.lock_products()?;
        let product = products.get_mut(&id).ok_or(Error::ProductNotFound)?;
        product.stock += quantity as i32;
        Ok(())
    }

    async fn count_by_category(&self) -> Result<Vec<CategoryCount>> {
        let products = self.lock_products()?;
        let mut counts: HashMap<String, i64> = HashMap::new();
        for p in products.values() {
            *counts.entry(p.category.clone()).or_default() += 1;
        }
        let mut out: Vec<CategoryCount> = counts
            .into_iter()
            .map(|(category, products)| CategoryCount { category, products })
            .collect();
        out.sort_by(|a, b| a.category.cmp(&b.category));
        Ok(out)
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert(&self, order: &Order) -> Result<()> {
        self.lock_orders()?.insert(order.id, order.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Order>> {
        Ok(self.lock_orders()?.get(&id).cloned())
    }

    async fn update(&self, order: &Order) -> Result<()> {
        let mut orders = self.lock_orders()?;
        if !orders.contains_key(&order.id) {
            return Err(Error::OrderNotFound);
        }
        orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.lock_orders()?.remove(&id).is_some())
    }

    async fn list(&self) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self.lock_orders()?.values().cloned().collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .lock_orders()?
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn sales_totals(&self) -> Result<(i64, i64)> {
        let orders = self.lock_orders()?;
        let count = orders.len() as i64;
        let sales = orders.values().map(|o| o.total_price).sum();
        Ok((count, sales))
    }

    async fn sales_by_day(&self) -> Result<Vec<DailySales>> {
        let orders = self.lock_orders()?;
        let mut days: HashMap<chrono::NaiveDate, (i64, i64)> = HashMap::new();
        for o in orders.values() {
            let entry = days.entry(o.created_at.date_naive()).or_default();
            entry.0 += 1;
            entry.1 += o.total_price;
        }
        let mut out: Vec<DailySales> = days
            .into_iter()
            .map(|(date, (orders, sales))| DailySales { date, orders, sales })
            .collect();
        out.sort_by_key(|d| d.date);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn stock_of(store: &MemoryStore, id: Uuid) -> i32 {
        ProductStore::get(store, id).await.unwrap().unwrap().stock
    }

    #[tokio::test]
    async fn test_deduct_stock_is_conditional() {
        let store = MemoryStore::new();
        let product = Product::new("Widget", "gadgets", 1_000, 5);
        ProductStore::insert(&store, &product).await.unwrap();

        assert!(store.deduct_stock(product.id, 3).await.unwrap());
        assert_eq!(stock_of(&store, product.id).await, 2);

        // Insufficient stock leaves the count untouched.
        assert!(!store.deduct_stock(product.id, 3).await.unwrap());
        assert_eq!(stock_of(&store, product.id).await, 2);

        // Missing product is not an error, just a refusal.
        assert!(!store.deduct_stock(Uuid::new_v4(), 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_preserves_stock() {
        let store = MemoryStore::new();
        let mut product = Product::new("Widget", "gadgets", 1_000, 5);
        ProductStore::insert(&store, &product).await.unwrap();
        store.deduct_stock(product.id, 2).await.unwrap();

        // A catalog write carrying a stale stock value must not clobber the
        // ledger's deduction.
        product.price = 1_200;
        ProductStore::update(&store, &product).await.unwrap();
        let stored = ProductStore::get(&store, product.id).await.unwrap().unwrap();
        assert_eq!(stored.price, 1_200);
        assert_eq!(stored.stock, 3);
    }

    #[tokio::test]
    async fn test_restock() {
        let store = MemoryStore::new();
        let product = Product::new("Widget", "gadgets", 1_000, 0);
        ProductStore::insert(&store, &product).await.unwrap();
        store.restock(product.id, 4).await.unwrap();
        assert_eq!(stock_of(&store, product.id).await, 4);
    }
}
