//! Persistence layer
//!
//! All authoritative state lives behind these traits; components receive a
//! store handle at construction instead of importing a global client. The
//! Postgres implementation backs the service, the in-memory one backs tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{Order, Product};
use crate::Result;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::{PgOrderStore, PgProductStore};

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct CategoryCount {
    pub category: String,
    pub products: i64,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct DailySales {
    pub date: NaiveDate,
    pub orders: i64,
    pub sales: i64,
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn insert(&self, product: &Product) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<Product>>;
    async fn list(&self) -> Result<Vec<Product>>;
    /// Writes the product document, reviews and derived aggregates included,
    /// as a single per-document write. `stock` is excluded: only the
    /// inventory operations below may mutate it.
    async fn update(&self, product: &Product) -> Result<()>;
    /// Returns false when the product did not exist.
    async fn delete(&self, id: Uuid) -> Result<bool>;
    /// Atomic conditional decrement (`stock -= qty WHERE stock >= qty`).
    /// Returns false when the product is missing or stock is insufficient;
    /// never applies a partial decrement.
    async fn deduct_stock(&self, id: Uuid, quantity: u32) -> Result<bool>;
    /// Unconditional increment, used to compensate a failed multi-item
    /// reservation.
    async fn restock(&self, id: Uuid, quantity: u32) -> Result<()>;
    async fn count_by_category(&self) -> Result<Vec<CategoryCount>>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: &Order) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<Order>>;
    async fn update(&self, order: &Order) -> Result<()>;
    /// Returns false when the order did not exist.
    async fn delete(&self, id: Uuid) -> Result<bool>;
    async fn list(&self) -> Result<Vec<Order>>;
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Order>>;
    /// (order count, sum of total_price) over all orders.
    async fn sales_totals(&self) -> Result<(i64, i64)>;
    async fn sales_by_day(&self) -> Result<Vec<DailySales>>;
}
