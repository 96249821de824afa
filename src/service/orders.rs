//! Order lifecycle
//!
//! Creation reserves every item through the inventory ledger before the
//! order is persisted; payment and delivery are independent flags with no
//! enforced precedence.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::{CartSnapshot, Order, PaymentResult};
use crate::service::InventoryLedger;
use crate::store::{CategoryCount, DailySales, OrderStore, ProductStore};
use crate::{Actor, Error, Result};

#[derive(Debug, Serialize)]
pub struct SalesSummary {
    pub orders: i64,
    pub sales: i64,
    pub daily: Vec<DailySales>,
    pub categories: Vec<CategoryCount>,
}

pub struct OrderLifecycleManager {
    orders: Arc<dyn OrderStore>,
    products: Arc<dyn ProductStore>,
    inventory: InventoryLedger,
}

impl OrderLifecycleManager {
    pub fn new(orders: Arc<dyn OrderStore>, products: Arc<dyn ProductStore>) -> Self {
        let inventory = InventoryLedger::new(products.clone());
        Self {
            orders,
            products,
            inventory,
        }
    }

    /// Places an order from a cart snapshot. Reservation is all-or-nothing:
    /// when any item fails, no stock stays decremented and nothing persists.
    #[tracing::instrument(skip(self, cart))]
    pub async fn create(&self, cart: CartSnapshot, user_id: Uuid) -> Result<Order> {
        let lines: Vec<(Uuid, u32)> = cart
            .items
            .iter()
            .map(|i| (i.product_id, i.quantity))
            .collect();
        self.inventory.reserve_all(&lines).await?;

        let order = Order::from_cart(cart, user_id);
        if let Err(err) = self.orders.insert(&order).await {
            // The order never became visible; give the stock back.
            for &(product_id, quantity) in &lines {
                if let Err(release_err) = self.inventory.release(product_id, quantity).await {
                    tracing::error!(%product_id, quantity, %release_err, "failed to release stock after insert failure");
                }
            }
            return Err(err);
        }

        tracing::info!(order_id = %order.id, %user_id, total = order.total_price, "order placed");
        Ok(order)
    }

    pub async fn get(&self, order_id: Uuid) -> Result<Order> {
        self.orders
            .get(order_id)
            .await?
            .ok_or(Error::OrderNotFound)
    }

    /// The caller's orders, or every order for administrators.
    pub async fn list_for(&self, actor: &Actor) -> Result<Vec<Order>> {
        if actor.is_admin {
            self.orders.list().await
        } else {
            self.orders.list_by_user(actor.id).await
        }
    }

    /// Records a payment capture. Re-invocation on an already-paid order
    /// overwrites the stored result and timestamp.
    #[tracing::instrument(skip(self, result))]
    pub async fn mark_paid(&self, order_id: Uuid, result: PaymentResult) -> Result<Order> {
        let mut order = self.get(order_id).await?;
        order.mark_paid(result);
        self.orders.update(&order).await?;
        Ok(order)
    }

    #[tracing::instrument(skip(self))]
    pub async fn mark_delivered(&self, order_id: Uuid) -> Result<Order> {
        let mut order = self.get(order_id).await?;
        order.mark_delivered();
        self.orders.update(&order).await?;
        Ok(order)
    }

    /// Removes the order. Reserved stock is intentionally not restored:
    /// deletion is an administrative audit action, not a cancellation.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, order_id: Uuid) -> Result<()> {
        if !self.orders.delete(order_id).await? {
            return Err(Error::OrderNotFound);
        }
        Ok(())
    }

    /// Read-only aggregation over all orders and products.
    pub async fn summary(&self) -> Result<SalesSummary> {
        let (orders, sales) = self.orders.sales_totals().await?;
        let daily = self.orders.sales_by_day().await?;
        let categories = self.products.count_by_category().await?;
        Ok(SalesSummary {
            orders,
            sales,
            daily,
            categories,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderItem, Product, ShippingAddress};
    use crate::store::MemoryStore;

    fn cart(items: Vec<OrderItem>) -> CartSnapshot {
        CartSnapshot {
            items,
            shipping_address: ShippingAddress::default(),
            payment_method: "paystack".into(),
        }
    }

    fn line(product: &Product, quantity: u32) -> OrderItem {
        OrderItem {
            product_id: product.id,
            name: product.name.clone(),
            quantity,
            price: product.price,
            images: product.images.clone(),
        }
    }

    fn payment(id: &str) -> PaymentResult {
        PaymentResult {
            id: id.into(),
            status: "success".into(),
            update_time: "2026-01-01T00:00:00Z".into(),
            payer_email: "buyer@example.com".into(),
        }
    }

    async fn setup() -> (Arc<MemoryStore>, OrderLifecycleManager) {
        let store = Arc::new(MemoryStore::new());
        let manager = OrderLifecycleManager::new(store.clone(), store.clone());
        (store, manager)
    }

    async fn seed(store: &MemoryStore, name: &str, price: i64, stock: i32) -> Product {
        let product = Product::new(name, "gadgets", price, stock);
        ProductStore::insert(store, &product).await.unwrap();
        product
    }

    async fn stock_of(store: &MemoryStore, id: Uuid) -> i32 {
        ProductStore::get(store, id).await.unwrap().unwrap().stock
    }

    #[tokio::test]
    async fn test_create_deducts_stock_and_persists_unpaid() {
        let (store, manager) = setup().await;
        let p1 = seed(&store, "Widget", 10_000, 5).await;

        let order = manager
            .create(cart(vec![line(&p1, 2)]), Uuid::new_v4())
            .await
            .unwrap();

        assert_eq!(stock_of(&store, p1.id).await, 3);
        assert!(!order.is_paid);
        assert!(!order.is_delivered);
        assert_eq!(order.items_price, 20_000);
        assert_eq!(order.total_price, order.items_price + order.shipping_price);

        let stored = OrderStore::get(&*store, order.id).await.unwrap().unwrap();
        assert_eq!(stored.order_items.len(), 1);
    }

    #[tokio::test]
    async fn test_create_insufficient_stock_changes_nothing() {
        let (store, manager) = setup().await;
        let p1 = seed(&store, "Widget", 10_000, 5).await;

        let err = manager
            .create(cart(vec![line(&p1, 10)]), Uuid::new_v4())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InsufficientStock(ref name) if name == "Widget"));
        assert_eq!(stock_of(&store, p1.id).await, 5);
        assert!(OrderStore::list(&*store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_multi_item_failure_is_atomic() {
        let (store, manager) = setup().await;
        let p1 = seed(&store, "Widget", 10_000, 5).await;
        let p2 = seed(&store, "Gadget", 2_000, 1).await;

        let err = manager
            .create(cart(vec![line(&p1, 2), line(&p2, 3)]), Uuid::new_v4())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InsufficientStock(ref name) if name == "Gadget"));
        assert_eq!(stock_of(&store, p1.id).await, 5);
        assert_eq!(stock_of(&store, p2.id).await, 1);
    }

    #[tokio::test]
    async fn test_create_missing_product() {
        let (store, manager) = setup().await;
        let ghost = Product::new("Ghost", "gadgets", 1_000, 1);

        let err = manager
            .create(cart(vec![line(&ghost, 1)]), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ProductNotFound));
        assert!(OrderStore::list(&*store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_paid_is_an_idempotent_overwrite() {
        let (store, manager) = setup().await;
        let p1 = seed(&store, "Widget", 10_000, 5).await;
        let order = manager
            .create(cart(vec![line(&p1, 1)]), Uuid::new_v4())
            .await
            .unwrap();

        manager.mark_paid(order.id, payment("tx-1")).await.unwrap();
        let second = manager.mark_paid(order.id, payment("tx-2")).await.unwrap();

        assert!(second.is_paid);
        assert_eq!(second.payment_result.unwrap().id, "tx-2");

        let stored = OrderStore::get(&*store, order.id).await.unwrap().unwrap();
        assert_eq!(stored.payment_result.unwrap().id, "tx-2");
    }

    #[tokio::test]
    async fn test_mark_delivered_independent_of_payment() {
        let (store, manager) = setup().await;
        let p1 = seed(&store, "Widget", 10_000, 5).await;
        let order = manager
            .create(cart(vec![line(&p1, 1)]), Uuid::new_v4())
            .await
            .unwrap();

        let delivered = manager.mark_delivered(order.id).await.unwrap();
        assert!(delivered.is_delivered);
        assert!(delivered.delivered_at.is_some());
        assert!(!delivered.is_paid);
    }

    #[tokio::test]
    async fn test_delete_does_not_restore_stock() {
        let (store, manager) = setup().await;
        let p1 = seed(&store, "Widget", 10_000, 5).await;
        let order = manager
            .create(cart(vec![line(&p1, 2)]), Uuid::new_v4())
            .await
            .unwrap();

        manager.delete(order.id).await.unwrap();

        assert_eq!(stock_of(&store, p1.id).await, 3);
        let err = manager.get(order.id).await.unwrap_err();
        assert!(matches!(err, Error::OrderNotFound));
    }

    #[tokio::test]
    async fn test_not_found_variants() {
        let (_store, manager) = setup().await;
        let missing = Uuid::new_v4();
        assert!(matches!(manager.get(missing).await.unwrap_err(), Error::OrderNotFound));
        assert!(matches!(
            manager.mark_paid(missing, payment("tx")).await.unwrap_err(),
            Error::OrderNotFound
        ));
        assert!(matches!(
            manager.mark_delivered(missing).await.unwrap_err(),
            Error::OrderNotFound
        ));
        assert!(matches!(manager.delete(missing).await.unwrap_err(), Error::OrderNotFound));
    }

    #[tokio::test]
    async fn test_list_for_scopes_to_owner() {
        let (store, manager) = setup().await;
        let p1 = seed(&store, "Widget", 10_000, 10).await;
        let buyer = Uuid::new_v4();
        let other = Uuid::new_v4();
        manager.create(cart(vec![line(&p1, 1)]), buyer).await.unwrap();
        manager.create(cart(vec![line(&p1, 1)]), other).await.unwrap();

        let owner_view = manager
            .list_for(&Actor { id: buyer, name: "Ada".into(), is_admin: false })
            .await
            .unwrap();
        assert_eq!(owner_view.len(), 1);

        let admin_view = manager
            .list_for(&Actor { id: Uuid::new_v4(), name: "Root".into(), is_admin: true })
            .await
            .unwrap();
        assert_eq!(admin_view.len(), 2);
    }

    #[tokio::test]
    async fn test_summary_aggregates() {
        let (store, manager) = setup().await;
        let p1 = seed(&store, "Widget", 30_000, 10).await;
        seed(&store, "Sofa", 90_000, 2).await;
        manager
            .create(cart(vec![line(&p1, 1)]), Uuid::new_v4())
            .await
            .unwrap();
        manager
            .create(cart(vec![line(&p1, 3)]), Uuid::new_v4())
            .await
            .unwrap();

        let summary = manager.summary().await.unwrap();
        assert_eq!(summary.orders, 2);
        // 30_000 + shipping 20_000, and 90_000 free-shipping.
        assert_eq!(summary.sales, 50_000 + 90_000);
        assert_eq!(summary.daily.len(), 1);
        assert_eq!(summary.daily[0].orders, 2);
        assert_eq!(summary.categories.len(), 1);
        assert_eq!(summary.categories[0].products, 2);
    }
}
