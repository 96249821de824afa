//! Postgres-backed stores. Reviews and order sub-documents are JSONB columns
//! written in single statements, so each mutation is one per-document write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Order, OrderItem, PaymentResult, Product, Review, ShippingAddress};
use crate::store::{CategoryCount, DailySales, OrderStore, ProductStore};
use crate::{Error, Result};

#[derive(Clone)]
pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    link: String,
    images: Vec<String>,
    brand: Option<String>,
    category: String,
    description: String,
    price: i64,
    stock: i32,
    ratings: f64,
    num_reviews: i32,
    reviews: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = Error;

    fn try_from(row: ProductRow) -> Result<Self> {
        let reviews: Vec<Review> = serde_json::from_value(row.reviews)
            .map_err(|e| Error::Storage(format!("corrupt reviews document: {e}")))?;
        Ok(Product {
            id: row.id,
            name: row.name,
            link: row.link,
            images: row.images,
            brand: row.brand,
            category: row.category,
            description: row.description,
            price: row.price,
            stock: row.stock,
            ratings: row.ratings,
            num_reviews: row.num_reviews,
            reviews,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn reviews_json(reviews: &[Review]) -> Result<serde_json::Value> {
    serde_json::to_value(reviews).map_err(|e| Error::Storage(e.to_string()))
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn insert(&self, product: &Product) -> Result<()> {
        sqlx::query(
            "INSERT INTO products (id, name, link, images, brand, category, description, price, stock, ratings, num_reviews, reviews, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.link)
        .bind(&product.images)
        .bind(&product.brand)
        .bind(&product.category)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.stock)
        .bind(product.ratings)
        .bind(product.num_reviews)
        .bind(reviews_json(&product.reviews)?)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Product::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>("SELECT * FROM products ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Product::try_from).collect()
    }

    async fn update(&self, product: &Product) -> Result<()> {
        let result = sqlx::query(
            "UPDATE products SET name = $2, link = $3, images = $4, brand = $5, category = $6, description = $7, \
             price = $8, ratings = $9, num_reviews = $10, reviews = $11, updated_at = $12 WHERE id = $1",
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.link)
        .bind(&product.images)
        .bind(&product.brand)
        .bind(&product.category)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.ratings)
        .bind(product.num_reviews)
        .bind(reviews_json(&product.reviews)?)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(Error::ProductNotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn deduct_stock(&self, id: Uuid, quantity: u32) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE products SET stock = stock - $2, updated_at = NOW() WHERE id = $1 AND stock >= $2",
        )
        .bind(id)
        .bind(quantity as i32)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn restock(&self, id: Uuid, quantity: u32) -> Result<()> {
        let result = sqlx::query(
            "UPDATE products SET stock = stock + $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(quantity as i32)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(Error::ProductNotFound);
        }
        Ok(())
    }

    async fn count_by_category(&self) -> Result<Vec<CategoryCount>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT category, COUNT(*) FROM products GROUP BY category ORDER BY category",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(category, products)| CategoryCount { category, products })
            .collect())
    }
}

#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    order_items: serde_json::Value,
    shipping_address: serde_json::Value,
    payment_method: String,
    payment_result: Option<serde_json::Value>,
    items_price: i64,
    shipping_price: i64,
    savings_price: i64,
    total_price: i64,
    is_paid: bool,
    paid_at: Option<DateTime<Utc>>,
    is_delivered: bool,
    delivered_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = Error;

    fn try_from(row: OrderRow) -> Result<Self> {
        let order_items: Vec<OrderItem> = serde_json::from_value(row.order_items)
            .map_err(|e| Error::Storage(format!("corrupt order items document: {e}")))?;
        let shipping_address: ShippingAddress = serde_json::from_value(row.shipping_address)
            .map_err(|e| Error::Storage(format!("corrupt shipping address document: {e}")))?;
        let payment_result: Option<PaymentResult> = row
            .payment_result
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| Error::Storage(format!("corrupt payment result document: {e}")))?;
        Ok(Order {
            id: row.id,
            user_id: row.user_id,
            order_items,
            shipping_address,
            payment_method: row.payment_method,
            payment_result,
            items_price: row.items_price,
            shipping_price: row.shipping_price,
            savings_price: row.savings_price,
            total_price: row.total_price,
            is_paid: row.is_paid,
            paid_at: row.paid_at,
            is_delivered: row.is_delivered,
            delivered_at: row.delivered_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| Error::Storage(e.to_string()))
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn insert(&self, order: &Order) -> Result<()> {
        sqlx::query(
            "INSERT INTO orders (id, user_id, order_items, shipping_address, payment_method, payment_result, \
             items_price, shipping_price, savings_price, total_price, is_paid, paid_at, is_delivered, delivered_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
        )
        .bind(order.id)
        .bind(order.user_id)
        .bind(to_json(&order.order_items)?)
        .bind(to_json(&order.shipping_address)?)
        .bind(&order.payment_method)
        .bind(order.payment_result.as_ref().map(to_json).transpose()?)
        .bind(order.items_price)
        .bind(order.shipping_price)
        .bind(order.savings_price)
        .bind(order.total_price)
        .bind(order.is_paid)
        .bind(order.paid_at)
        .bind(order.is_delivered)
        .bind(order.delivered_at)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Order::try_from).transpose()
    }

    async fn update(&self, order: &Order) -> Result<()> {
        let result = sqlx::query(
            "UPDATE orders SET payment_result = $2, is_paid = $3, paid_at = $4, is_delivered = $5, \
             delivered_at = $6, updated_at = $7 WHERE id = $1",
        )
        .bind(order.id)
        .bind(order.payment_result.as_ref().map(to_json).transpose()?)
        .bind(order.is_paid)
        .bind(order.paid_at)
        .bind(order.is_delivered)
        .bind(order.delivered_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(Error::OrderNotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Order::try_from).collect()
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(
            "SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Order::try_from).collect()
    }

    async fn sales_totals(&self) -> Result<(i64, i64)> {
        let totals: (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(total_price), 0)::BIGINT FROM orders",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(totals)
    }

    async fn sales_by_day(&self) -> Result<Vec<DailySales>> {
        let rows: Vec<(chrono::NaiveDate, i64, i64)> = sqlx::query_as(
            "SELECT created_at::date, COUNT(*), COALESCE(SUM(total_price), 0)::BIGINT \
             FROM orders GROUP BY 1 ORDER BY 1",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(date, orders, sales)| DailySales { date, orders, sales })
            .collect())
    }
}
