//! Order aggregate
//!
//! Orders hold weak references to products; item name, price, and image are
//! snapshotted at creation so historical orders stay readable after the
//! product is edited or deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::pricing;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub payment_result: Option<PaymentResult>,
    pub items_price: i64,
    pub shipping_price: i64,
    pub savings_price: i64,
    pub total_price: i64,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: u32,
    /// Unit price snapshot in minor currency units.
    pub price: i64,
    pub images: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub full_name: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaymentResult {
    pub id: String,
    pub status: String,
    pub update_time: String,
    pub payer_email: String,
}

/// Checkout input: the client cart with snapshotted item data plus the
/// addresses and payment method chosen at checkout.
#[derive(Clone, Debug, Deserialize)]
pub struct CartSnapshot {
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
}

impl Order {
    /// Builds an unpaid, undelivered order from a cart snapshot, deriving
    /// the price lines server-side.
    pub fn from_cart(cart: CartSnapshot, user_id: Uuid) -> Self {
        let items_price: i64 = cart
            .items
            .iter()
            .map(|i| i.price * i.quantity as i64)
            .sum();
        let shipping_price = pricing::compute_shipping(items_price);
        let savings_price = pricing::compute_savings(items_price, shipping_price);
        let total_price = pricing::compute_total(items_price, shipping_price, savings_price);
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            order_items: cart.items,
            shipping_address: cart.shipping_address,
            payment_method: cart.payment_method,
            payment_result: None,
            items_price,
            shipping_price,
            savings_price,
            total_price,
            is_paid: false,
            paid_at: None,
            is_delivered: false,
            delivered_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Records a payment capture. Re-invocation overwrites the previous
    /// result and timestamp; `is_paid` stays true.
    pub fn mark_paid(&mut self, result: PaymentResult) {
        self.is_paid = true;
        self.paid_at = Some(Utc::now());
        self.payment_result = Some(result);
        self.touch();
    }

    pub fn mark_delivered(&mut self) {
        self.is_delivered = true;
        self.delivered_at = Some(Utc::now());
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
