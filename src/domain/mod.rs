//! Domain model
pub mod order;
pub mod pricing;
pub mod product;

pub use order::{CartSnapshot, Order, OrderItem, PaymentResult, ShippingAddress};
pub use product::{Product, Review};
