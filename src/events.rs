//! Domain events published to NATS when a client is configured. Publishing
//! is best-effort: failures are logged and never fail the request.

use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    OrderPlaced { order_id: Uuid, user_id: Uuid, total_price: i64 },
    OrderPaid { order_id: Uuid, transaction_id: String },
    OrderDelivered { order_id: Uuid },
    OrderRemoved { order_id: Uuid },
    StockReserved { product_id: Uuid, quantity: u32 },
    StockReleased { product_id: Uuid, quantity: u32 },
    ReviewPosted { product_id: Uuid, review_id: Uuid, ratings: i32 },
}

impl DomainEvent {
    fn subject(&self) -> &'static str {
        match self {
            Self::OrderPlaced { .. }
            | Self::OrderPaid { .. }
            | Self::OrderDelivered { .. }
            | Self::OrderRemoved { .. } => "storefront.orders",
            Self::StockReserved { .. } | Self::StockReleased { .. } => "storefront.inventory",
            Self::ReviewPosted { .. } => "storefront.reviews",
        }
    }
}

#[derive(Clone)]
pub struct EventPublisher {
    client: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(client: Option<async_nats::Client>) -> Self {
        Self { client }
    }

    /// No-op publisher for tests and deployments without NATS.
    pub fn disabled() -> Self {
        Self { client: None }
    }

    pub async fn publish(&self, event: DomainEvent) {
        let Some(client) = &self.client else { return };
        let payload = match serde_json::to_vec(&event) {
            Ok(p) => p,
            Err(err) => {
                tracing::warn!(?event, %err, "failed to serialize event");
                return;
            }
        };
        if let Err(err) = client.publish(event.subject().to_string(), payload.into()).await {
            tracing::warn!(?event, %err, "failed to publish event");
        }
    }
}
