use chrono::{DateTime, Utc};
use order_common::Price;
use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderId};

/// Emitted once for every order that is actually created. Replayed responses never produce one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order_id: OrderId,
    pub customer_id: String,
    pub product_id: String,
    pub quantity: i32,
    pub total_price: Price,
    /// When the event was emitted, which is not necessarily when the order was stored
    pub timestamp: DateTime<Utc>,
}

impl OrderCreatedEvent {
    pub fn new(order: &Order) -> Self {
        Self {
            order_id: order.id.clone(),
            customer_id: order.customer_id.clone(),
            product_id: order.product_id.clone(),
            quantity: order.quantity,
            total_price: order.total_price,
            timestamp: Utc::now(),
        }
    }
}
