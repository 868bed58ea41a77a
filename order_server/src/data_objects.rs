use chrono::{DateTime, Utc};
use order_common::Price;
use order_engine::db_types::{IdempotencyKey, NewOrder};
use serde::{Deserialize, Serialize};

/// The body of a `POST /orders` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub customer_id: String,
    pub product_id: String,
    pub quantity: i32,
    pub total_price: f64,
    /// When the customer placed the order. Defaults to the time the order is stored.
    #[serde(default)]
    pub order_time: Option<DateTime<Utc>>,
    pub idempotency_key: String,
}

impl CreateOrderRequest {
    /// Checks the field values and splits the request into the order draft and its idempotency key. The error is a
    /// message suitable for the client.
    pub fn validate(self) -> Result<(NewOrder, IdempotencyKey), String> {
        let customer_id = required("customer_id", self.customer_id)?;
        let product_id = required("product_id", self.product_id)?;
        let idempotency_key = required("idempotency_key", self.idempotency_key)?;
        if self.quantity < 1 {
            return Err(format!("quantity must be at least 1, got {}", self.quantity));
        }
        let total_price = Price::try_from(self.total_price).map_err(|e| format!("total_price: {e}"))?;
        let mut order = NewOrder::new(customer_id, product_id, self.quantity, total_price);
        if let Some(t) = self.order_time {
            order = order.with_order_time(t);
        }
        Ok((order, IdempotencyKey::new(idempotency_key)))
    }
}

fn required(field: &str, value: String) -> Result<String, String> {
    if value.trim().is_empty() {
        Err(format!("{field} is required"))
    } else {
        Ok(value)
    }
}
