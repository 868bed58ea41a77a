use thiserror::Error;

use crate::db_types::{NewOrder, Order, OrderId};

/// The `OrderManagement` trait defines the behaviour for creating and querying orders in the database backend.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Stores a new order.
    ///
    /// The backend assigns a fresh identifier, sets the status to `created`, stamps `created_at` and `updated_at`
    /// with the current time and fills in `order_time` if the draft left it empty. The fully populated order is
    /// returned. No partial writes are visible if this fails.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderStoreError>;

    /// Fetches a single order. A missing order is reported as [`OrderStoreError::OrderNotFound`] so that callers can
    /// tell it apart from a failing database.
    async fn fetch_order_by_id(&self, id: &OrderId) -> Result<Order, OrderStoreError>;
}

#[derive(Debug, Clone, Error)]
pub enum OrderStoreError {
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("We have an internal database engine (configuration/uptime etc.) error: {0}")]
    DatabaseError(String),
    #[error("Idempotency key '{0}' is held by a concurrent request, but its response could not be read")]
    IdempotencyConflict(String),
}

impl From<sqlx::Error> for OrderStoreError {
    fn from(e: sqlx::Error) -> Self {
        OrderStoreError::DatabaseError(e.to_string())
    }
}
