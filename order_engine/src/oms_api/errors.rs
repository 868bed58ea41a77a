use thiserror::Error;

use crate::{db_types::OrderId, traits::OrderStoreError};

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("The request was cancelled before the order was stored")]
    Cancelled,
}

impl From<OrderStoreError> for OrderFlowError {
    fn from(e: OrderStoreError) -> Self {
        match e {
            OrderStoreError::OrderNotFound(id) => OrderFlowError::OrderNotFound(id),
            e => OrderFlowError::DatabaseError(e.to_string()),
        }
    }
}
