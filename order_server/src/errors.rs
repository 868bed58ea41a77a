use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use order_engine::OrderFlowError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid request body")]
    InvalidRequestBody(String),
    #[error("Order ID is required")]
    MissingOrderId,
    #[error("Order not found")]
    OrderNotFound,
    #[error("Failed to create order")]
    OrderCreationFailed(String),
    #[error("Failed to retrieve order")]
    OrderRetrievalFailed(String),
}

impl ServerError {
    /// Extra detail that is safe to show to the client.
    fn details(&self) -> Option<&str> {
        match self {
            Self::InvalidRequestBody(details) => Some(details.as_str()),
            _ => None,
        }
    }
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::MissingOrderId => StatusCode::BAD_REQUEST,
            Self::OrderNotFound => StatusCode::NOT_FOUND,
            Self::OrderCreationFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::OrderRetrievalFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self.details() {
            Some(details) => json!({ "error": self.to_string(), "details": details }),
            None => json!({ "error": self.to_string() }),
        };
        HttpResponse::build(self.status_code()).insert_header(ContentType::json()).body(body.to_string())
    }
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::OrderNotFound(_) => Self::OrderNotFound,
            e => Self::OrderRetrievalFailed(e.to_string()),
        }
    }
}
