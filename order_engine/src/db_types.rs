use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Duration, SubsecRound, Utc};
use log::error;
use order_common::Price;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

use crate::{helpers::db_now, traits::IdempotencyError, MAX_IDEMPOTENCY_TTL_SECS};

//--------------------------------------        OrderId        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    /// Generates a fresh, random order identifier. Only the order store should call this.
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatusType {
    /// The order has been stored. Every order starts here.
    #[default]
    Created,
    /// Downstream processing has picked the order up.
    Processing,
    /// The order has been fulfilled.
    Completed,
    /// The order was cancelled before it was fulfilled.
    Cancelled,
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Created => write!(f, "created"),
            OrderStatusType::Processing => write!(f, "processing"),
            OrderStatusType::Completed => write!(f, "completed"),
            OrderStatusType::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct ConversionError(String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status in the database: {value}. Defaulting to 'created'");
            OrderStatusType::Created
        })
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
/// An order, exactly as it is stored. This is also the JSON shape returned to clients and cached against idempotency
/// keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: String,
    pub product_id: String,
    pub quantity: i32,
    pub total_price: Price,
    #[sqlx(try_from = "String")]
    pub status: OrderStatusType,
    pub order_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------       NewOrder        ---------------------------------------------------------
/// The caller-supplied part of an order. The store fills in everything else.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub customer_id: String,
    pub product_id: String,
    pub quantity: i32,
    pub total_price: Price,
    /// When the customer placed the order. Defaults to the time of insertion.
    pub order_time: Option<DateTime<Utc>>,
}

impl NewOrder {
    pub fn new(customer_id: String, product_id: String, quantity: i32, total_price: Price) -> Self {
        Self { customer_id, product_id, quantity, total_price, order_time: None }
    }

    pub fn with_order_time(mut self, order_time: DateTime<Utc>) -> Self {
        self.order_time = Some(order_time);
        self
    }

    /// Turns the draft into a complete order record, stamped with `now`.
    pub fn into_order(self, id: OrderId, now: DateTime<Utc>) -> Order {
        Order {
            id,
            customer_id: self.customer_id,
            product_id: self.product_id,
            quantity: self.quantity,
            total_price: self.total_price,
            status: OrderStatusType::Created,
            order_time: self.order_time.map(|t| t.trunc_subsecs(6)).unwrap_or(now),
            created_at: now,
            updated_at: now,
        }
    }
}

//--------------------------------------   EndpointIdentity    ---------------------------------------------------------
/// The (path, verb) pair that scopes idempotency keys, so the same key string on two different endpoints never
/// collides.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointIdentity {
    pub name: String,
    pub scheme: String,
}

impl EndpointIdentity {
    pub fn new<N: Into<String>, S: Into<String>>(name: N, scheme: S) -> Self {
        Self { name: name.into(), scheme: scheme.into() }
    }
}

impl Display for EndpointIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.scheme, self.name)
    }
}

//--------------------------------------    IdempotencyKey     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    pub fn new<S: Into<String>>(key: S) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for IdempotencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

//--------------------------------------  NewIdempotencyRecord ---------------------------------------------------------
/// A serialized response, ready to be written against an (endpoint, key) triple.
#[derive(Debug, Clone)]
pub struct NewIdempotencyRecord {
    pub endpoint: EndpointIdentity,
    pub key: IdempotencyKey,
    pub response: Vec<u8>,
    pub valid_to: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl NewIdempotencyRecord {
    /// Serializes `response` as JSON and sets the expiry to `now + validity`. `validity` is clamped to
    /// `0..=MAX_IDEMPOTENCY_TTL_SECS` seconds.
    pub fn new<T: Serialize>(
        endpoint: EndpointIdentity,
        key: IdempotencyKey,
        response: &T,
        validity: Duration,
    ) -> Result<Self, IdempotencyError> {
        let response = serde_json::to_vec(response).map_err(|e| IdempotencyError::SerializationError(e.to_string()))?;
        let validity = validity.clamp(Duration::zero(), Duration::seconds(MAX_IDEMPOTENCY_TTL_SECS));
        let created_at = db_now();
        Ok(Self { endpoint, key, response, valid_to: created_at + validity, created_at })
    }
}

//--------------------------------------   IdempotencyClaim    ---------------------------------------------------------
/// Asks the backend to bind an order insert to an (endpoint, key) triple for `validity`.
#[derive(Debug, Clone)]
pub struct IdempotencyClaim {
    pub endpoint: EndpointIdentity,
    pub key: IdempotencyKey,
    pub validity: Duration,
}

impl IdempotencyClaim {
    pub fn new(endpoint: EndpointIdentity, key: IdempotencyKey, validity: Duration) -> Self {
        Self { endpoint, key, validity }
    }

    pub fn record_for(&self, order: &Order) -> Result<NewIdempotencyRecord, IdempotencyError> {
        NewIdempotencyRecord::new(self.endpoint.clone(), self.key.clone(), order, self.validity)
    }
}
