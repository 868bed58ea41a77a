//! #  Storage contracts
//!
//! This module defines the behaviour a database backend must expose in order to be used by the order management
//! service. The [`crate::OrderFlowApi`] only ever talks to these traits, never to a concrete database.
//!
//! * [`OrderManagement`] stores and fetches orders.
//! * [`IdempotencyManagement`] stores and fetches cached responses keyed by endpoint identity and client key.
//! * [`OrderStoreDatabase`] ties the two together, and adds the atomic "insert order and claim the idempotency key"
//!   operation that keeps two concurrent requests with the same key from both creating an order.
mod data_objects;
mod idempotency_management;
mod order_management;
mod order_store_database;

pub use data_objects::InsertOrderResult;
pub use idempotency_management::{IdempotencyError, IdempotencyManagement};
pub use order_management::{OrderManagement, OrderStoreError};
pub use order_store_database::{OrderStoreDatabase, MAX_CLAIM_ATTEMPTS};
