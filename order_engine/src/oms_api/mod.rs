//! # Order management service public API
//!
//! The `oms_api` module exposes the programmatic API of the order management service.
//!
//! * [`order_flow_api`] creates and fetches orders. It enforces idempotency keys and emits an event for every order
//!   that is actually created.
//!
//! # API usage
//!
//! An API instance is created by supplying a database backend that implements the traits in [`crate::traits`], and a
//! publisher for order-created events.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use order_engine::{events::{EventHandlers, EventHooks}, OrderFlowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(url, 25).await?;
//! let handlers = EventHandlers::new(100, EventHooks::default(), Duration::from_millis(100));
//! let api = OrderFlowApi::new(db, Arc::new(handlers.producer()));
//! let worker = handlers.start_handlers(&shutdown_token);
//! let order = api.create_order(&ctx, &endpoint, &key, new_order).await?;
//! ```
pub mod errors;
pub mod order_flow_api;
