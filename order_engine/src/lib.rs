//! Order Engine
//!
//! This library contains the core logic of the order management service. It knows nothing about HTTP.
//!
//! The library is divided into these sections:
//! 1. Database management ([`mod@traits`] and the backends). Currently, SQLite and Postgres are the two supported
//!    backends. You should never need to access the database directly. Instead, use the public API provided by the
//!    engine. The exception is the data types used in the database. These are defined in the `db_types` module and are
//!    public.
//! 2. The public API ([`mod@oms_api`]). [`OrderFlowApi`] creates orders exactly once per idempotency key and fetches
//!    them back.
//! 3. Events ([`mod@events`]). Every newly created order is offered to a bounded in-memory queue, which a single
//!    background worker drains. Hooks let you decide what the worker does with each event.
pub mod db_types;
pub mod events;
pub mod helpers;
mod oms_api;
pub mod request_context;
pub mod traits;

#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use oms_api::{
    errors::OrderFlowError,
    order_flow_api::{OrderFlowApi, DEFAULT_IDEMPOTENCY_TTL_SECS, MAX_IDEMPOTENCY_TTL_SECS},
};
#[cfg(feature = "postgres")]
pub use postgres::PostgresDatabase;
#[cfg(feature = "sqlite")]
pub use sqlite::{db::SQLITE_DB_URL, SqliteDatabase};
pub use traits::{
    IdempotencyError,
    IdempotencyManagement,
    InsertOrderResult,
    OrderManagement,
    OrderStoreDatabase,
    OrderStoreError,
};
