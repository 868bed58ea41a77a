//! # Order management server
//! This crate hosts the HTTP front end of the order management system. It is responsible for:
//! * Accepting order creation requests and passing them through the idempotent order flow in `order_engine`.
//! * Serving orders by id.
//! * Running the background event worker and the idempotency record purge job, and shutting both down cleanly.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/healthz`: A health check route that returns a 200 OK response.
//! * `POST /orders`: Create an order. Retries carrying the same `idempotency_key` get the original order back.
//! * `GET /orders/{id}`: Fetch a single order.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod expiry_worker;
pub mod routes;
pub mod server;
