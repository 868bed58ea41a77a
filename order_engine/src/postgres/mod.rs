//! Postgres backend for the order store. Enabled with the `postgres` feature.
mod postgres_impl;

pub mod db;
pub use postgres_impl::PostgresDatabase;
