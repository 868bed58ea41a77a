//! # Postgres Database methods
//!
//! The Postgres counterparts of the SQLite functions. Each function accepts a `&mut PgConnection`, so it can run
//! against a pooled connection or inside a transaction.
use log::info;
use sqlx::{postgres::PgPoolOptions, Error as SqlxError, PgPool};

pub mod idempotency;
pub mod orders;

pub async fn new_pool(url: &str, max_connections: u32) -> Result<PgPool, SqlxError> {
    info!("🗃️ Opening Postgres connection pool ({max_connections} connections max)");
    let pool = PgPoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
