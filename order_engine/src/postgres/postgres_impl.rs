//! `PostgresDatabase` is a concrete implementation of an order store backend.
//!
//! Unsurprisingly, it uses Postgres as the backend and implements all the traits defined in the [`traits`] module.
//!
//! [`traits`]: crate::traits
use std::fmt::Debug;

use log::*;
use sqlx::{migrate, Connection, PgPool};

use super::db::{idempotency, new_pool, orders};
use crate::{
    db_types::{EndpointIdentity, IdempotencyClaim, IdempotencyKey, NewIdempotencyRecord, NewOrder, Order, OrderId},
    traits::{
        IdempotencyError,
        IdempotencyManagement,
        InsertOrderResult,
        OrderManagement,
        OrderStoreDatabase,
        OrderStoreError,
        MAX_CLAIM_ATTEMPTS,
    },
};

#[derive(Clone)]
pub struct PostgresDatabase {
    url: String,
    pool: PgPool,
}

impl Debug for PostgresDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "PostgresDatabase ({:?})", self.pool)
    }
}

impl OrderManagement for PostgresDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::insert_order(order, &mut conn).await
    }

    async fn fetch_order_by_id(&self, id: &OrderId) -> Result<Order, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_id(id, &mut conn).await?.ok_or_else(|| OrderStoreError::OrderNotFound(id.clone()))
    }
}

impl IdempotencyManagement for PostgresDatabase {
    async fn fetch_response(
        &self,
        endpoint: &EndpointIdentity,
        key: &IdempotencyKey,
    ) -> Result<Vec<u8>, IdempotencyError> {
        let mut conn = self.pool.acquire().await?;
        idempotency::fetch_response(endpoint, key, &mut conn).await
    }

    async fn upsert_response(&self, record: NewIdempotencyRecord) -> Result<(), IdempotencyError> {
        let mut conn = self.pool.acquire().await?;
        idempotency::upsert_response(&record, &mut conn).await
    }

    async fn purge_expired_responses(&self) -> Result<u64, IdempotencyError> {
        let mut conn = self.pool.acquire().await?;
        idempotency::purge_expired(&mut conn).await
    }
}

impl OrderStoreDatabase for PostgresDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Inserts the order and claims the idempotency triple in a single transaction.
    ///
    /// * If the claim succeeds, both the order and the serialized response are committed together.
    /// * If a live record already owns the triple, the order insert is rolled back and the owner's response is returned.
    /// * If the response cannot be serialized or written, the claim alone is rolled back (via a savepoint) and the order
    ///   is still committed. The caller is told that no response was stored.
    async fn insert_order_idempotently(
        &self,
        order: NewOrder,
        claim: IdempotencyClaim,
    ) -> Result<InsertOrderResult, OrderStoreError> {
        for attempt in 1..=MAX_CLAIM_ATTEMPTS {
            let mut tx = self.pool.begin().await?;
            let new_order = orders::insert_order(order.clone(), &mut tx).await?;
            let record = match claim.record_for(&new_order) {
                Ok(record) => record,
                Err(e) => {
                    warn!("🗃️ Could not serialize order {} for idempotency key {}. {e}", new_order.id, claim.key);
                    tx.commit().await?;
                    return Ok(InsertOrderResult::Inserted { order: new_order, response_stored: false });
                },
            };
            let mut savepoint = Connection::begin(&mut *tx).await?;
            match idempotency::claim_response(&record, &mut savepoint).await {
                Ok(true) => {
                    savepoint.commit().await?;
                    tx.commit().await?;
                    debug!("🗃️ Order {} saved against [{}] key {}", new_order.id, claim.endpoint, claim.key);
                    return Ok(InsertOrderResult::Inserted { order: new_order, response_stored: true });
                },
                Ok(false) => {
                    savepoint.rollback().await?;
                    tx.rollback().await?;
                    debug!("🗃️ [{}] key {} is already claimed. Discarded order {}", claim.endpoint, claim.key, new_order.id);
                    let mut conn = self.pool.acquire().await?;
                    match idempotency::fetch_response(&claim.endpoint, &claim.key, &mut conn).await {
                        Ok(response) => return Ok(InsertOrderResult::AlreadyExists(response)),
                        // The owning record expired between the claim and the read. Try again.
                        Err(IdempotencyError::NotFound) => {
                            debug!("🗃️ Claim on key {} lapsed before it could be read (attempt {attempt})", claim.key);
                        },
                        Err(e) => return Err(OrderStoreError::DatabaseError(e.to_string())),
                    }
                },
                Err(e) => {
                    warn!("🗃️ Could not store the response for idempotency key {}. {e}", claim.key);
                    savepoint.rollback().await?;
                    tx.commit().await?;
                    return Ok(InsertOrderResult::Inserted { order: new_order, response_stored: false });
                },
            }
        }
        Err(OrderStoreError::IdempotencyConflict(claim.key.to_string()))
    }
}

impl PostgresDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Applies any outstanding schema migrations.
    pub async fn run_migrations(&self) -> Result<(), OrderStoreError> {
        migrate!("./src/postgres/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| OrderStoreError::DatabaseError(format!("Migration failed: {e}")))?;
        info!("🗃️ Database migrations are up to date");
        Ok(())
    }

    pub async fn count_orders(&self) -> Result<i64, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::count_orders(&mut conn).await
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
