use log::{debug, trace};
use sqlx::PgConnection;

use crate::{
    db_types::{EndpointIdentity, IdempotencyKey, NewIdempotencyRecord},
    helpers::db_now,
    traits::IdempotencyError,
};

/// Returns the stored response for the (endpoint, key) triple, provided it has not expired.
pub async fn fetch_response(
    endpoint: &EndpointIdentity,
    key: &IdempotencyKey,
    conn: &mut PgConnection,
) -> Result<Vec<u8>, IdempotencyError> {
    let response: Option<Vec<u8>> = sqlx::query_scalar(
        r#"
            SELECT response FROM idempotency_keys
            WHERE endpoint_name = $1 AND endpoint_scheme = $2 AND idempotency_key = $3 AND valid_to > $4
        "#,
    )
    .bind(&endpoint.name)
    .bind(&endpoint.scheme)
    .bind(key.as_str())
    .bind(db_now())
    .fetch_optional(conn)
    .await?;
    trace!("🗃️ Idempotency lookup for [{endpoint}] key {key}: hit = {}", response.is_some());
    response.ok_or(IdempotencyError::NotFound)
}

/// Writes the record unconditionally, replacing whatever was stored against the same triple.
pub async fn upsert_response(record: &NewIdempotencyRecord, conn: &mut PgConnection) -> Result<(), IdempotencyError> {
    sqlx::query(
        r#"
            INSERT INTO idempotency_keys (endpoint_name, endpoint_scheme, idempotency_key, response, valid_to, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (endpoint_name, endpoint_scheme, idempotency_key) DO UPDATE SET
                response = excluded.response,
                valid_to = excluded.valid_to,
                created_at = excluded.created_at
        "#,
    )
    .bind(&record.endpoint.name)
    .bind(&record.endpoint.scheme)
    .bind(record.key.as_str())
    .bind(&record.response)
    .bind(record.valid_to)
    .bind(record.created_at)
    .execute(conn)
    .await?;
    debug!("🗃️ Stored response for [{}] key {} until {}", record.endpoint, record.key, record.valid_to);
    Ok(())
}

/// Attempts to take ownership of the (endpoint, key) triple.
///
/// The record is written if the triple is free, or if the record currently holding it has expired. Returns `false` when
/// a live record already owns the triple, in which case nothing is written.
pub async fn claim_response(record: &NewIdempotencyRecord, conn: &mut PgConnection) -> Result<bool, IdempotencyError> {
    let result = sqlx::query(
        r#"
            INSERT INTO idempotency_keys (endpoint_name, endpoint_scheme, idempotency_key, response, valid_to, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (endpoint_name, endpoint_scheme, idempotency_key) DO UPDATE SET
                response = excluded.response,
                valid_to = excluded.valid_to,
                created_at = excluded.created_at
            WHERE idempotency_keys.valid_to <= excluded.created_at
        "#,
    )
    .bind(&record.endpoint.name)
    .bind(&record.endpoint.scheme)
    .bind(record.key.as_str())
    .bind(&record.response)
    .bind(record.valid_to)
    .bind(record.created_at)
    .execute(conn)
    .await?;
    let claimed = result.rows_affected() > 0;
    trace!("🗃️ Claim on [{}] key {}: {claimed}", record.endpoint, record.key);
    Ok(claimed)
}

/// Deletes every record whose validity has lapsed. Returns the number of records removed.
pub async fn purge_expired(conn: &mut PgConnection) -> Result<u64, IdempotencyError> {
    let result = sqlx::query("DELETE FROM idempotency_keys WHERE valid_to <= $1").bind(db_now()).execute(conn).await?;
    Ok(result.rows_affected())
}
