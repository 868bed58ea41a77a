use thiserror::Error;

use crate::db_types::{EndpointIdentity, IdempotencyKey, NewIdempotencyRecord};

/// Durable storage for responses that have already been produced for an idempotency key.
///
/// Records are keyed by the triple (endpoint name, endpoint scheme, key). A record whose `valid_to` has passed must
/// be indistinguishable from a record that was never written.
#[allow(async_fn_in_trait)]
pub trait IdempotencyManagement {
    /// Returns the stored response for the triple, if one exists and has not expired.
    async fn fetch_response(
        &self,
        endpoint: &EndpointIdentity,
        key: &IdempotencyKey,
    ) -> Result<Vec<u8>, IdempotencyError>;

    /// Writes the record, replacing the response and expiry of any existing record for the same triple.
    async fn upsert_response(&self, record: NewIdempotencyRecord) -> Result<(), IdempotencyError>;

    /// Deletes every record that has expired, returning how many were removed.
    async fn purge_expired_responses(&self) -> Result<u64, IdempotencyError>;
}

#[derive(Debug, Clone, Error)]
pub enum IdempotencyError {
    #[error("Idempotency record not found")]
    NotFound,
    #[error("Could not serialize the response for the idempotency record. {0}")]
    SerializationError(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for IdempotencyError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => IdempotencyError::NotFound,
            e => IdempotencyError::DatabaseError(e.to_string()),
        }
    }
}
