use crate::{
    db_types::{IdempotencyClaim, NewOrder},
    traits::{IdempotencyManagement, InsertOrderResult, OrderManagement, OrderStoreError},
};

/// How many times a backend should retry an idempotent insert when the record that blocked its claim has expired by the
/// time it is read back.
pub const MAX_CLAIM_ATTEMPTS: usize = 2;

/// This trait defines the highest level of behaviour for backends supporting the order management service.
#[allow(async_fn_in_trait)]
pub trait OrderStoreDatabase: Clone + OrderManagement + IdempotencyManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Takes a new order, and in a single atomic transaction,
    /// * inserts the order (see [`OrderManagement::insert_order`]),
    /// * writes the new order as the cached response for the claim's (endpoint, key) triple, but only if there is no
    ///   live record for that triple already. An expired record is overwritten.
    ///
    /// If a live record exists, the transaction is rolled back and the existing response is returned as
    /// [`InsertOrderResult::AlreadyExists`]. If writing the idempotency record fails for any other reason, only that
    /// write is rolled back; the order is committed and `response_stored` is false.
    async fn insert_order_idempotently(
        &self,
        order: NewOrder,
        claim: IdempotencyClaim,
    ) -> Result<InsertOrderResult, OrderStoreError>;
}
