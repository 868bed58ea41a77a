use crate::db_types::Order;

/// The outcome of [`super::OrderStoreDatabase::insert_order_idempotently`].
#[derive(Debug, Clone)]
pub enum InsertOrderResult {
    /// The order was written. `response_stored` is false if the idempotency record could not be written; the order
    /// is kept regardless.
    Inserted { order: Order, response_stored: bool },
    /// Another request already holds a live record for the key. Nothing was written, and this is the serialized
    /// response that was cached for it.
    AlreadyExists(Vec<u8>),
}
