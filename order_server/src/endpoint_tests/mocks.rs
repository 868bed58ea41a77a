use mockall::mock;
use order_engine::{
    db_types::{EndpointIdentity, IdempotencyClaim, IdempotencyKey, NewIdempotencyRecord, NewOrder, Order, OrderId},
    traits::{
        IdempotencyError,
        IdempotencyManagement,
        InsertOrderResult,
        OrderManagement,
        OrderStoreDatabase,
        OrderStoreError,
    },
};

mock! {
    pub OrderStore {}
    impl Clone for OrderStore {
        fn clone(&self) -> Self;
    }
    impl OrderManagement for OrderStore {
        async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderStoreError>;
        async fn fetch_order_by_id(&self, id: &OrderId) -> Result<Order, OrderStoreError>;
    }
    impl IdempotencyManagement for OrderStore {
        async fn fetch_response(&self, endpoint: &EndpointIdentity, key: &IdempotencyKey) -> Result<Vec<u8>, IdempotencyError>;
        async fn upsert_response(&self, record: NewIdempotencyRecord) -> Result<(), IdempotencyError>;
        async fn purge_expired_responses(&self) -> Result<u64, IdempotencyError>;
    }
    impl OrderStoreDatabase for OrderStore {
        fn url(&self) -> &str;
        async fn insert_order_idempotently(&self, order: NewOrder, claim: IdempotencyClaim) -> Result<InsertOrderResult, OrderStoreError>;
    }
}
