use std::{fmt::Debug, sync::Arc};

use chrono::Duration;
use log::*;

use crate::{
    db_types::{EndpointIdentity, IdempotencyClaim, IdempotencyKey, NewOrder, Order, OrderId},
    events::{EventPublisher, OrderCreatedEvent, PublishOutcome},
    oms_api::errors::OrderFlowError,
    request_context::RequestContext,
    traits::{IdempotencyError, InsertOrderResult, OrderStoreDatabase},
};

/// How long, in seconds, a response stays bound to its idempotency key unless configured otherwise.
pub const DEFAULT_IDEMPOTENCY_TTL_SECS: i64 = 600;
/// The longest a response can stay bound to its idempotency key. Longer validity windows are cut down to this.
pub const MAX_IDEMPOTENCY_TTL_SECS: i64 = 30 * 24 * 60 * 60;

/// `OrderFlowApi` is the primary API for creating orders.
///
/// Every order creation is tied to an idempotency key, scoped by the endpoint that received it. Repeating a request
/// with the same key while its record is still valid returns the order from the first request, and nothing else
/// happens: no new order is stored and no event is published.
pub struct OrderFlowApi<B> {
    db: B,
    publisher: Arc<dyn EventPublisher<OrderCreatedEvent>>,
    idempotency_ttl: Duration,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi (idempotency ttl: {}s)", self.idempotency_ttl.num_seconds())
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, publisher: Arc<dyn EventPublisher<OrderCreatedEvent>>) -> Self {
        Self { db, publisher, idempotency_ttl: Duration::seconds(DEFAULT_IDEMPOTENCY_TTL_SECS) }
    }

    /// Sets the idempotency validity window. Values outside `0..=MAX_IDEMPOTENCY_TTL_SECS` seconds are clamped.
    pub fn with_idempotency_ttl(mut self, ttl: Duration) -> Self {
        let max = Duration::seconds(MAX_IDEMPOTENCY_TTL_SECS);
        if ttl < Duration::zero() || ttl > max {
            warn!("🔄️📦️ Idempotency ttl of {}s is out of range. Clamping it.", ttl.num_seconds());
        }
        self.idempotency_ttl = ttl.clamp(Duration::zero(), max);
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> OrderFlowApi<B>
where B: OrderStoreDatabase
{
    /// Creates a new order, unless the idempotency key has already been used on this endpoint.
    ///
    /// 1. The idempotency store is consulted. A valid cached response is returned as is. A cached response that cannot
    ///    be read, or a failing idempotency store, is logged and treated as if there were no record.
    /// 2. The order is stored, and the key is claimed for it, in a single transaction. If another request claimed the
    ///    key in the meantime, its order is returned instead and ours is discarded. Failure to store the order is the
    ///    only error (besides cancellation) that fails the call. Failure to store the response is only logged.
    /// 3. An [`OrderCreatedEvent`] is offered to the event queue without waiting. If the queue is full, or `ctx` has been
    ///    cancelled by now, the event is dropped and the order is still returned.
    ///
    /// Steps 1 and 2 give up with [`OrderFlowError::Cancelled`] as soon as `ctx` is cancelled. A store call that has
    /// already finished when the cancellation is noticed is kept.
    pub async fn create_order(
        &self,
        ctx: &RequestContext,
        endpoint: &EndpointIdentity,
        key: &IdempotencyKey,
        order: NewOrder,
    ) -> Result<Order, OrderFlowError> {
        if ctx.is_cancelled() {
            return Err(OrderFlowError::Cancelled);
        }
        if let Some(cached) = self.cached_response(ctx, endpoint, key).await? {
            info!("🔄️📦️ Replaying order {} for [{endpoint}] key {key}", cached.id);
            return Ok(cached);
        }

        let claim = IdempotencyClaim::new(endpoint.clone(), key.clone(), self.idempotency_ttl);
        let result = tokio::select! {
            biased;
            result = self.db.insert_order_idempotently(order.clone(), claim.clone()) => result?,
            _ = ctx.cancelled() => {
                warn!("🔄️📦️ Request for [{endpoint}] key {key} was cancelled before the order was stored");
                return Err(OrderFlowError::Cancelled);
            }
        };
        let order = match result {
            InsertOrderResult::Inserted { order, response_stored } => {
                if !response_stored {
                    warn!(
                        "🔄️📦️ Order {} was stored, but its response could not be saved against key {key}. A retry with \
                         the same key will create another order.",
                        order.id
                    );
                }
                order
            },
            InsertOrderResult::AlreadyExists(response) => match serde_json::from_slice::<Order>(&response) {
                Ok(existing) => {
                    info!("🔄️📦️ Key {key} was claimed by a concurrent request. Returning order {}", existing.id);
                    return Ok(existing);
                },
                Err(e) => {
                    warn!("🔄️📦️ The response stored against key {key} is unreadable ({e}). Creating a new order.");
                    self.insert_and_remember(ctx, &claim, order).await?
                },
            },
        };

        self.publish_order_created(ctx, &order);
        debug!("🔄️📦️ Order {} created for customer {}", order.id, order.customer_id);
        Ok(order)
    }

    pub async fn fetch_order_by_id(&self, id: &OrderId) -> Result<Order, OrderFlowError> {
        let order = self.db.fetch_order_by_id(id).await?;
        Ok(order)
    }

    /// Returns the order cached against the key, if there is a readable one.
    async fn cached_response(
        &self,
        ctx: &RequestContext,
        endpoint: &EndpointIdentity,
        key: &IdempotencyKey,
    ) -> Result<Option<Order>, OrderFlowError> {
        let lookup = tokio::select! {
            biased;
            lookup = self.db.fetch_response(endpoint, key) => lookup,
            _ = ctx.cancelled() => return Err(OrderFlowError::Cancelled),
        };
        match lookup {
            Ok(response) => match serde_json::from_slice::<Order>(&response) {
                Ok(order) => Ok(Some(order)),
                Err(e) => {
                    warn!("🔄️📦️ Ignoring unreadable response cached against [{endpoint}] key {key}. {e}");
                    Ok(None)
                },
            },
            Err(IdempotencyError::NotFound) => {
                trace!("🔄️📦️ No cached response for [{endpoint}] key {key}");
                Ok(None)
            },
            Err(e) => {
                warn!("🔄️📦️ Idempotency lookup for [{endpoint}] key {key} failed. Carrying on without it. {e}");
                Ok(None)
            },
        }
    }

    /// Stores the order, then overwrites whatever is cached against the claim's key. Only used when the cached record
    /// could not be read, so there is nothing worth preserving.
    async fn insert_and_remember(
        &self,
        ctx: &RequestContext,
        claim: &IdempotencyClaim,
        order: NewOrder,
    ) -> Result<Order, OrderFlowError> {
        let order = tokio::select! {
            biased;
            order = self.db.insert_order(order) => order?,
            _ = ctx.cancelled() => return Err(OrderFlowError::Cancelled),
        };
        let stored = match claim.record_for(&order) {
            Ok(record) => self.db.upsert_response(record).await,
            Err(e) => Err(e),
        };
        if let Err(e) = stored {
            warn!("🔄️📦️ Could not save the response for order {} against key {}. {e}", order.id, claim.key);
        }
        Ok(order)
    }

    fn publish_order_created(&self, ctx: &RequestContext, order: &Order) {
        let event = OrderCreatedEvent::new(order);
        match self.publisher.try_publish(event, ctx) {
            PublishOutcome::Delivered => debug!("🔄️📬️ Order created event for {} queued", order.id),
            PublishOutcome::Cancelled => {
                warn!("🔄️📬️ Request was cancelled. Order created event for {} was not queued", order.id)
            },
            PublishOutcome::Dropped => {
                warn!("🔄️📬️ Event queue is unavailable or full. Order created event for {} was dropped", order.id)
            },
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Mutex;

    use chrono::Utc;
    use mockall::{mock, predicate::eq};
    use order_common::Price;

    use super::*;
    use crate::{
        db_types::{NewIdempotencyRecord, OrderStatusType},
        events::EventQueue,
        traits::{IdempotencyManagement, OrderManagement, OrderStoreError},
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

    #[derive(Default)]
    struct RecordingPublisher {
        events: Mutex<Vec<OrderCreatedEvent>>,
    }

    impl RecordingPublisher {
        fn count(&self) -> usize {
            self.events.lock().unwrap().len()
        }
    }

    impl EventPublisher<OrderCreatedEvent> for RecordingPublisher {
        fn try_publish(&self, event: OrderCreatedEvent, ctx: &RequestContext) -> PublishOutcome {
            if ctx.is_cancelled() {
                return PublishOutcome::Cancelled;
            }
            self.events.lock().unwrap().push(event);
            PublishOutcome::Delivered
        }
    }

    fn endpoint() -> EndpointIdentity {
        EndpointIdentity::new("/orders", "POST")
    }

    fn draft() -> NewOrder {
        NewOrder::new("c1".into(), "p1".into(), 2, Price::try_from(100.5).unwrap())
    }

    fn stored(id: &str) -> Order {
        draft().into_order(OrderId::from(id.to_string()), Utc::now())
    }

    fn api(db: MockOrderStore) -> (OrderFlowApi<MockOrderStore>, Arc<RecordingPublisher>) {
        let publisher = Arc::new(RecordingPublisher::default());
        let api = OrderFlowApi::new(db, Arc::clone(&publisher) as Arc<dyn EventPublisher<OrderCreatedEvent>>);
        (api, publisher)
    }

    #[tokio::test]
    async fn cached_response_is_replayed() {
        let _ = env_logger::try_init();
        let cached = stored("o-1");
        let bytes = serde_json::to_vec(&cached).unwrap();
        let mut db = MockOrderStore::new();
        db.expect_fetch_response()
            .with(eq(endpoint()), eq(IdempotencyKey::new("k1")))
            .returning(move |_, _| Ok(bytes.clone()));
        db.expect_insert_order_idempotently().never();
        let (api, publisher) = api(db);
        let order =
            api.create_order(&RequestContext::new(), &endpoint(), &IdempotencyKey::new("k1"), draft()).await.unwrap();
        assert_eq!(order, cached);
        assert_eq!(publisher.count(), 0);
    }

    #[tokio::test]
    async fn new_order_is_stored_and_published() {
        let _ = env_logger::try_init();
        let mut db = MockOrderStore::new();
        db.expect_fetch_response().returning(|_, _| Err(IdempotencyError::NotFound));
        db.expect_insert_order_idempotently().times(1).returning(|order, claim| {
            assert_eq!(claim.validity, Duration::minutes(10));
            assert_eq!(claim.key.as_str(), "k1");
            let order = order.into_order(OrderId::from("o-2".to_string()), Utc::now());
            Ok(InsertOrderResult::Inserted { order, response_stored: true })
        });
        let (api, publisher) = api(db);
        let order =
            api.create_order(&RequestContext::new(), &endpoint(), &IdempotencyKey::new("k1"), draft()).await.unwrap();
        assert_eq!(order.id.as_str(), "o-2");
        assert_eq!(order.status, OrderStatusType::Created);
        assert_eq!(publisher.count(), 1);
        let events = publisher.events.lock().unwrap();
        assert_eq!(events[0].order_id, order.id);
        assert_eq!(events[0].quantity, 2);
    }

    #[tokio::test]
    async fn idempotency_ttl_is_configurable() {
        let mut db = MockOrderStore::new();
        db.expect_fetch_response().returning(|_, _| Err(IdempotencyError::NotFound));
        db.expect_insert_order_idempotently().returning(|order, claim| {
            assert_eq!(claim.validity, Duration::seconds(30));
            Ok(InsertOrderResult::Inserted { order: order.into_order(OrderId::random(), Utc::now()), response_stored: true })
        });
        let (api, _) = api(db);
        let api = api.with_idempotency_ttl(Duration::seconds(30));
        assert!(api.create_order(&RequestContext::new(), &endpoint(), &IdempotencyKey::new("k"), draft()).await.is_ok());
    }

    #[tokio::test]
    async fn failing_lookup_is_treated_as_a_miss() {
        let _ = env_logger::try_init();
        let mut db = MockOrderStore::new();
        db.expect_fetch_response().returning(|_, _| Err(IdempotencyError::DatabaseError("connection reset".into())));
        db.expect_insert_order_idempotently().times(1).returning(|order, _| {
            Ok(InsertOrderResult::Inserted { order: order.into_order(OrderId::random(), Utc::now()), response_stored: true })
        });
        let (api, publisher) = api(db);
        let result = api.create_order(&RequestContext::new(), &endpoint(), &IdempotencyKey::new("k1"), draft()).await;
        assert!(result.is_ok());
        assert_eq!(publisher.count(), 1);
    }

    #[tokio::test]
    async fn unreadable_cached_response_is_treated_as_a_miss() {
        let mut db = MockOrderStore::new();
        db.expect_fetch_response().returning(|_, _| Ok(b"not json".to_vec()));
        db.expect_insert_order_idempotently().times(1).returning(|order, _| {
            Ok(InsertOrderResult::Inserted { order: order.into_order(OrderId::random(), Utc::now()), response_stored: true })
        });
        let (api, publisher) = api(db);
        let result = api.create_order(&RequestContext::new(), &endpoint(), &IdempotencyKey::new("k1"), draft()).await;
        assert!(result.is_ok());
        assert_eq!(publisher.count(), 1);
    }

    #[tokio::test]
    async fn concurrent_winner_is_returned() {
        let winner = stored("o-winner");
        let bytes = serde_json::to_vec(&winner).unwrap();
        let mut db = MockOrderStore::new();
        db.expect_fetch_response().returning(|_, _| Err(IdempotencyError::NotFound));
        db.expect_insert_order_idempotently()
            .returning(move |_, _| Ok(InsertOrderResult::AlreadyExists(bytes.clone())));
        let (api, publisher) = api(db);
        let order =
            api.create_order(&RequestContext::new(), &endpoint(), &IdempotencyKey::new("k1"), draft()).await.unwrap();
        assert_eq!(order, winner);
        assert_eq!(publisher.count(), 0);
    }

    #[tokio::test]
    async fn unreadable_winner_falls_back_to_plain_insert() {
        let mut db = MockOrderStore::new();
        db.expect_fetch_response().returning(|_, _| Err(IdempotencyError::NotFound));
        db.expect_insert_order_idempotently().returning(|_, _| Ok(InsertOrderResult::AlreadyExists(vec![0xff])));
        db.expect_insert_order()
            .times(1)
            .returning(|order| Ok(order.into_order(OrderId::from("o-3".to_string()), Utc::now())));
        db.expect_upsert_response().times(1).returning(|record| {
            assert_eq!(record.key.as_str(), "k1");
            Err(IdempotencyError::DatabaseError("disk full".into()))
        });
        let (api, publisher) = api(db);
        let order =
            api.create_order(&RequestContext::new(), &endpoint(), &IdempotencyKey::new("k1"), draft()).await.unwrap();
        assert_eq!(order.id.as_str(), "o-3");
        assert_eq!(publisher.count(), 1);
    }

    #[tokio::test]
    async fn store_failure_is_fatal() {
        let mut db = MockOrderStore::new();
        db.expect_fetch_response().returning(|_, _| Err(IdempotencyError::NotFound));
        db.expect_insert_order_idempotently().returning(|_, _| Err(OrderStoreError::DatabaseError("boom".into())));
        let (api, publisher) = api(db);
        let err = api
            .create_order(&RequestContext::new(), &endpoint(), &IdempotencyKey::new("k1"), draft())
            .await
            .expect_err("insert should have failed");
        assert!(matches!(err, OrderFlowError::DatabaseError(_)));
        assert_eq!(publisher.count(), 0);
    }

    #[tokio::test]
    async fn unsaved_response_does_not_fail_the_request() {
        let mut db = MockOrderStore::new();
        db.expect_fetch_response().returning(|_, _| Err(IdempotencyError::NotFound));
        db.expect_insert_order_idempotently().returning(|order, _| {
            Ok(InsertOrderResult::Inserted { order: order.into_order(OrderId::random(), Utc::now()), response_stored: false })
        });
        let (api, publisher) = api(db);
        let result = api.create_order(&RequestContext::new(), &endpoint(), &IdempotencyKey::new("k1"), draft()).await;
        assert!(result.is_ok());
        assert_eq!(publisher.count(), 1);
    }

    #[tokio::test]
    async fn cancelled_request_stores_nothing() {
        let mut db = MockOrderStore::new();
        db.expect_fetch_response().never();
        db.expect_insert_order_idempotently().never();
        let (api, publisher) = api(db);
        let ctx = RequestContext::new();
        ctx.cancel();
        let err = api
            .create_order(&ctx, &endpoint(), &IdempotencyKey::new("k1"), draft())
            .await
            .expect_err("request should have been cancelled");
        assert!(matches!(err, OrderFlowError::Cancelled));
        assert_eq!(publisher.count(), 0);
    }

    #[tokio::test]
    async fn cancellation_after_insert_only_drops_the_event() {
        let ctx = RequestContext::new();
        let ctx2 = ctx.clone();
        let mut db = MockOrderStore::new();
        db.expect_fetch_response().returning(|_, _| Err(IdempotencyError::NotFound));
        db.expect_insert_order_idempotently().returning(move |order, _| {
            ctx2.cancel();
            Ok(InsertOrderResult::Inserted { order: order.into_order(OrderId::random(), Utc::now()), response_stored: true })
        });
        let queue = EventQueue::<OrderCreatedEvent>::new(10);
        let api = OrderFlowApi::new(db, Arc::new(queue.subscribe()));
        let result = api.create_order(&ctx, &endpoint(), &IdempotencyKey::new("k1"), draft()).await;
        assert!(result.is_ok());
        let mut rx = queue.into_receiver();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn full_queue_does_not_fail_the_request() {
        let mut db = MockOrderStore::new();
        db.expect_fetch_response().returning(|_, _| Err(IdempotencyError::NotFound));
        db.expect_insert_order_idempotently().returning(|order, _| {
            Ok(InsertOrderResult::Inserted { order: order.into_order(OrderId::random(), Utc::now()), response_stored: true })
        });
        let queue = EventQueue::<OrderCreatedEvent>::new(1);
        let api = OrderFlowApi::new(db, Arc::new(queue.subscribe()));
        let ctx = RequestContext::new();
        let first = api.create_order(&ctx, &endpoint(), &IdempotencyKey::new("k1"), draft()).await.unwrap();
        let second = api.create_order(&ctx, &endpoint(), &IdempotencyKey::new("k2"), draft()).await.unwrap();
        assert_ne!(first.id, second.id);
        let mut rx = queue.into_receiver();
        assert_eq!(rx.recv().await.map(|e| e.order_id), Some(first.id));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn fetch_preserves_not_found() {
        let mut db = MockOrderStore::new();
        db.expect_fetch_order_by_id().returning(|id| Err(OrderStoreError::OrderNotFound(id.clone())));
        let (api, _) = api(db);
        let err = api.fetch_order_by_id(&OrderId::from("missing".to_string())).await.unwrap_err();
        assert!(matches!(err, OrderFlowError::OrderNotFound(id) if id.as_str() == "missing"));
    }
}
