use actix_web::http::StatusCode;
use order_engine::{
    db_types::OrderId,
    traits::{IdempotencyError, InsertOrderResult, OrderStoreError},
};

use super::{
    helpers::{configure, get_request, post_request, sample_order, CREATE_ORDER_BODY, SAMPLE_ORDER_JSON},
    mocks::MockOrderStore,
};

#[actix_web::test]
async fn create_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store.expect_fetch_response().times(1).returning(|endpoint, key| {
        assert_eq!(endpoint.name, "/orders");
        assert_eq!(endpoint.scheme, "POST");
        assert_eq!(key.as_str(), "key-1");
        Err(IdempotencyError::NotFound)
    });
    store.expect_insert_order_idempotently().times(1).returning(|order, claim| {
        assert_eq!(order.customer_id, "cust-1");
        assert_eq!(order.quantity, 2);
        assert_eq!(claim.key.as_str(), "key-1");
        Ok(InsertOrderResult::Inserted { order: sample_order(), response_stored: true })
    });
    let (config, queue) = configure(store);
    let (status, body) = post_request("/orders", CREATE_ORDER_BODY, config).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, SAMPLE_ORDER_JSON);
    let mut events = queue.into_receiver();
    let event = events.try_recv().expect("Expected an OrderCreated event");
    assert_eq!(event.order_id, sample_order().id);
    assert!(events.try_recv().is_err());
}

#[actix_web::test]
async fn replayed_order_is_returned_with_created_status() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store
        .expect_fetch_response()
        .times(1)
        .returning(|_, _| Ok(serde_json::to_vec(&sample_order()).unwrap()));
    store.expect_insert_order_idempotently().never();
    let (config, queue) = configure(store);
    let (status, body) = post_request("/orders", CREATE_ORDER_BODY, config).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, SAMPLE_ORDER_JSON);
    assert!(queue.into_receiver().try_recv().is_err(), "Replays must not publish events");
}

#[actix_web::test]
async fn malformed_body() {
    let _ = env_logger::try_init().ok();
    let (config, _queue) = configure(MockOrderStore::new());
    let (status, body) = post_request("/orders", r#"{"customer_id": "cust-1""#, config).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["error"], "Invalid request body");
    assert!(body["details"].is_string());
}

#[actix_web::test]
async fn missing_idempotency_key() {
    let _ = env_logger::try_init().ok();
    let (config, _queue) = configure(MockOrderStore::new());
    let body = r#"{"customer_id":"cust-1","product_id":"prod-9","quantity":2,"total_price":100.5,"idempotency_key":"  "}"#;
    let (status, body) = post_request("/orders", body, config).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"details":"idempotency_key is required","error":"Invalid request body"}"#);
}

#[actix_web::test]
async fn zero_quantity() {
    let _ = env_logger::try_init().ok();
    let (config, _queue) = configure(MockOrderStore::new());
    let body = r#"{"customer_id":"cust-1","product_id":"prod-9","quantity":0,"total_price":100.5,"idempotency_key":"k"}"#;
    let (status, body) = post_request("/orders", body, config).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"details":"quantity must be at least 1, got 0","error":"Invalid request body"}"#);
}

#[actix_web::test]
async fn negative_price() {
    let _ = env_logger::try_init().ok();
    let (config, _queue) = configure(MockOrderStore::new());
    let body = r#"{"customer_id":"cust-1","product_id":"prod-9","quantity":1,"total_price":-5.0,"idempotency_key":"k"}"#;
    let (status, body) = post_request("/orders", body, config).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["error"], "Invalid request body");
    assert!(body["details"].as_str().unwrap().starts_with("total_price"));
}

#[actix_web::test]
async fn store_failure() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store.expect_fetch_response().returning(|_, _| Err(IdempotencyError::NotFound));
    store
        .expect_insert_order_idempotently()
        .returning(|_, _| Err(OrderStoreError::DatabaseError("connection reset".into())));
    let (config, queue) = configure(store);
    let (status, body) = post_request("/orders", CREATE_ORDER_BODY, config).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, r#"{"error":"Failed to create order"}"#);
    assert!(queue.into_receiver().try_recv().is_err());
}

#[actix_web::test]
async fn fetch_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store.expect_fetch_order_by_id().times(1).returning(|id| {
        assert_eq!(id.as_str(), "8f8e2b0c-5a1e-4c1a-9a43-3f3c2e1d0b7a");
        Ok(sample_order())
    });
    let (config, _queue) = configure(store);
    let (status, body) = get_request("/orders/8f8e2b0c-5a1e-4c1a-9a43-3f3c2e1d0b7a", config).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, SAMPLE_ORDER_JSON);
}

#[actix_web::test]
async fn fetch_unknown_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store.expect_fetch_order_by_id().returning(|id| Err(OrderStoreError::OrderNotFound(id.clone())));
    let (config, _queue) = configure(store);
    let (status, body) = get_request("/orders/no-such-order", config).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"error":"Order not found"}"#);
}

#[actix_web::test]
async fn fetch_blank_order_id() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store.expect_fetch_order_by_id().never();
    let (config, _queue) = configure(store);
    let (status, body) = get_request("/orders/%20%20", config).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"Order ID is required"}"#);
}

#[actix_web::test]
async fn fetch_order_store_failure() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store
        .expect_fetch_order_by_id()
        .returning(|_| Err(OrderStoreError::DatabaseError("pool timed out".into())));
    let (config, _queue) = configure(store);
    let (status, body) = get_request(&format!("/orders/{}", OrderId::random()), config).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, r#"{"error":"Failed to retrieve order"}"#);
}
