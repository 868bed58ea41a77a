use std::sync::Arc;

use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web, web::ServiceConfig, App};
use chrono::{TimeZone, Utc};
use log::debug;
use order_common::Price;
use order_engine::{
    db_types::{Order, OrderId, OrderStatusType},
    events::{EventQueue, OrderCreatedEvent},
    OrderFlowApi,
};

use super::mocks::MockOrderStore;
use crate::routes::{CreateOrderRoute, OrderByIdRoute, ServerOptions};

/// Wires the order routes up against a mocked store. The event queue is returned so that tests can inspect the
/// events that were published.
pub fn configure(store: MockOrderStore) -> (impl FnOnce(&mut ServiceConfig), EventQueue<OrderCreatedEvent>) {
    let queue = EventQueue::<OrderCreatedEvent>::new(10);
    let api = OrderFlowApi::new(store, Arc::new(queue.subscribe()));
    let configure = move |cfg: &mut ServiceConfig| {
        cfg.app_data(web::Data::new(api))
            .app_data(web::Data::new(ServerOptions::default()))
            .service(CreateOrderRoute::<MockOrderStore>::new())
            .service(OrderByIdRoute::<MockOrderStore>::new());
    };
    (configure, queue)
}

pub async fn get_request(path: &str, configure: impl FnOnce(&mut ServiceConfig)) -> (StatusCode, String) {
    send(TestRequest::get().uri(path), configure).await
}

pub async fn post_request(path: &str, body: &str, configure: impl FnOnce(&mut ServiceConfig)) -> (StatusCode, String) {
    let req = TestRequest::post()
        .uri(path)
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body.to_string());
    send(req, configure).await
}

async fn send(req: TestRequest, configure: impl FnOnce(&mut ServiceConfig)) -> (StatusCode, String) {
    let req = req.to_request();
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let (_, res) = test::call_service(&service, req).await.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    (status, body)
}

pub fn sample_order() -> Order {
    let t = Utc.with_ymd_and_hms(2024, 10, 15, 9, 30, 0).unwrap();
    Order {
        id: OrderId::from("8f8e2b0c-5a1e-4c1a-9a43-3f3c2e1d0b7a".to_string()),
        customer_id: "cust-1".into(),
        product_id: "prod-9".into(),
        quantity: 2,
        total_price: Price::try_from(100.5).unwrap(),
        status: OrderStatusType::Created,
        order_time: t,
        created_at: t,
        updated_at: t,
    }
}

pub const SAMPLE_ORDER_JSON: &str = r#"{"id":"8f8e2b0c-5a1e-4c1a-9a43-3f3c2e1d0b7a","customer_id":"cust-1","product_id":"prod-9","quantity":2,"total_price":100.5,"status":"created","order_time":"2024-10-15T09:30:00Z","created_at":"2024-10-15T09:30:00Z","updated_at":"2024-10-15T09:30:00Z"}"#;

pub const CREATE_ORDER_BODY: &str =
    r#"{"customer_id":"cust-1","product_id":"prod-9","quantity":2,"total_price":100.5,"idempotency_key":"key-1"}"#;
