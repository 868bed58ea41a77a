//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, etc.) should be expressed as
//! futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus don’t block
//! execution:
//!
//! ```nocompile
//!     async fn my_handler() -> impl Responder {
//!         tokio::time::sleep(Duration::from_secs(5)).await; // <-- Ok. Worker thread will handle other requests here
//!     }
//! ```
use std::time::Duration;

use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use order_engine::{
    db_types::{EndpointIdentity, OrderId},
    request_context::RequestContext,
    traits::OrderStoreDatabase,
    OrderFlowApi,
};
use serde_json::json;

use crate::{data_objects::CreateOrderRequest, errors::ServerError};

/// Per-request settings shared by the handlers.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub request_timeout: Duration,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self { request_timeout: Duration::from_secs(30) }
    }
}

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/healthz")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().json(json!({ "status": "healthy" }))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(create_order => Post "/orders" impl OrderStoreDatabase);
/// Route handler for `POST /orders`
///
/// The body is a JSON [`CreateOrderRequest`]. The `idempotency_key` field is mandatory: repeating a request with the
/// same key within the validity window returns the order created by the first request, with the same `201` status.
///
/// The body is parsed by hand rather than with `web::Json`, so that malformed and invalid bodies both produce the same
/// `400` response shape.
pub async fn create_order<B: OrderStoreDatabase>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<OrderFlowApi<B>>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let request = serde_json::from_slice::<CreateOrderRequest>(&body).map_err(|e| {
        debug!("💻️ Could not parse order request. {e}");
        ServerError::InvalidRequestBody(e.to_string())
    })?;
    let (new_order, key) = request.validate().map_err(|e| {
        debug!("💻️ Rejected order request. {e}");
        ServerError::InvalidRequestBody(e)
    })?;
    let endpoint = EndpointIdentity::new(req.path(), req.method().as_str());
    let ctx = RequestContext::with_timeout(options.request_timeout);
    debug!("💻️ POST order for customer {} with key {key}", new_order.customer_id);
    let order = api.create_order(&ctx, &endpoint, &key, new_order).await.map_err(|e| {
        error!("💻️ Could not create order for key {key}. {e}");
        ServerError::OrderCreationFailed(e.to_string())
    })?;
    Ok(HttpResponse::Created().json(order))
}

route!(order_by_id => Get "/orders/{id}" impl OrderStoreDatabase);
/// Route handler for `GET /orders/{id}`
pub async fn order_by_id<B: OrderStoreDatabase>(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    if id.trim().is_empty() {
        return Err(ServerError::MissingOrderId);
    }
    let id = OrderId::from(id);
    debug!("💻️ GET order {id}");
    let order = api.fetch_order_by_id(&id).await.map_err(|e| {
        debug!("💻️ Could not fetch order {id}. {e}");
        ServerError::from(e)
    })?;
    Ok(HttpResponse::Ok().json(order))
}
