use std::{sync::Arc, time::Duration};

use actix_web::{
    dev::{Server, ServerHandle},
    http::KeepAlive,
    middleware::{Condition, Logger},
    web,
    App,
    HttpServer,
};
use log::*;
use order_engine::{
    events::{EventHandlers, EventHooks, EventProducer, OrderCreatedEvent, WorkerHandle, WorkerReport},
    OrderFlowApi,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    expiry_worker::start_expiry_worker,
    routes::{health, CreateOrderRoute, OrderByIdRoute, ServerOptions},
};

/// The storage backend compiled into the server.
#[cfg(feature = "postgres")]
pub type Backend = order_engine::PostgresDatabase;
#[cfg(not(feature = "postgres"))]
pub type Backend = order_engine::SqliteDatabase;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = Backend::new_with_url(&config.database.connection_url(), config.database.max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(format!("Could not connect to the database. {e}")))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;

    let shutdown = CancellationToken::new();
    let handlers = EventHandlers::new(config.event_queue_size, EventHooks::default(), config.event_processing_delay);
    let producer = handlers.producer();
    let worker = handlers.start_handlers(&shutdown);
    let purge_worker = start_expiry_worker(db.clone(), config.idempotency_purge_interval, shutdown.clone());

    info!("🚀️ Serving orders at http://{}:{}", config.hostname, config.port);
    let srv = create_server_instance(&config, db.clone(), producer)?;
    let signals = cancel_on_signal(shutdown.clone());
    let stopper = tokio::spawn(graceful_shutdown(srv.handle(), shutdown.clone(), worker));
    let result = srv.await;

    // The server can also stop by itself (e.g. on a fatal I/O error). Make sure the background workers follow it.
    shutdown.cancel();
    match stopper.await {
        Ok(report) => info!(
            "🚀️ Event worker stopped. {} events processed, {} left unprocessed.",
            report.processed, report.unprocessed
        ),
        Err(e) => warn!("🚀️ Shutdown task failed. {e}"),
    }
    if let Err(e) = signals.await {
        warn!("🚀️ Signal listener failed. {e}");
    }
    if let Err(e) = purge_worker.await {
        warn!("🚀️ Purge worker failed. {e}");
    }
    db.close().await;
    info!("🚀️ Server has shut down");
    result.map_err(ServerError::from)
}

pub fn create_server_instance(
    config: &ServerConfig,
    db: Backend,
    producer: EventProducer<OrderCreatedEvent>,
) -> Result<Server, ServerError> {
    let access_log = config.access_log;
    let idempotency_ttl = config.idempotency_ttl;
    let options = ServerOptions { request_timeout: config.request_timeout };
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), Arc::new(producer.clone())).with_idempotency_ttl(idempotency_ttl);
        App::new()
            .wrap(Condition::new(
                access_log,
                Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("oms::access_log"),
            ))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(options.clone()))
            .service(health)
            .service(CreateOrderRoute::<Backend>::new())
            .service(OrderByIdRoute::<Backend>::new())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .shutdown_timeout(config.shutdown_grace.as_secs())
    .disable_signals()
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Waits for `shutdown` to be cancelled and then shuts everything down in order: the listener stops accepting
/// connections, the event worker is told to stop and is waited for, and in-flight requests get the configured grace
/// period to finish. Resolves with the worker's report once the server has stopped.
pub async fn graceful_shutdown(handle: ServerHandle, shutdown: CancellationToken, worker: WorkerHandle) -> WorkerReport {
    shutdown.cancelled().await;
    debug!("🚀️ Shutting down. No new connections will be accepted.");
    let stopping = handle.stop(true);
    let report = worker.join().await;
    stopping.await;
    report
}

/// Cancels `shutdown` on SIGINT or SIGTERM. The task ends early if something else cancels `shutdown` first.
fn cancel_on_signal(shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = shutdown_signal() => {
                info!("🚀️ Shutdown signal received. Stopping the server.");
                shutdown.cancel();
            },
            _ = shutdown.cancelled() => {},
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("🚀️ Could not listen for Ctrl-C. {e}");
            std::future::pending::<()>().await;
        }
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                error!("🚀️ Could not listen for SIGTERM. {e}");
                std::future::pending::<()>().await;
            },
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
