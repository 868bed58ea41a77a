use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use log::*;
use tokio_util::sync::CancellationToken;

use crate::events::{EventProducer, EventQueue, EventWorker, Handler, OrderCreatedEvent, WorkerHandle};

pub const DEFAULT_PROCESSING_DELAY: Duration = Duration::from_millis(100);

/// The stock order-created handler. It stands in for notifications, inventory updates and the like by waiting for
/// `delay` and logging the order.
pub fn simulated_fulfilment(delay: Duration) -> Handler<OrderCreatedEvent> {
    Arc::new(move |event: OrderCreatedEvent| {
        Box::pin(async move {
            debug!("📦️ Processing order {} for customer {}", event.order_id, event.customer_id);
            tokio::time::sleep(delay).await;
            info!(
                "📦️ Order {} processed: {} x {} for {}",
                event.order_id, event.quantity, event.product_id, event.total_price
            );
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    })
}

/// Owns the order-created queue until the worker is started.
pub struct EventHandlers {
    queue: EventQueue<OrderCreatedEvent>,
    on_order_created: Handler<OrderCreatedEvent>,
}

impl EventHandlers {
    /// If `hooks` carries no order-created handler, [`simulated_fulfilment`] with `processing_delay` is used.
    pub fn new(buffer_size: usize, hooks: EventHooks, processing_delay: Duration) -> Self {
        let on_order_created = hooks.on_order_created.unwrap_or_else(|| simulated_fulfilment(processing_delay));
        Self { queue: EventQueue::new(buffer_size), on_order_created }
    }

    pub fn producer(&self) -> EventProducer<OrderCreatedEvent> {
        self.queue.subscribe()
    }

    /// Spawns the worker. It stops when `shutdown` is cancelled or when the returned handle is told to stop.
    pub fn start_handlers(self, shutdown: &CancellationToken) -> WorkerHandle {
        debug!("📬️ Starting order-created worker with a queue of {} events", self.queue.capacity());
        EventWorker::new(self.queue.into_receiver(), self.on_order_created, shutdown).start()
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_created: Option<Handler<OrderCreatedEvent>>,
}

impl EventHooks {
    pub fn on_order_created<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderCreatedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_created = Some(Arc::new(f));
        self
    }
}
