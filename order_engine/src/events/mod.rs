mod channel;
mod event_types;
mod hooks;
mod worker;

pub use channel::{EventProducer, EventPublisher, EventQueue, Handler, PublishOutcome};
pub use event_types::*;
pub use hooks::{simulated_fulfilment, EventHandlers, EventHooks, DEFAULT_PROCESSING_DELAY};
pub use worker::{EventWorker, WorkerHandle, WorkerReport};
