//! Bounded, in-process event queue
//!
//! Any number of [`EventProducer`]s feed a single fixed-capacity FIFO, which is drained by exactly one
//! [`super::EventWorker`]. Producers never wait. If the queue is full or closed, or the caller's request has already
//! been cancelled, the event is dropped and the caller is told so via [`PublishOutcome`].
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::request_context::RequestContext;

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The event is in the queue and will be processed by the worker.
    Delivered,
    /// The request context was cancelled before the event could be handed over.
    Cancelled,
    /// The queue was full, or the worker has shut down.
    Dropped,
}

/// Anything that can take an event off a request's hands without blocking.
pub trait EventPublisher<E>: Send + Sync {
    fn try_publish(&self, event: E, ctx: &RequestContext) -> PublishOutcome;
}

pub struct EventQueue<E: Send + 'static> {
    sender: mpsc::Sender<E>,
    receiver: mpsc::Receiver<E>,
    capacity: usize,
}

impl<E: Send + 'static> EventQueue<E> {
    /// Creates a queue that holds at most `capacity` events. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        Self { sender, receiver, capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.sender.clone())
    }

    /// Splits the queue into its consuming half. The queue's own sender is dropped, so once every producer is gone the
    /// receiver reports the channel as closed.
    pub fn into_receiver(self) -> mpsc::Receiver<E> {
        drop(self.sender);
        self.receiver
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send> {
    sender: mpsc::Sender<E>,
}

impl<E: Send> EventProducer<E> {
    pub fn new(sender: mpsc::Sender<E>) -> Self {
        Self { sender }
    }
}

impl<E: Send> EventPublisher<E> for EventProducer<E> {
    fn try_publish(&self, event: E, ctx: &RequestContext) -> PublishOutcome {
        if ctx.is_cancelled() {
            debug!("📬️ Request was cancelled. Event not queued");
            return PublishOutcome::Cancelled;
        }
        match self.sender.try_send(event) {
            Ok(()) => {
                trace!("📬️ Event queued");
                PublishOutcome::Delivered
            },
            Err(TrySendError::Full(_)) => {
                debug!("📬️ Event queue is full. Event dropped");
                PublishOutcome::Dropped
            },
            Err(TrySendError::Closed(_)) => {
                debug!("📬️ Event queue is closed. Event dropped");
                PublishOutcome::Dropped
            },
        }
    }
}
