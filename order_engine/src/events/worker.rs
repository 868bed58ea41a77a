//! The single consumer of the event queue.
//!
//! The worker takes events off the queue one at a time and awaits the handler for each before taking the next, so
//! events are processed in FIFO order and an event that has started is always finished. It stops when
//! * its owner's cancellation token is cancelled,
//! * [`WorkerHandle::stop`] is called, or
//! * every producer has been dropped and the queue is empty.
use log::*;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::events::Handler;

/// What the worker got through before it stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub processed: u64,
    /// Events still in the queue when the worker stopped. These are lost.
    pub unprocessed: u64,
}

pub struct EventWorker<E: Send + 'static> {
    receiver: mpsc::Receiver<E>,
    handler: Handler<E>,
    shutdown: CancellationToken,
}

impl<E: Send + 'static> EventWorker<E> {
    /// The worker's shutdown token is a child of `owner`, so cancelling `owner` also stops the worker, while stopping the
    /// worker leaves `owner` alone.
    pub fn new(receiver: mpsc::Receiver<E>, handler: Handler<E>, owner: &CancellationToken) -> Self {
        Self { receiver, handler, shutdown: owner.child_token() }
    }

    pub fn start(self) -> WorkerHandle {
        let shutdown = self.shutdown.clone();
        let join = tokio::spawn(self.run());
        WorkerHandle { shutdown, join }
    }

    async fn run(mut self) -> WorkerReport {
        info!("📬️ Event worker started");
        let mut report = WorkerReport::default();
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    info!("📬️ Event worker received the shutdown signal");
                    break;
                }
                event = self.receiver.recv() => match event {
                    Some(event) => {
                        (self.handler)(event).await;
                        report.processed += 1;
                        trace!("📬️ Event handled ({} so far)", report.processed);
                    },
                    None => {
                        debug!("📬️ All event producers have gone away");
                        break;
                    },
                }
            }
        }
        self.receiver.close();
        while self.receiver.try_recv().is_ok() {
            report.unprocessed += 1;
        }
        if report.unprocessed > 0 {
            warn!("📬️ Event worker stopped with {} unprocessed events in the queue", report.unprocessed);
        }
        info!("📬️ Event worker has shut down after processing {} events", report.processed);
        report
    }
}

pub struct WorkerHandle {
    shutdown: CancellationToken,
    join: JoinHandle<WorkerReport>,
}

impl WorkerHandle {
    /// Signals the worker to stop once the event it is currently handling, if any, is done.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    /// Waits for the worker task to end. Call [`WorkerHandle::stop`] first unless the owner token has been cancelled.
    pub async fn join(self) -> WorkerReport {
        match self.join.await {
            Ok(report) => report,
            Err(e) => {
                error!("📬️ Event worker task failed: {e}");
                WorkerReport::default()
            },
        }
    }

    pub async fn shutdown(self) -> WorkerReport {
        self.stop();
        self.join().await
    }
}
