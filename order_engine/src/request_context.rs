//! Per-request cancellation.
//!
//! A [`RequestContext`] pairs a [`CancellationToken`] with an optional deadline. The HTTP layer creates one per request;
//! the order flow races its store calls against [`RequestContext::cancelled`] and checks
//! [`RequestContext::is_cancelled`] before handing events to the queue.
use std::time::Duration;

use log::debug;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// A context with no deadline. It is only cancelled by calling [`RequestContext::cancel`].
    pub fn new() -> Self {
        Self::default()
    }

    /// A context that is considered cancelled once `timeout` has elapsed. A timeout too large to represent as an
    /// instant means no deadline at all.
    pub fn with_timeout(timeout: Duration) -> Self {
        let deadline = Instant::now().checked_add(timeout);
        if deadline.is_none() {
            debug!("Request timeout of {timeout:?} is out of range. The request has no deadline.");
        }
        Self { token: CancellationToken::new(), deadline }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || self.deadline.map(|d| Instant::now() >= d).unwrap_or(false)
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn cancelled(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => {},
                    _ = tokio::time::sleep_until(deadline) => {},
                }
            },
            None => self.token.cancelled().await,
        }
    }
}
