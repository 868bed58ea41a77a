use std::time::Duration;

use log::*;
use order_engine::traits::IdempotencyManagement;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// The shortest interval the purge worker accepts.
pub const MIN_PURGE_INTERVAL: Duration = Duration::from_secs(1);

/// Starts the idempotency record purge worker. It deletes expired records every `interval` until `shutdown` is
/// cancelled. Intervals shorter than [`MIN_PURGE_INTERVAL`] are raised to it.
///
/// The worker runs on the current thread's local task set, so it must be started from within the actix runtime.
pub fn start_expiry_worker<B>(db: B, interval: Duration, shutdown: CancellationToken) -> JoinHandle<()>
where B: IdempotencyManagement + 'static {
    if interval < MIN_PURGE_INTERVAL {
        warn!("🕰️ Purge interval of {interval:?} is too short. Using {MIN_PURGE_INTERVAL:?} instead.");
    }
    let interval = interval.max(MIN_PURGE_INTERVAL);
    actix_web::rt::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        // The first tick completes immediately. Skip it so that the first purge happens one interval after startup.
        timer.tick().await;
        info!("🕰️ Idempotency record purge worker started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = timer.tick() => {},
            }
            trace!("🕰️ Running idempotency record purge job");
            match db.purge_expired_responses().await {
                Ok(0) => trace!("🕰️ No expired idempotency records"),
                Ok(n) => info!("🕰️ {n} expired idempotency records purged"),
                Err(e) => error!("🕰️ Error running idempotency record purge job: {e}"),
            }
        }
        info!("🕰️ Idempotency record purge worker has stopped");
    })
}
