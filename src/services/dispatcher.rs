//! Background dispatcher
//!
//! A supervised polling loop that drains the ingestion queue: every cycle it
//! claims a bounded batch of pending submissions and spawns one analysis
//! worker task per claim, without waiting for them. Scan failures are logged
//! and retried on the next tick. On cancellation the loop stops claiming and
//! drains in-flight workers before returning, so shutdown never abandons a
//! claimed submission mid-write.

use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::broadcast::BroadcastHub;
use crate::db::submissions;
use crate::engine::EngineRegistry;
use crate::services::AnalysisWorker;

/// Default seconds between queue scans
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Default maximum submissions claimed per cycle
pub const DEFAULT_BATCH_SIZE: i64 = 5;

/// Periodic queue-draining service
pub struct Dispatcher {
    db: SqlitePool,
    worker: AnalysisWorker,
    poll_interval: Duration,
    batch_size: i64,
    cancel: CancellationToken,
}

impl Dispatcher {
    pub fn new(
        db: SqlitePool,
        engines: Arc<EngineRegistry>,
        hub: BroadcastHub,
        poll_interval: Duration,
        batch_size: i64,
        cancel: CancellationToken,
    ) -> Self {
        let worker = AnalysisWorker::new(db.clone(), engines, hub);
        Self {
            db,
            worker,
            poll_interval,
            batch_size,
            cancel,
        }
    }

    /// Run until cancelled. Throughput is bounded by batch_size per
    /// poll_interval; there is no backpressure signal to producers.
    pub async fn run(self) {
        info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            batch_size = self.batch_size,
            "Dispatcher started"
        );

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut in_flight: JoinSet<()> = JoinSet::new();

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = interval.tick() => {
                    // Reap workers that finished since the last cycle
                    while in_flight.try_join_next().is_some() {}

                    match submissions::claim_batch(&self.db, self.batch_size).await {
                        Ok(ids) => {
                            if !ids.is_empty() {
                                debug!(claimed = ids.len(), "Claimed pending submissions");
                            }
                            for id in ids {
                                let worker = self.worker.clone();
                                in_flight.spawn(async move {
                                    if let Err(e) = worker.process(id).await {
                                        error!(submission_id = id, error = %e, "Analysis worker failed");
                                    }
                                });
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "Queue scan failed, retrying next cycle");
                        }
                    }
                }
            }
        }

        if !in_flight.is_empty() {
            info!(
                remaining = in_flight.len(),
                "Dispatcher cancelled, draining in-flight analyses"
            );
        }
        while in_flight.join_next().await.is_some() {}

        info!("Dispatcher stopped");
    }
}
