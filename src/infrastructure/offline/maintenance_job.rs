use crate::application::ports::identifier_store::IdentifierStore;
use crate::application::ports::sync_queue_store::SyncQueueStore;
use crate::shared::error::AppError;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QueueMaintenanceReport {
    pub pruned_count: u64,
    pub pruned_mappings: u64,
    pub pending_count: u64,
    pub failed_count: u64,
    pub rejected_count: u64,
    pub emitted_at: i64,
}

/// Drops completed queue history and stale id mappings past the retention
/// window.
pub struct QueueMaintenanceJob {
    queue: Arc<dyn SyncQueueStore>,
    identifiers: Arc<dyn IdentifierStore>,
    retention: Duration,
    gate: Mutex<()>,
}

impl QueueMaintenanceJob {
    pub fn new(
        queue: Arc<dyn SyncQueueStore>,
        identifiers: Arc<dyn IdentifierStore>,
        retention: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            queue,
            identifiers,
            retention,
            gate: Mutex::new(()),
        })
    }

    pub fn trigger(self: &Arc<Self>) {
        let job = Arc::clone(self);
        tokio::spawn(async move {
            job.run_guarded().await;
        });
    }

    pub async fn run_once(&self) -> Result<QueueMaintenanceReport, AppError> {
        let cutoff = Utc::now() - self.retention;
        let pruned_count = self.queue.prune_completed(cutoff).await?;
        let pruned_mappings = self.identifiers.prune_mappings(cutoff).await?;
        let stats = self.queue.stats().await?;

        Ok(QueueMaintenanceReport {
            pruned_count,
            pruned_mappings,
            pending_count: stats.pending + stats.syncing,
            failed_count: stats.failed,
            rejected_count: stats.rejected,
            emitted_at: Utc::now().timestamp_millis(),
        })
    }

    async fn run_guarded(self: Arc<Self>) {
        let _guard = self.gate.lock().await;
        match self.run_once().await {
            Ok(report) => {
                tracing::info!(
                    target: "sync::queue",
                    pruned = report.pruned_count,
                    pruned_mappings = report.pruned_mappings,
                    pending = report.pending_count,
                    failed = report.failed_count,
                    "queue maintenance completed"
                );
            }
            Err(err) => {
                tracing::error!(
                    target: "sync::queue",
                    error = %err,
                    "queue maintenance failed"
                );
            }
        }
    }
}
