use crate::application::ports::SyncQueueStore;
use crate::application::services::connectivity::ConnectivityMonitor;
use crate::application::services::sync_executor::SyncExecutor;
use crate::domain::entities::offline::SyncEvent;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Decides when the executor drains: on reconnect, on a periodic tick while
/// online and after local enqueues while online.
pub struct SyncScheduler {
    executor: Arc<SyncExecutor>,
    queue: Arc<dyn SyncQueueStore>,
    connectivity: Arc<ConnectivityMonitor>,
    interval: Duration,
    trigger: Arc<Notify>,
}

pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stops the loop after any drain in progress finishes.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.join.await {
            tracing::warn!(target: "sync::scheduler", error = %err, "scheduler task ended abnormally");
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum DrainTrigger {
    Interval,
    Reconnect,
    Enqueue,
}

impl DrainTrigger {
    fn as_str(self) -> &'static str {
        match self {
            DrainTrigger::Interval => "interval",
            DrainTrigger::Reconnect => "reconnect",
            DrainTrigger::Enqueue => "enqueue",
        }
    }
}

impl SyncScheduler {
    pub fn new(
        executor: Arc<SyncExecutor>,
        queue: Arc<dyn SyncQueueStore>,
        connectivity: Arc<ConnectivityMonitor>,
        interval: Duration,
        trigger: Arc<Notify>,
    ) -> Self {
        Self {
            executor,
            queue,
            connectivity,
            interval,
            trigger,
        }
    }

    pub fn spawn(self) -> SchedulerHandle {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(self.run(shutdown_rx));
        SchedulerHandle { shutdown, join }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut online = self.connectivity.subscribe();

        tracing::info!(
            target: "sync::scheduler",
            interval_secs = self.interval.as_secs(),
            online = self.connectivity.is_online(),
            "sync scheduler started"
        );

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                changed = online.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let is_online = *online.borrow_and_update();
                    self.executor.emit(SyncEvent::ConnectivityChanged { online: is_online });
                    if is_online {
                        self.on_reconnect().await;
                    }
                }
                _ = ticker.tick() => {
                    if self.connectivity.is_online() {
                        self.run_drain(DrainTrigger::Interval).await;
                    }
                }
                _ = self.trigger.notified() => {
                    if self.connectivity.is_online() {
                        self.run_drain(DrainTrigger::Enqueue).await;
                    }
                }
            }
        }

        tracing::info!(target: "sync::scheduler", "sync scheduler stopped");
    }

    async fn on_reconnect(&self) {
        match self.queue.rearm_exhausted().await {
            Ok(0) => {}
            Ok(rearmed) => {
                tracing::info!(
                    target: "sync::scheduler",
                    rearmed,
                    "re-armed exhausted operations"
                );
            }
            Err(err) => {
                tracing::error!(
                    target: "sync::scheduler",
                    error = %err,
                    "failed to re-arm exhausted operations"
                );
            }
        }
        self.run_drain(DrainTrigger::Reconnect).await;
    }

    async fn run_drain(&self, trigger: DrainTrigger) {
        match self.executor.drain().await {
            Ok(report) => {
                tracing::debug!(
                    target: "sync::scheduler",
                    trigger = trigger.as_str(),
                    synced = report.synced_count,
                    pending = report.pending_count,
                    "drain finished"
                );
            }
            Err(err) => {
                tracing::error!(
                    target: "sync::scheduler",
                    trigger = trigger.as_str(),
                    error = %err,
                    "drain failed"
                );
            }
        }
    }
}
