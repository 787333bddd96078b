use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{LazyLock, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    Synced,
    ConflictResolved,
    Deferred,
    Retried,
    Failed,
}

impl SyncOutcome {
    fn is_failure(self) -> bool {
        matches!(self, SyncOutcome::Retried | SyncOutcome::Failed)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetricsSnapshot {
    pub total_synced: u64,
    pub total_conflicts: u64,
    pub total_deferred: u64,
    pub total_retried: u64,
    pub total_failed: u64,
    pub consecutive_failure: u64,
    pub total_drains: u64,
    pub last_success_ms: Option<u64>,
    pub last_failure_ms: Option<u64>,
    pub last_outcome: Option<SyncOutcome>,
    pub last_operation_id: Option<String>,
    pub last_entity: Option<String>,
    pub last_operation_type: Option<String>,
    pub last_retry_count: Option<u32>,
    pub last_error: Option<String>,
    pub last_drain_duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcomeMetadata {
    pub operation_id: Option<String>,
    pub entity: Option<String>,
    pub operation_type: Option<String>,
    pub retry_count: Option<u32>,
    pub error: Option<String>,
}

#[derive(Default, Clone)]
struct LastOutcome {
    outcome: Option<SyncOutcome>,
    operation_id: Option<String>,
    entity: Option<String>,
    operation_type: Option<String>,
    retry_count: Option<u32>,
    error: Option<String>,
}

struct SyncMetrics {
    synced: AtomicU64,
    conflicts: AtomicU64,
    deferred: AtomicU64,
    retried: AtomicU64,
    failed: AtomicU64,
    consecutive_failure: AtomicU64,
    drains: AtomicU64,
    last_success_ms: AtomicU64,
    last_failure_ms: AtomicU64,
    last_drain_duration_ms: AtomicU64,
    last: Mutex<LastOutcome>,
}

impl SyncMetrics {
    fn new() -> Self {
        Self {
            synced: AtomicU64::new(0),
            conflicts: AtomicU64::new(0),
            deferred: AtomicU64::new(0),
            retried: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            consecutive_failure: AtomicU64::new(0),
            drains: AtomicU64::new(0),
            last_success_ms: AtomicU64::new(0),
            last_failure_ms: AtomicU64::new(0),
            last_drain_duration_ms: AtomicU64::new(0),
            last: Mutex::new(LastOutcome::default()),
        }
    }

    fn counter(&self, outcome: SyncOutcome) -> &AtomicU64 {
        match outcome {
            SyncOutcome::Synced => &self.synced,
            SyncOutcome::ConflictResolved => &self.conflicts,
            SyncOutcome::Deferred => &self.deferred,
            SyncOutcome::Retried => &self.retried,
            SyncOutcome::Failed => &self.failed,
        }
    }

    fn record(&self, outcome: SyncOutcome, meta: &SyncOutcomeMetadata) {
        self.counter(outcome).fetch_add(1, Ordering::Relaxed);

        if outcome.is_failure() {
            self.last_failure_ms
                .store(current_unix_ms(), Ordering::Relaxed);
            self.consecutive_failure.fetch_add(1, Ordering::Relaxed);
        } else if outcome != SyncOutcome::Deferred {
            self.last_success_ms
                .store(current_unix_ms(), Ordering::Relaxed);
            self.consecutive_failure.store(0, Ordering::Relaxed);
        }

        if let Ok(mut guard) = self.last.lock() {
            guard.outcome = Some(outcome);
            guard.operation_id = meta.operation_id.clone();
            guard.entity = meta.entity.clone();
            guard.operation_type = meta.operation_type.clone();
            guard.retry_count = meta.retry_count;
            guard.error = meta.error.clone();
        }
    }

    fn record_drain(&self, duration_ms: u64) {
        self.drains.fetch_add(1, Ordering::Relaxed);
        self.last_drain_duration_ms
            .store(duration_ms, Ordering::Relaxed);
    }

    fn snapshot(&self) -> SyncMetricsSnapshot {
        let last = self
            .last
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default();

        SyncMetricsSnapshot {
            total_synced: self.synced.load(Ordering::Relaxed),
            total_conflicts: self.conflicts.load(Ordering::Relaxed),
            total_deferred: self.deferred.load(Ordering::Relaxed),
            total_retried: self.retried.load(Ordering::Relaxed),
            total_failed: self.failed.load(Ordering::Relaxed),
            consecutive_failure: self.consecutive_failure.load(Ordering::Relaxed),
            total_drains: self.drains.load(Ordering::Relaxed),
            last_success_ms: to_option(self.last_success_ms.load(Ordering::Relaxed)),
            last_failure_ms: to_option(self.last_failure_ms.load(Ordering::Relaxed)),
            last_outcome: last.outcome,
            last_operation_id: last.operation_id,
            last_entity: last.entity,
            last_operation_type: last.operation_type,
            last_retry_count: last.retry_count,
            last_error: last.error,
            last_drain_duration_ms: to_option(self.last_drain_duration_ms.load(Ordering::Relaxed)),
        }
    }
}

fn to_option(value: u64) -> Option<u64> {
    if value == 0 { None } else { Some(value) }
}

fn current_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or(0)
}

static SYNC_METRICS: LazyLock<SyncMetrics> = LazyLock::new(SyncMetrics::new);

pub fn record_outcome(outcome: SyncOutcome, metadata: &SyncOutcomeMetadata) -> SyncMetricsSnapshot {
    SYNC_METRICS.record(outcome, metadata);
    SYNC_METRICS.snapshot()
}

pub fn record_drain(duration_ms: u64) {
    SYNC_METRICS.record_drain(duration_ms);
}

pub fn snapshot() -> SyncMetricsSnapshot {
    SYNC_METRICS.snapshot()
}
