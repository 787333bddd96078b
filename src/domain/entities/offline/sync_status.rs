use super::queue_stats::SyncQueueStats;
use serde::{Deserialize, Serialize};

/// What a host shows about synchronization at a glance.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatusSnapshot {
    pub online: bool,
    pub draining: bool,
    pub pending_count: u64,
    pub stats: SyncQueueStats,
}
