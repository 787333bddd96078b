use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncQueueStats {
    pub pending: u64,
    pub syncing: u64,
    pub completed: u64,
    pub failed: u64,
    pub rejected: u64,
}

impl SyncQueueStats {
    /// Local edits that have not reached the remote yet.
    pub fn unsynced(&self) -> u64 {
        self.pending + self.syncing + self.failed
    }
}
