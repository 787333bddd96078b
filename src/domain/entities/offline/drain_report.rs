use serde::{Deserialize, Serialize};

/// Tally of one drain pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DrainReport {
    pub synced_count: u32,
    pub failed_count: u32,
    pub conflicts_resolved: u32,
    pub deferred_count: u32,
    pub retried_count: u32,
    pub pending_count: u64,
    /// Another pass was already running; this trigger was folded into it.
    pub coalesced: bool,
    /// The pass stopped early (offline, stop request or rejected credentials).
    pub interrupted: bool,
}

impl DrainReport {
    pub fn coalesced() -> Self {
        Self {
            coalesced: true,
            ..Self::default()
        }
    }

    pub fn attempted(&self) -> u32 {
        self.synced_count + self.failed_count + self.conflicts_resolved + self.retried_count
    }
}
