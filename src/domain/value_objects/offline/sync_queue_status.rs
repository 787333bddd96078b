use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncQueueStatus {
    Pending,
    Syncing,
    Completed,
    Failed,
}

impl SyncQueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncQueueStatus::Pending => "pending",
            SyncQueueStatus::Syncing => "syncing",
            SyncQueueStatus::Completed => "completed",
            SyncQueueStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncQueueStatus::Completed | SyncQueueStatus::Failed)
    }
}

impl fmt::Display for SyncQueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncQueueStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(SyncQueueStatus::Pending),
            "syncing" => Ok(SyncQueueStatus::Syncing),
            "completed" => Ok(SyncQueueStatus::Completed),
            "failed" => Ok(SyncQueueStatus::Failed),
            other => Err(format!("Unknown sync queue status: {other}")),
        }
    }
}

/// Why a `failed` operation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The remote refused the request outright. Never retried automatically.
    Rejected,
    /// The transient retry ceiling was reached.
    Exhausted,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Rejected => "rejected",
            FailureKind::Exhausted => "exhausted",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailureKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "rejected" => Ok(FailureKind::Rejected),
            "exhausted" => Ok(FailureKind::Exhausted),
            other => Err(format!("Unknown failure kind: {other}")),
        }
    }
}
