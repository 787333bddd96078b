use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOperationType {
    Create,
    Update,
    Delete,
}

impl SyncOperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncOperationType::Create => "create",
            SyncOperationType::Update => "update",
            SyncOperationType::Delete => "delete",
        }
    }
}

impl fmt::Display for SyncOperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncOperationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(SyncOperationType::Create),
            "update" => Ok(SyncOperationType::Update),
            "delete" => Ok(SyncOperationType::Delete),
            other => Err(format!("Unknown sync operation type: {other}")),
        }
    }
}
