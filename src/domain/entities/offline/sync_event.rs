use super::drain_report::DrainReport;
use crate::domain::value_objects::offline::{EntityId, EntityKind, FailureKind, SyncOperationId};
use serde::{Deserialize, Serialize};

/// Broadcast to observers of the sync engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    DrainCompleted(DrainReport),
    #[serde(rename_all = "camelCase")]
    OperationFailed {
        operation_id: SyncOperationId,
        entity: EntityKind,
        entity_id: EntityId,
        kind: FailureKind,
        error: String,
    },
    #[serde(rename_all = "camelCase")]
    IdentifierReconciled {
        entity: EntityKind,
        temporary_id: EntityId,
        remote_id: EntityId,
    },
    ConnectivityChanged { online: bool },
}
