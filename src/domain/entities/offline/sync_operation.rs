use crate::domain::value_objects::offline::{
    EntityId, EntityKind, FailureKind, OfflinePayload, SyncOperationId, SyncOperationType,
    SyncQueueStatus,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A mutation waiting to be sent to the remote, before it has a queue slot.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOperationDraft {
    pub operation_type: SyncOperationType,
    pub entity: EntityKind,
    pub entity_id: EntityId,
    pub payload: OfflinePayload,
}

impl SyncOperationDraft {
    pub fn new(
        operation_type: SyncOperationType,
        entity: EntityKind,
        entity_id: EntityId,
        payload: OfflinePayload,
    ) -> Self {
        Self {
            operation_type,
            entity,
            entity_id,
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncOperation {
    /// Insertion order within the queue.
    pub seq: i64,
    pub id: SyncOperationId,
    #[serde(rename = "type")]
    pub operation_type: SyncOperationType,
    pub entity: EntityKind,
    pub entity_id: EntityId,
    pub data: OfflinePayload,
    pub timestamp: DateTime<Utc>,
    pub retry_count: u32,
    pub status: SyncQueueStatus,
    pub failure_kind: Option<FailureKind>,
    pub error: Option<String>,
    /// Remote id already assigned to a create whose reconciliation is still owed.
    pub remote_id: Option<EntityId>,
    pub updated_at: DateTime<Utc>,
}

impl SyncOperation {
    pub fn is_create(&self) -> bool {
        self.operation_type == SyncOperationType::Create
    }

    /// Eligible for the automatic drain loop.
    pub fn is_drainable(&self) -> bool {
        self.status == SyncQueueStatus::Pending
    }

    pub fn is_rejected(&self) -> bool {
        self.status == SyncQueueStatus::Failed && self.failure_kind == Some(FailureKind::Rejected)
    }

    /// Set aside at the retry ceiling until re-armed.
    pub fn is_exhausted(&self) -> bool {
        self.status == SyncQueueStatus::Failed && self.failure_kind == Some(FailureKind::Exhausted)
    }

    /// The transition taken after one more transient failure.
    pub fn next_after_transient_failure(&self, max_retry: u32) -> (u32, SyncQueueStatus) {
        let retry_count = self.retry_count.saturating_add(1);
        if retry_count >= max_retry {
            (retry_count, SyncQueueStatus::Failed)
        } else {
            (retry_count, SyncQueueStatus::Pending)
        }
    }
}
