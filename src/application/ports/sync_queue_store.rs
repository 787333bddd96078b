use crate::domain::entities::offline::{SyncOperation, SyncOperationDraft, SyncQueueStats};
use crate::domain::value_objects::offline::{
    EntityId, EntityKind, FailureKind, SyncOperationId, SyncQueueStatus,
};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait SyncQueueStore: Send + Sync {
    /// Appends a pending operation. Never touches the network.
    async fn enqueue(&self, draft: SyncOperationDraft) -> Result<SyncOperation, AppError>;
    /// Applies the draft to the local store and enqueues it in one transaction.
    async fn commit_mutation(&self, draft: SyncOperationDraft)
    -> Result<SyncOperation, AppError>;
    async fn get_operation(
        &self,
        id: &SyncOperationId,
    ) -> Result<Option<SyncOperation>, AppError>;
    /// Operations eligible for automatic draining, oldest first.
    async fn list_pending(&self) -> Result<Vec<SyncOperation>, AppError>;
    async fn list_failed(&self) -> Result<Vec<SyncOperation>, AppError>;
    /// No-op when the operation does not exist.
    async fn mark_status(
        &self,
        id: &SyncOperationId,
        status: SyncQueueStatus,
        error: Option<String>,
    ) -> Result<(), AppError>;
    async fn record_retry(
        &self,
        id: &SyncOperationId,
        retry_count: u32,
        error: String,
    ) -> Result<(), AppError>;
    async fn record_failure(
        &self,
        id: &SyncOperationId,
        kind: FailureKind,
        retry_count: u32,
        error: String,
    ) -> Result<(), AppError>;
    async fn record_remote_id(
        &self,
        id: &SyncOperationId,
        remote_id: &EntityId,
    ) -> Result<(), AppError>;
    /// The not-yet-completed create for a record, optionally only if it was
    /// enqueued before `before_seq`.
    async fn find_unsynced_create(
        &self,
        entity: EntityKind,
        entity_id: &EntityId,
        before_seq: Option<i64>,
    ) -> Result<Option<SyncOperation>, AppError>;
    async fn stats(&self) -> Result<SyncQueueStats, AppError>;
    /// Manual re-arm of a failed operation. Returns false if it was not failed.
    async fn retry_operation(&self, id: &SyncOperationId) -> Result<bool, AppError>;
    /// Restart recovery: operations left `syncing` go back to `pending`.
    async fn recover_interrupted(&self) -> Result<u64, AppError>;
    /// Gives ceiling-exhausted operations a fresh retry budget.
    async fn rearm_exhausted(&self) -> Result<u64, AppError>;
    async fn prune_completed(&self, older_than: DateTime<Utc>) -> Result<u64, AppError>;

    async fn pending_count(&self) -> Result<u64, AppError> {
        let stats = self.stats().await?;
        Ok(stats.pending + stats.syncing)
    }
}
