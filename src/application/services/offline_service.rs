use crate::application::ports::{LocalStore, SyncQueueStore};
use crate::application::services::connectivity::ConnectivityMonitor;
use crate::application::services::sync_executor::SyncExecutor;
use crate::domain::entities::offline::{
    DrainReport, LocalRecord, SyncEvent, SyncOperation, SyncOperationDraft, SyncStatusSnapshot,
};
use crate::domain::value_objects::offline::{
    EntityId, EntityKind, OfflinePayload, SyncOperationId, SyncOperationType,
};
use crate::shared::error::AppError;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Notify, broadcast};

/// Host-facing surface of the engine: local writes that enqueue, queue
/// inspection and manual sync controls.
pub struct OfflineSyncService {
    local: Arc<dyn LocalStore>,
    queue: Arc<dyn SyncQueueStore>,
    executor: Arc<SyncExecutor>,
    connectivity: Arc<ConnectivityMonitor>,
    trigger: Arc<Notify>,
}

impl OfflineSyncService {
    pub fn new(
        local: Arc<dyn LocalStore>,
        queue: Arc<dyn SyncQueueStore>,
        executor: Arc<SyncExecutor>,
        connectivity: Arc<ConnectivityMonitor>,
        trigger: Arc<Notify>,
    ) -> Self {
        Self {
            local,
            queue,
            executor,
            connectivity,
            trigger,
        }
    }

    /// Appends an operation without touching the local record.
    pub async fn enqueue(
        &self,
        operation_type: SyncOperationType,
        entity: EntityKind,
        entity_id: EntityId,
        payload: OfflinePayload,
    ) -> Result<SyncOperationId, AppError> {
        let operation = self
            .queue
            .enqueue(SyncOperationDraft::new(
                operation_type,
                entity,
                entity_id,
                payload,
            ))
            .await?;
        self.after_enqueue(&operation);
        Ok(operation.id)
    }

    /// Stores a new record under a temporary id and queues its create.
    pub async fn create_record(
        &self,
        entity: EntityKind,
        data: Value,
    ) -> Result<LocalRecord, AppError> {
        let id = EntityId::temporary();
        let payload = record_payload(data, &id)?;
        let operation = self
            .queue
            .commit_mutation(SyncOperationDraft::new(
                SyncOperationType::Create,
                entity,
                id,
                payload,
            ))
            .await?;
        self.after_enqueue(&operation);
        self.read_back(&operation).await
    }

    /// Replaces a record locally and queues the update. A temporary id that
    /// was already reconciled is written against the remote id.
    pub async fn update_record(
        &self,
        entity: EntityKind,
        id: &EntityId,
        data: Value,
    ) -> Result<LocalRecord, AppError> {
        let payload = record_payload(data, id)?;
        let operation = self
            .queue
            .commit_mutation(SyncOperationDraft::new(
                SyncOperationType::Update,
                entity,
                id.clone(),
                payload,
            ))
            .await?;
        self.after_enqueue(&operation);
        self.read_back(&operation).await
    }

    pub async fn delete_record(
        &self,
        entity: EntityKind,
        id: &EntityId,
    ) -> Result<SyncOperationId, AppError> {
        let operation = self
            .queue
            .commit_mutation(SyncOperationDraft::new(
                SyncOperationType::Delete,
                entity,
                id.clone(),
                OfflinePayload::key_only(id.as_str()),
            ))
            .await?;
        self.after_enqueue(&operation);
        Ok(operation.id)
    }

    pub async fn get_record(
        &self,
        entity: EntityKind,
        id: &EntityId,
    ) -> Result<Option<LocalRecord>, AppError> {
        self.local.get(entity, id).await
    }

    pub async fn list_records(&self, entity: EntityKind) -> Result<Vec<LocalRecord>, AppError> {
        self.local.get_all(entity).await
    }

    pub async fn pending_count(&self) -> Result<u64, AppError> {
        self.queue.pending_count().await
    }

    pub async fn sync_status(&self) -> Result<SyncStatusSnapshot, AppError> {
        let stats = self.queue.stats().await?;
        Ok(SyncStatusSnapshot {
            online: self.connectivity.is_online(),
            draining: self.executor.is_draining(),
            pending_count: stats.pending + stats.syncing,
            stats,
        })
    }

    pub async fn failed_operations(&self) -> Result<Vec<SyncOperation>, AppError> {
        self.queue.list_failed().await
    }

    /// Re-arms a failed operation. Returns false when it was not failed.
    pub async fn retry_operation(&self, id: &SyncOperationId) -> Result<bool, AppError> {
        let rearmed = self.queue.retry_operation(id).await?;
        if rearmed {
            tracing::info!(target: "sync::queue", operation_id = %id, "operation re-armed manually");
            self.notify_if_online();
        }
        Ok(rearmed)
    }

    /// Drains now instead of waiting for the scheduler.
    pub async fn sync_now(&self) -> Result<DrainReport, AppError> {
        self.executor.drain().await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.executor.subscribe()
    }

    fn after_enqueue(&self, operation: &SyncOperation) {
        tracing::debug!(
            target: "sync::queue",
            operation_id = %operation.id,
            operation_type = %operation.operation_type,
            entity = %operation.entity,
            entity_id = %operation.entity_id,
            status = %operation.status,
            "operation enqueued"
        );
        if operation.is_drainable() {
            self.notify_if_online();
        }
    }

    fn notify_if_online(&self) {
        if self.connectivity.is_online() {
            self.trigger.notify_one();
        }
    }

    async fn read_back(&self, operation: &SyncOperation) -> Result<LocalRecord, AppError> {
        self.local
            .get(operation.entity, &operation.entity_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "{} {} missing after local write",
                    operation.entity, operation.entity_id
                ))
            })
    }
}

fn record_payload(data: Value, id: &EntityId) -> Result<OfflinePayload, AppError> {
    if !data.is_object() {
        return Err(AppError::ValidationError(
            "Record data must be a JSON object".to_string(),
        ));
    }
    let mut payload = OfflinePayload::new(data).map_err(AppError::ValidationError)?;
    payload.set_field("id", Value::String(id.to_string()));
    Ok(payload)
}
