use crate::application::ports::{
    IdentifierStore, LocalStore, RemapSummary, RemoteGateway, SyncQueueStore,
};
use crate::domain::entities::offline::{
    LocalRecord, SyncOperation, SyncOperationDraft, SyncQueueStats,
};
use crate::domain::value_objects::offline::{
    EntityId, EntityKind, FailureKind, OfflinePayload, SyncOperationId, SyncOperationType,
    SyncQueueStatus,
};
use crate::shared::error::{AppError, SyncError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::mock;
use serde_json::Value;

mock! {
    pub Queue {}

    #[async_trait]
    impl SyncQueueStore for Queue {
        async fn enqueue(&self, draft: SyncOperationDraft) -> Result<SyncOperation, AppError>;
        async fn commit_mutation(&self, draft: SyncOperationDraft) -> Result<SyncOperation, AppError>;
        async fn get_operation(&self, id: &SyncOperationId) -> Result<Option<SyncOperation>, AppError>;
        async fn list_pending(&self) -> Result<Vec<SyncOperation>, AppError>;
        async fn list_failed(&self) -> Result<Vec<SyncOperation>, AppError>;
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
        async fn find_unsynced_create(
            &self,
            entity: EntityKind,
            entity_id: &EntityId,
            before_seq: Option<i64>,
        ) -> Result<Option<SyncOperation>, AppError>;
        async fn stats(&self) -> Result<SyncQueueStats, AppError>;
        async fn retry_operation(&self, id: &SyncOperationId) -> Result<bool, AppError>;
        async fn recover_interrupted(&self) -> Result<u64, AppError>;
        async fn rearm_exhausted(&self) -> Result<u64, AppError>;
        async fn prune_completed(&self, older_than: DateTime<Utc>) -> Result<u64, AppError>;
    }
}

mock! {
    pub IdStore {}

    #[async_trait]
    impl IdentifierStore for IdStore {
        async fn remap_identifier(
            &self,
            entity: EntityKind,
            old_id: &EntityId,
            new_id: &EntityId,
        ) -> Result<RemapSummary, AppError>;
        async fn resolve_identifier(
            &self,
            entity: EntityKind,
            id: &EntityId,
        ) -> Result<Option<EntityId>, AppError>;
        async fn prune_mappings(&self, older_than: DateTime<Utc>) -> Result<u64, AppError>;
    }
}

mock! {
    pub Local {}

    #[async_trait]
    impl LocalStore for Local {
        async fn get(&self, entity: EntityKind, id: &EntityId) -> Result<Option<LocalRecord>, AppError>;
        async fn get_all(&self, entity: EntityKind) -> Result<Vec<LocalRecord>, AppError>;
        async fn add(&self, record: &LocalRecord) -> Result<(), AppError>;
        async fn update(&self, record: &LocalRecord) -> Result<(), AppError>;
        async fn remove(&self, entity: EntityKind, id: &EntityId) -> Result<bool, AppError>;
    }
}

mock! {
    pub Remote {}

    #[async_trait]
    impl RemoteGateway for Remote {
        async fn create(
            &self,
            entity: EntityKind,
            body: &Value,
            idempotency_key: &str,
        ) -> Result<Value, SyncError>;
        async fn update(
            &self,
            entity: EntityKind,
            id: &EntityId,
            body: &Value,
        ) -> Result<Value, SyncError>;
        async fn delete(&self, entity: EntityKind, id: &EntityId) -> Result<(), SyncError>;
        async fn fetch(&self, entity: EntityKind, id: &EntityId) -> Result<Option<Value>, SyncError>;
    }
}

pub fn entity_id(value: &str) -> EntityId {
    EntityId::new(value.to_string()).unwrap()
}

pub fn operation(
    seq: i64,
    operation_type: SyncOperationType,
    entity: EntityKind,
    id: &str,
    data: Value,
) -> SyncOperation {
    let now = Utc::now();
    SyncOperation {
        seq,
        id: SyncOperationId::generate(),
        operation_type,
        entity,
        entity_id: entity_id(id),
        data: OfflinePayload::new(data).unwrap(),
        timestamp: now,
        retry_count: 0,
        status: SyncQueueStatus::Pending,
        failure_kind: None,
        error: None,
        remote_id: None,
        updated_at: now,
    }
}
