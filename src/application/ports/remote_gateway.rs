use crate::domain::value_objects::offline::{EntityId, EntityKind};
use crate::shared::error::SyncError;
use async_trait::async_trait;
use serde_json::Value;

/// The remote system of record. Implementations classify failures into
/// [`SyncError`] variants.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    async fn create(
        &self,
        entity: EntityKind,
        body: &Value,
        idempotency_key: &str,
    ) -> Result<Value, SyncError>;
    async fn update(&self, entity: EntityKind, id: &EntityId, body: &Value)
    -> Result<Value, SyncError>;
    async fn delete(&self, entity: EntityKind, id: &EntityId) -> Result<(), SyncError>;
    async fn fetch(&self, entity: EntityKind, id: &EntityId) -> Result<Option<Value>, SyncError>;
}
