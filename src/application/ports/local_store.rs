use crate::domain::entities::offline::LocalRecord;
use crate::domain::value_objects::offline::{EntityId, EntityKind};
use crate::shared::error::AppError;
use async_trait::async_trait;

/// Durable record storage, one collection per entity family.
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn get(&self, entity: EntityKind, id: &EntityId)
    -> Result<Option<LocalRecord>, AppError>;
    async fn get_all(&self, entity: EntityKind) -> Result<Vec<LocalRecord>, AppError>;
    /// Fails when a record with the same id already exists.
    async fn add(&self, record: &LocalRecord) -> Result<(), AppError>;
    /// Inserts or replaces.
    async fn update(&self, record: &LocalRecord) -> Result<(), AppError>;
    async fn remove(&self, entity: EntityKind, id: &EntityId) -> Result<bool, AppError>;
}
