use crate::domain::value_objects::offline::{EntityId, EntityKind};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemapSummary {
    pub record_moved: bool,
    pub operations_rewritten: u64,
    pub references_rewritten: u64,
}

#[async_trait]
pub trait IdentifierStore: Send + Sync {
    /// Moves every local trace of `old_id` to `new_id` atomically and records
    /// the mapping.
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
    /// Drops mappings reconciled before `older_than` whose temporary id no
    /// longer appears in any open operation or local record.
    async fn prune_mappings(&self, older_than: DateTime<Utc>) -> Result<u64, AppError>;
}
