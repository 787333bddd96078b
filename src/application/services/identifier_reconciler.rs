use crate::application::ports::identifier_store::{IdentifierStore, RemapSummary};
use crate::domain::value_objects::offline::{EntityId, EntityKind};
use crate::shared::error::AppError;
use std::sync::Arc;

/// Swaps locally minted ids for the ids the remote assigned.
pub struct IdentifierReconciler {
    store: Arc<dyn IdentifierStore>,
}

impl IdentifierReconciler {
    pub fn new(store: Arc<dyn IdentifierStore>) -> Self {
        Self { store }
    }

    pub async fn reconcile(
        &self,
        entity: EntityKind,
        old_id: &EntityId,
        new_id: &EntityId,
    ) -> Result<RemapSummary, AppError> {
        let summary = self
            .store
            .remap_identifier(entity, old_id, new_id)
            .await
            .inspect_err(|err| {
                tracing::error!(
                    target: "sync::reconcile",
                    entity = %entity,
                    old_id = %old_id,
                    new_id = %new_id,
                    error = %err,
                    "identifier reconciliation failed"
                );
            })?;

        tracing::info!(
            target: "sync::reconcile",
            entity = %entity,
            old_id = %old_id,
            new_id = %new_id,
            record_moved = summary.record_moved,
            operations = summary.operations_rewritten,
            references = summary.references_rewritten,
            "identifier reconciled"
        );
        Ok(summary)
    }

    /// The remote id for `id` if it has been reconciled.
    pub async fn lookup(
        &self,
        entity: EntityKind,
        id: &EntityId,
    ) -> Result<Option<EntityId>, AppError> {
        self.store.resolve_identifier(entity, id).await
    }
}
