use crate::application::ports::sync_queue_store::SyncQueueStore;
use crate::application::services::identifier_reconciler::IdentifierReconciler;
use crate::domain::entities::offline::SyncOperation;
use crate::domain::value_objects::offline::{EntityId, OfflinePayload, SyncOperationType};
use crate::shared::error::SyncError;
use serde_json::Value;

/// Fields the remote assigns itself and must not receive on create.
const SERVER_ASSIGNED_FIELDS: [&str; 2] = ["id", "_id"];

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RemoteCall {
    Create {
        body: Value,
        idempotency_key: String,
    },
    Update {
        id: EntityId,
        body: Value,
    },
    Delete {
        id: EntityId,
    },
}

/// Builds the remote request for `operation`, resolving foreign references
/// that point at temporary ids.
pub(crate) async fn translate(
    operation: &SyncOperation,
    queue: &dyn SyncQueueStore,
    reconciler: &IdentifierReconciler,
) -> Result<RemoteCall, SyncError> {
    let call = match operation.operation_type {
        SyncOperationType::Create => {
            let payload = resolve_references(operation, queue, reconciler).await?;
            RemoteCall::Create {
                body: create_body(&payload)?,
                idempotency_key: operation.id.to_string(),
            }
        }
        SyncOperationType::Update => {
            let payload = resolve_references(operation, queue, reconciler).await?;
            RemoteCall::Update {
                id: operation.entity_id.clone(),
                body: update_body(&payload, &operation.entity_id)?,
            }
        }
        SyncOperationType::Delete => RemoteCall::Delete {
            id: operation.entity_id.clone(),
        },
    };
    Ok(call)
}

async fn resolve_references(
    operation: &SyncOperation,
    queue: &dyn SyncQueueStore,
    reconciler: &IdentifierReconciler,
) -> Result<OfflinePayload, SyncError> {
    let mut payload = operation.data.clone();

    for reference in operation.entity.references() {
        let Some(raw) = payload.string_field(reference.field).map(str::to_string) else {
            continue;
        };
        let Ok(referenced) = EntityId::new(raw.clone()) else {
            continue;
        };

        if let Some(remote_id) = reconciler.lookup(reference.target, &referenced).await? {
            payload.replace_field_value(reference.field, &raw, remote_id.as_str());
            continue;
        }

        if let Some(create) = queue
            .find_unsynced_create(reference.target, &referenced, None)
            .await?
        {
            if create.is_rejected() {
                return Err(SyncError::PermanentValidation(format!(
                    "referenced {} {} was rejected by the remote",
                    reference.target, referenced
                )));
            }
            return Err(SyncError::DependencyNotReady {
                entity: reference.target,
                entity_id: referenced,
                parked: create.is_exhausted(),
            });
        }
    }

    Ok(payload)
}

fn require_object(payload: &OfflinePayload) -> Result<(), SyncError> {
    if payload.as_json().is_object() {
        Ok(())
    } else {
        Err(SyncError::PermanentValidation(
            "payload must be a JSON object".to_string(),
        ))
    }
}

fn create_body(payload: &OfflinePayload) -> Result<Value, SyncError> {
    require_object(payload)?;
    let mut body = payload.as_json().clone();
    if let Value::Object(map) = &mut body {
        for field in SERVER_ASSIGNED_FIELDS {
            map.remove(field);
        }
    }
    Ok(body)
}

fn update_body(payload: &OfflinePayload, id: &EntityId) -> Result<Value, SyncError> {
    require_object(payload)?;
    let mut payload = payload.clone();
    payload.set_field("id", Value::String(id.to_string()));
    Ok(payload.into_inner())
}
