use super::rows::{LocalRecordRow, SyncOperationRow};
use crate::domain::entities::offline::{LocalRecord, SyncOperation};
use crate::domain::value_objects::offline::{
    EntityId, EntityKind, FailureKind, OfflinePayload, SyncOperationId, SyncOperationType,
    SyncQueueStatus,
};
use crate::shared::error::AppError;
use chrono::{DateTime, TimeZone, Utc};
use std::str::FromStr;

pub fn sync_operation_from_row(row: SyncOperationRow) -> Result<SyncOperation, AppError> {
    let failure_kind = row
        .failure_kind
        .as_deref()
        .map(FailureKind::from_str)
        .transpose()
        .map_err(AppError::DeserializationError)?;
    let remote_id = row
        .remote_id
        .map(EntityId::new)
        .transpose()
        .map_err(AppError::DeserializationError)?;

    Ok(SyncOperation {
        seq: row.seq,
        id: SyncOperationId::parse(&row.operation_id).map_err(AppError::DeserializationError)?,
        operation_type: SyncOperationType::from_str(&row.operation_type)
            .map_err(AppError::DeserializationError)?,
        entity: EntityKind::from_str(&row.entity).map_err(AppError::DeserializationError)?,
        entity_id: EntityId::new(row.entity_id).map_err(AppError::DeserializationError)?,
        data: OfflinePayload::from_json_str(&row.payload)
            .map_err(AppError::DeserializationError)?,
        timestamp: timestamp_from_millis(row.created_at),
        retry_count: u32::try_from(row.retry_count.max(0)).unwrap_or(u32::MAX),
        status: SyncQueueStatus::from_str(&row.status).map_err(AppError::DeserializationError)?,
        failure_kind,
        error: row.error_message,
        remote_id,
        updated_at: timestamp_from_millis(row.updated_at),
    })
}

pub fn local_record_from_row(row: LocalRecordRow) -> Result<LocalRecord, AppError> {
    let entity =
        EntityKind::from_str(&row.collection).map_err(AppError::DeserializationError)?;
    let data = serde_json::from_str(&row.data)
        .map_err(|err| AppError::DeserializationError(err.to_string()))?;

    Ok(LocalRecord {
        entity,
        id: EntityId::new(row.record_id).map_err(AppError::DeserializationError)?,
        data,
        updated_at: timestamp_from_millis(row.updated_at),
    })
}

pub fn timestamp_from_millis(value: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(value)
        .single()
        .unwrap_or_else(Utc::now)
}
