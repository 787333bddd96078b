use super::mappers::{local_record_from_row, sync_operation_from_row};
use super::rows::{LocalRecordRow, StatusCountRow, SyncOperationRow};
use crate::application::ports::identifier_store::{IdentifierStore, RemapSummary};
use crate::application::ports::local_store::LocalStore;
use crate::application::ports::sync_queue_store::SyncQueueStore;
use crate::domain::entities::offline::local_record::with_embedded_id;
use crate::domain::entities::offline::{
    LocalRecord, SyncOperation, SyncOperationDraft, SyncQueueStats,
};
use crate::domain::value_objects::offline::{
    EntityId, EntityKind, FailureKind, OfflinePayload, SyncOperationId, SyncOperationType,
    SyncQueueStatus,
};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{Pool, Sqlite, SqliteConnection};
use std::str::FromStr;

const OPERATION_COLUMNS: &str = "seq, operation_id, operation_type, entity, entity_id, payload, \
     status, failure_kind, retry_count, remote_id, error_message, created_at, updated_at";

const RECORD_COLUMNS: &str = "collection, record_id, data, updated_at";

const SUPERSEDED_NOTE: &str = "superseded by local delete";
const SKIPPED_DELETE_NOTE: &str = "record never reached the remote; delete skipped";

/// SQLite-backed local store, sync queue and id-mapping table sharing one pool.
pub struct SqliteOfflineStore {
    pool: Pool<Sqlite>,
}

impl SqliteOfflineStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    async fn fetch_operations(&self, filter: &str) -> Result<Vec<SyncOperation>, AppError> {
        let sql = format!("SELECT {OPERATION_COLUMNS} FROM sync_queue WHERE {filter} ORDER BY seq ASC");
        let rows = sqlx::query_as::<_, SyncOperationRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(sync_operation_from_row).collect()
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

async fn fetch_operation_by_seq(
    conn: &mut SqliteConnection,
    seq: i64,
) -> Result<SyncOperation, AppError> {
    let sql = format!("SELECT {OPERATION_COLUMNS} FROM sync_queue WHERE seq = ?1");
    let row = sqlx::query_as::<_, SyncOperationRow>(&sql)
        .bind(seq)
        .fetch_one(&mut *conn)
        .await?;
    sync_operation_from_row(row)
}

async fn resolve_on(
    conn: &mut SqliteConnection,
    entity: EntityKind,
    id: &EntityId,
) -> Result<Option<EntityId>, AppError> {
    let remote: Option<String> = sqlx::query_scalar(
        "SELECT remote_id FROM id_mappings WHERE entity = ?1 AND temporary_id = ?2",
    )
    .bind(entity.as_str())
    .bind(id.as_str())
    .fetch_optional(&mut *conn)
    .await?;

    remote
        .map(EntityId::new)
        .transpose()
        .map_err(AppError::DeserializationError)
}

/// A create that has provably not been applied remotely: never sent, or
/// rejected outright. Anything that was ever marked `syncing` may have landed.
async fn find_unsent_create_seq(
    conn: &mut SqliteConnection,
    entity: EntityKind,
    id: &EntityId,
) -> Result<Option<i64>, AppError> {
    let seq = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT seq FROM sync_queue
        WHERE entity = ?1 AND entity_id = ?2 AND operation_type = 'create'
          AND remote_id IS NULL
          AND ((status = 'pending' AND first_sent_at IS NULL)
               OR (status = 'failed' AND failure_kind = 'rejected'))
        ORDER BY seq ASC
        LIMIT 1
        "#,
    )
    .bind(entity.as_str())
    .bind(id.as_str())
    .fetch_optional(&mut *conn)
    .await?;
    Ok(seq)
}

async fn enqueue_on(
    conn: &mut SqliteConnection,
    draft: SyncOperationDraft,
) -> Result<SyncOperation, AppError> {
    let SyncOperationDraft {
        operation_type,
        entity,
        mut entity_id,
        mut payload,
    } = draft;

    // Writers holding a stale temporary id are redirected to the remote id.
    if let Some(remote_id) = resolve_on(&mut *conn, entity, &entity_id).await? {
        payload.replace_field_value("id", entity_id.as_str(), remote_id.as_str());
        entity_id = remote_id;
    }

    let now = now_millis();
    let mut status = SyncQueueStatus::Pending;
    let mut note: Option<&str> = None;

    if operation_type == SyncOperationType::Delete
        && let Some(create_seq) = find_unsent_create_seq(&mut *conn, entity, &entity_id).await?
    {
        let superseded = sqlx::query(
            r#"
            UPDATE sync_queue
            SET status = 'completed', failure_kind = NULL, error_message = ?1, updated_at = ?2
            WHERE entity = ?3 AND entity_id = ?4 AND seq >= ?5
              AND status IN ('pending', 'failed')
            "#,
        )
        .bind(SUPERSEDED_NOTE)
        .bind(now)
        .bind(entity.as_str())
        .bind(entity_id.as_str())
        .bind(create_seq)
        .execute(&mut *conn)
        .await?;

        tracing::debug!(
            target: "sync::queue",
            entity = %entity,
            entity_id = %entity_id,
            superseded = superseded.rows_affected(),
            "local delete cancels unsent create"
        );
        status = SyncQueueStatus::Completed;
        note = Some(SKIPPED_DELETE_NOTE);
    }

    let operation_id = SyncOperationId::generate();
    let payload_json = payload.to_json_string()?;

    let result = sqlx::query(
        r#"
        INSERT INTO sync_queue (
            operation_id, operation_type, entity, entity_id, payload,
            status, retry_count, error_message, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?8, ?8)
        "#,
    )
    .bind(operation_id.as_str())
    .bind(operation_type.as_str())
    .bind(entity.as_str())
    .bind(entity_id.as_str())
    .bind(&payload_json)
    .bind(status.as_str())
    .bind(note)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    fetch_operation_by_seq(conn, result.last_insert_rowid()).await
}

async fn insert_record_on(
    conn: &mut SqliteConnection,
    record: &LocalRecord,
) -> Result<(), AppError> {
    let data = serde_json::to_string(&record.data)?;
    sqlx::query(
        r#"
        INSERT INTO local_records (collection, record_id, data, updated_at)
        VALUES (?1, ?2, ?3, ?4)
        "#,
    )
    .bind(record.collection())
    .bind(record.id.as_str())
    .bind(&data)
    .bind(record.updated_at.timestamp_millis())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn upsert_record_on(
    conn: &mut SqliteConnection,
    record: &LocalRecord,
) -> Result<(), AppError> {
    let data = serde_json::to_string(&record.data)?;
    sqlx::query(
        r#"
        INSERT INTO local_records (collection, record_id, data, updated_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(collection, record_id) DO UPDATE SET
            data = excluded.data,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(record.collection())
    .bind(record.id.as_str())
    .bind(&data)
    .bind(record.updated_at.timestamp_millis())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn remove_record_on(
    conn: &mut SqliteConnection,
    entity: EntityKind,
    id: &EntityId,
) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM local_records WHERE collection = ?1 AND record_id = ?2")
        .bind(entity.collection())
        .bind(id.as_str())
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[async_trait]
impl LocalStore for SqliteOfflineStore {
    async fn get(
        &self,
        entity: EntityKind,
        id: &EntityId,
    ) -> Result<Option<LocalRecord>, AppError> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM local_records WHERE collection = ?1 AND record_id = ?2"
        );
        let row = sqlx::query_as::<_, LocalRecordRow>(&sql)
            .bind(entity.collection())
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(local_record_from_row).transpose()
    }

    async fn get_all(&self, entity: EntityKind) -> Result<Vec<LocalRecord>, AppError> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM local_records WHERE collection = ?1 \
             ORDER BY updated_at ASC, record_id ASC"
        );
        let rows = sqlx::query_as::<_, LocalRecordRow>(&sql)
            .bind(entity.collection())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(local_record_from_row).collect()
    }

    async fn add(&self, record: &LocalRecord) -> Result<(), AppError> {
        let mut conn = self.pool.acquire().await?;
        insert_record_on(&mut conn, record).await
    }

    async fn update(&self, record: &LocalRecord) -> Result<(), AppError> {
        let mut conn = self.pool.acquire().await?;
        upsert_record_on(&mut conn, record).await
    }

    async fn remove(&self, entity: EntityKind, id: &EntityId) -> Result<bool, AppError> {
        let mut conn = self.pool.acquire().await?;
        remove_record_on(&mut conn, entity, id).await
    }
}

#[async_trait]
impl SyncQueueStore for SqliteOfflineStore {
    async fn enqueue(&self, draft: SyncOperationDraft) -> Result<SyncOperation, AppError> {
        let mut tx = self.pool.begin().await?;
        let operation = enqueue_on(&mut tx, draft).await?;
        tx.commit().await?;
        Ok(operation)
    }

    async fn commit_mutation(
        &self,
        draft: SyncOperationDraft,
    ) -> Result<SyncOperation, AppError> {
        let mut tx = self.pool.begin().await?;
        let local_data = draft.payload.clone().into_inner();
        let operation = enqueue_on(&mut tx, draft).await?;

        match operation.operation_type {
            SyncOperationType::Create => {
                let record =
                    LocalRecord::new(operation.entity, operation.entity_id.clone(), local_data);
                insert_record_on(&mut tx, &record).await?;
            }
            SyncOperationType::Update => {
                let record =
                    LocalRecord::new(operation.entity, operation.entity_id.clone(), local_data);
                upsert_record_on(&mut tx, &record).await?;
            }
            SyncOperationType::Delete => {
                remove_record_on(&mut tx, operation.entity, &operation.entity_id).await?;
            }
        }

        tx.commit().await?;
        Ok(operation)
    }

    async fn get_operation(
        &self,
        id: &SyncOperationId,
    ) -> Result<Option<SyncOperation>, AppError> {
        let sql = format!("SELECT {OPERATION_COLUMNS} FROM sync_queue WHERE operation_id = ?1");
        let row = sqlx::query_as::<_, SyncOperationRow>(&sql)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(sync_operation_from_row).transpose()
    }

    async fn list_pending(&self) -> Result<Vec<SyncOperation>, AppError> {
        self.fetch_operations("status = 'pending'").await
    }

    async fn list_failed(&self) -> Result<Vec<SyncOperation>, AppError> {
        self.fetch_operations("status = 'failed'").await
    }

    async fn mark_status(
        &self,
        id: &SyncOperationId,
        status: SyncQueueStatus,
        error: Option<String>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE sync_queue
            SET status = ?1,
                error_message = COALESCE(?2, error_message),
                failure_kind = CASE WHEN ?1 = 'failed' THEN failure_kind ELSE NULL END,
                first_sent_at = CASE WHEN ?1 = 'syncing'
                    THEN COALESCE(first_sent_at, ?3) ELSE first_sent_at END,
                updated_at = ?3
            WHERE operation_id = ?4
            "#,
        )
        .bind(status.as_str())
        .bind(error)
        .bind(now_millis())
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_retry(
        &self,
        id: &SyncOperationId,
        retry_count: u32,
        error: String,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE sync_queue
            SET status = 'pending', retry_count = ?1, error_message = ?2,
                failure_kind = NULL, updated_at = ?3
            WHERE operation_id = ?4
            "#,
        )
        .bind(i64::from(retry_count))
        .bind(&error)
        .bind(now_millis())
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_failure(
        &self,
        id: &SyncOperationId,
        kind: FailureKind,
        retry_count: u32,
        error: String,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE sync_queue
            SET status = 'failed', failure_kind = ?1, retry_count = ?2,
                error_message = ?3, updated_at = ?4
            WHERE operation_id = ?5
            "#,
        )
        .bind(kind.as_str())
        .bind(i64::from(retry_count))
        .bind(&error)
        .bind(now_millis())
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_remote_id(
        &self,
        id: &SyncOperationId,
        remote_id: &EntityId,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE sync_queue SET remote_id = ?1, updated_at = ?2 WHERE operation_id = ?3")
            .bind(remote_id.as_str())
            .bind(now_millis())
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_unsynced_create(
        &self,
        entity: EntityKind,
        entity_id: &EntityId,
        before_seq: Option<i64>,
    ) -> Result<Option<SyncOperation>, AppError> {
        let sql = format!(
            "SELECT {OPERATION_COLUMNS} FROM sync_queue \
             WHERE entity = ?1 AND entity_id = ?2 AND operation_type = 'create' \
               AND status != 'completed' AND (?3 IS NULL OR seq < ?3) \
             ORDER BY seq ASC LIMIT 1"
        );
        let row = sqlx::query_as::<_, SyncOperationRow>(&sql)
            .bind(entity.as_str())
            .bind(entity_id.as_str())
            .bind(before_seq)
            .fetch_optional(&self.pool)
            .await?;
        row.map(sync_operation_from_row).transpose()
    }

    async fn stats(&self) -> Result<SyncQueueStats, AppError> {
        let rows = sqlx::query_as::<_, StatusCountRow>(
            r#"
            SELECT status, failure_kind, COUNT(*) AS count
            FROM sync_queue
            GROUP BY status, failure_kind
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut stats = SyncQueueStats::default();
        for row in rows {
            let count = u64::try_from(row.count).unwrap_or(0);
            match SyncQueueStatus::from_str(&row.status) {
                Ok(SyncQueueStatus::Pending) => stats.pending += count,
                Ok(SyncQueueStatus::Syncing) => stats.syncing += count,
                Ok(SyncQueueStatus::Completed) => stats.completed += count,
                Ok(SyncQueueStatus::Failed) => {
                    stats.failed += count;
                    if row.failure_kind.as_deref() == Some(FailureKind::Rejected.as_str()) {
                        stats.rejected += count;
                    }
                }
                Err(err) => {
                    tracing::warn!(target: "sync::queue", error = %err, "skipping unknown status");
                }
            }
        }
        Ok(stats)
    }

    async fn retry_operation(&self, id: &SyncOperationId) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE sync_queue
            SET status = 'pending', retry_count = 0, failure_kind = NULL,
                error_message = NULL, updated_at = ?1
            WHERE operation_id = ?2 AND status = 'failed'
            "#,
        )
        .bind(now_millis())
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn recover_interrupted(&self) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE sync_queue SET status = 'pending', updated_at = ?1 WHERE status = 'syncing'",
        )
        .bind(now_millis())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn rearm_exhausted(&self) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE sync_queue
            SET status = 'pending', retry_count = 0, failure_kind = NULL, updated_at = ?1
            WHERE status = 'failed' AND failure_kind = 'exhausted'
            "#,
        )
        .bind(now_millis())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn prune_completed(&self, older_than: DateTime<Utc>) -> Result<u64, AppError> {
        let result =
            sqlx::query("DELETE FROM sync_queue WHERE status = 'completed' AND updated_at < ?1")
                .bind(older_than.timestamp_millis())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl IdentifierStore for SqliteOfflineStore {
    async fn remap_identifier(
        &self,
        entity: EntityKind,
        old_id: &EntityId,
        new_id: &EntityId,
    ) -> Result<RemapSummary, AppError> {
        let mut summary = RemapSummary::default();
        if old_id == new_id {
            return Ok(summary);
        }

        let now = now_millis();
        let mut tx = self.pool.begin().await?;

        let record_sql = format!(
            "SELECT {RECORD_COLUMNS} FROM local_records WHERE collection = ?1 AND record_id = ?2"
        );
        let existing = sqlx::query_as::<_, LocalRecordRow>(&record_sql)
            .bind(entity.collection())
            .bind(old_id.as_str())
            .fetch_optional(&mut *tx)
            .await?;

        if let Some(row) = existing {
            let data: Value = serde_json::from_str(&row.data)?;
            let moved = LocalRecord::new(entity, new_id.clone(), data);
            upsert_record_on(&mut tx, &moved).await?;
            remove_record_on(&mut tx, entity, old_id).await?;
            summary.record_moved = true;
        }

        let ops_sql = format!(
            "SELECT {OPERATION_COLUMNS} FROM sync_queue \
             WHERE entity = ?1 AND entity_id = ?2 AND status != 'completed' ORDER BY seq ASC"
        );
        let own_ops = sqlx::query_as::<_, SyncOperationRow>(&ops_sql)
            .bind(entity.as_str())
            .bind(old_id.as_str())
            .fetch_all(&mut *tx)
            .await?;

        for row in own_ops {
            let mut payload =
                OfflinePayload::from_json_str(&row.payload).map_err(AppError::DeserializationError)?;
            payload.replace_field_value("id", old_id.as_str(), new_id.as_str());
            sqlx::query(
                "UPDATE sync_queue SET entity_id = ?1, payload = ?2, updated_at = ?3 WHERE seq = ?4",
            )
            .bind(new_id.as_str())
            .bind(payload.to_json_string()?)
            .bind(now)
            .bind(row.seq)
            .execute(&mut *tx)
            .await?;
            summary.operations_rewritten += 1;
        }

        for (dependent, field) in entity.dependents() {
            let path = format!("$.{field}");

            let records_sql = format!(
                "SELECT {RECORD_COLUMNS} FROM local_records \
                 WHERE collection = ?1 AND json_extract(data, ?2) = ?3"
            );
            let records = sqlx::query_as::<_, LocalRecordRow>(&records_sql)
                .bind(dependent.collection())
                .bind(&path)
                .bind(old_id.as_str())
                .fetch_all(&mut *tx)
                .await?;

            for row in records {
                let mut data: Value = serde_json::from_str(&row.data)?;
                if let Some(Value::String(value)) = data.get_mut(field) {
                    *value = new_id.to_string();
                }
                sqlx::query(
                    "UPDATE local_records SET data = ?1, updated_at = ?2 \
                     WHERE collection = ?3 AND record_id = ?4",
                )
                .bind(serde_json::to_string(&data)?)
                .bind(now)
                .bind(&row.collection)
                .bind(&row.record_id)
                .execute(&mut *tx)
                .await?;
                summary.references_rewritten += 1;
            }

            let dependent_ops_sql = format!(
                "SELECT {OPERATION_COLUMNS} FROM sync_queue \
                 WHERE entity = ?1 AND status != 'completed' AND json_extract(payload, ?2) = ?3"
            );
            let dependent_ops = sqlx::query_as::<_, SyncOperationRow>(&dependent_ops_sql)
                .bind(dependent.as_str())
                .bind(&path)
                .bind(old_id.as_str())
                .fetch_all(&mut *tx)
                .await?;

            for row in dependent_ops {
                let mut payload = OfflinePayload::from_json_str(&row.payload)
                    .map_err(AppError::DeserializationError)?;
                if payload.replace_field_value(field, old_id.as_str(), new_id.as_str()) {
                    sqlx::query("UPDATE sync_queue SET payload = ?1, updated_at = ?2 WHERE seq = ?3")
                        .bind(payload.to_json_string()?)
                        .bind(now)
                        .bind(row.seq)
                        .execute(&mut *tx)
                        .await?;
                    summary.references_rewritten += 1;
                }
            }
        }

        sqlx::query(
            r#"
            INSERT INTO id_mappings (entity, temporary_id, remote_id, reconciled_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(entity, temporary_id) DO UPDATE SET
                remote_id = excluded.remote_id,
                reconciled_at = excluded.reconciled_at
            "#,
        )
        .bind(entity.as_str())
        .bind(old_id.as_str())
        .bind(new_id.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(summary)
    }

    async fn resolve_identifier(
        &self,
        entity: EntityKind,
        id: &EntityId,
    ) -> Result<Option<EntityId>, AppError> {
        let mut conn = self.pool.acquire().await?;
        resolve_on(&mut conn, entity, id).await
    }

    async fn prune_mappings(&self, older_than: DateTime<Utc>) -> Result<u64, AppError> {
        // Ids are stored as JSON strings, so a quoted match is a conservative
        // reference test.
        let result = sqlx::query(
            r#"
            DELETE FROM id_mappings
            WHERE reconciled_at < ?1
              AND NOT EXISTS (
                  SELECT 1 FROM sync_queue q
                  WHERE q.status != 'completed'
                    AND (q.entity_id = id_mappings.temporary_id
                         OR instr(q.payload, '"' || id_mappings.temporary_id || '"') > 0)
              )
              AND NOT EXISTS (
                  SELECT 1 FROM local_records r
                  WHERE instr(r.data, '"' || id_mappings.temporary_id || '"') > 0
              )
            "#,
        )
        .bind(older_than.timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
