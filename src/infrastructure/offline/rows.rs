use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SyncOperationRow {
    pub seq: i64,
    pub operation_id: String,
    pub operation_type: String,
    pub entity: String,
    pub entity_id: String,
    pub payload: String,
    pub status: String,
    pub failure_kind: Option<String>,
    pub retry_count: i64,
    pub remote_id: Option<String>,
    pub error_message: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LocalRecordRow {
    pub collection: String,
    pub record_id: String,
    pub data: String,
    pub updated_at: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct StatusCountRow {
    pub status: String,
    pub failure_kind: Option<String>,
    pub count: i64,
}
