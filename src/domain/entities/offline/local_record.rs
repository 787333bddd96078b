use crate::domain::value_objects::offline::{EntityId, EntityKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A record as held by the local store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocalRecord {
    pub entity: EntityKind,
    pub id: EntityId,
    pub data: Value,
    pub updated_at: DateTime<Utc>,
}

impl LocalRecord {
    /// Builds a record, forcing the embedded `id` field to match `id`.
    pub fn new(entity: EntityKind, id: EntityId, data: Value) -> Self {
        let data = with_embedded_id(data, id.as_str());
        Self {
            entity,
            id,
            data,
            updated_at: Utc::now(),
        }
    }

    pub fn collection(&self) -> &'static str {
        self.entity.collection()
    }
}

pub(crate) fn with_embedded_id(data: Value, id: &str) -> Value {
    match data {
        Value::Object(mut map) => {
            map.insert("id".to_string(), Value::String(id.to_string()));
            Value::Object(map)
        }
        other => other,
    }
}
