use serde_json::Value;

/// Strips the optional `{"data": {...}}` envelope the remote wraps records in.
pub fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.get("data").is_some_and(Value::is_object) => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Reads the remote identifier from `id` or `_id`, accepting numeric ids.
pub fn remote_record_id(value: &Value) -> Option<String> {
    let record = match value.get("data") {
        Some(inner) if inner.is_object() => inner,
        _ => value,
    };

    ["id", "_id"].iter().find_map(|key| match record.get(*key) {
        Some(Value::String(id)) if !id.trim().is_empty() => Some(id.clone()),
        Some(Value::Number(id)) => Some(id.to_string()),
        _ => None,
    })
}
