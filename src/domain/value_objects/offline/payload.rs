use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OfflinePayload(Value);

impl OfflinePayload {
    pub fn new(value: Value) -> Result<Self, String> {
        Self::validate(&value)?;
        Ok(Self(value))
    }

    pub fn from_json_str(json: &str) -> Result<Self, String> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| format!("Invalid JSON payload: {e}"))?;
        Self::new(value)
    }

    /// Minimal payload carrying only the record key, used for deletes.
    pub fn key_only(id: &str) -> Self {
        let mut map = Map::new();
        map.insert("id".to_string(), Value::String(id.to_string()));
        Self(Value::Object(map))
    }

    pub fn as_json(&self) -> &Value {
        &self.0
    }

    pub fn into_inner(self) -> Value {
        self.0
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.0)
    }

    pub fn string_field(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn id(&self) -> Option<&str> {
        self.string_field("id")
    }

    /// Overwrites `field` only when the payload is an object that already
    /// carries it. Returns whether a value changed.
    pub fn replace_field_value(&mut self, field: &str, from: &str, to: &str) -> bool {
        match self.0.get_mut(field) {
            Some(Value::String(current)) if current == from => {
                *current = to.to_string();
                true
            }
            _ => false,
        }
    }

    pub fn set_field(&mut self, field: &str, value: Value) {
        if let Value::Object(map) = &mut self.0 {
            map.insert(field.to_string(), value);
        }
    }

    fn validate(value: &Value) -> Result<(), String> {
        if value.is_null() {
            return Err("Offline payload cannot be null".to_string());
        }
        Ok(())
    }
}

impl From<OfflinePayload> for Value {
    fn from(payload: OfflinePayload) -> Self {
        payload.0
    }
}
