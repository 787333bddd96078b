use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use retail_sync::application::ports::{ConnectivityProbe, RemoteGateway};
use retail_sync::domain::value_objects::offline::{EntityId, EntityKind};
use retail_sync::{AppConfig, AppState, SyncError};
use serde_json::Value;

/// One remote request as the scripted gateway saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: &'static str,
    pub entity: EntityKind,
    pub id: Option<String>,
    pub body: Option<Value>,
    pub idempotency_key: Option<String>,
}

/// A canned reply. Built into a fresh `SyncError` on every use.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub enum Reply {
    Ok(Value),
    Transient(&'static str),
    Rejected(&'static str),
    Conflict(Option<Value>),
}

impl Reply {
    fn into_result(self) -> Result<Value, SyncError> {
        match self {
            Reply::Ok(value) => Ok(value),
            Reply::Transient(msg) => Err(SyncError::TransientNetwork(msg.to_string())),
            Reply::Rejected(msg) => Err(SyncError::PermanentValidation(msg.to_string())),
            Reply::Conflict(remote) => Err(SyncError::ServerConflict {
                message: "HTTP 409".to_string(),
                remote,
            }),
        }
    }
}

/// In-memory remote: scripted replies per `(method, entity)`, otherwise
/// creates assign `srv-N` ids and updates echo their body.
#[derive(Default)]
pub struct ScriptedGateway {
    replies: Mutex<HashMap<(&'static str, EntityKind), VecDeque<Reply>>>,
    calls: Mutex<Vec<RecordedCall>>,
    server_copies: Mutex<HashMap<(EntityKind, String), Value>>,
    next_id: AtomicU64,
    delay: Option<Duration>,
}

#[allow(dead_code)]
impl ScriptedGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Self::default()
        })
    }

    pub fn script(&self, method: &'static str, entity: EntityKind, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry((method, entity))
            .or_default()
            .push_back(reply);
    }

    pub fn put_server_copy(&self, entity: EntityKind, id: &str, record: Value) {
        self.server_copies
            .lock()
            .unwrap()
            .insert((entity, id.to_string()), record);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, method: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.method == method)
            .collect()
    }

    fn record(&self, call: RecordedCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn next_reply(&self, method: &'static str, entity: EntityKind) -> Option<Reply> {
        self.replies
            .lock()
            .unwrap()
            .get_mut(&(method, entity))
            .and_then(VecDeque::pop_front)
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl RemoteGateway for ScriptedGateway {
    async fn create(
        &self,
        entity: EntityKind,
        body: &Value,
        idempotency_key: &str,
    ) -> Result<Value, SyncError> {
        self.record(RecordedCall {
            method: "create",
            entity,
            id: None,
            body: Some(body.clone()),
            idempotency_key: Some(idempotency_key.to_string()),
        });
        self.pause().await;
        if let Some(reply) = self.next_reply("create", entity) {
            return reply.into_result();
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let mut created = body.clone();
        if let Value::Object(map) = &mut created {
            map.insert("id".to_string(), Value::String(format!("srv-{n}")));
        }
        Ok(created)
    }

    async fn update(
        &self,
        entity: EntityKind,
        id: &EntityId,
        body: &Value,
    ) -> Result<Value, SyncError> {
        self.record(RecordedCall {
            method: "update",
            entity,
            id: Some(id.to_string()),
            body: Some(body.clone()),
            idempotency_key: None,
        });
        self.pause().await;
        match self.next_reply("update", entity) {
            Some(reply) => reply.into_result(),
            None => Ok(body.clone()),
        }
    }

    async fn delete(&self, entity: EntityKind, id: &EntityId) -> Result<(), SyncError> {
        self.record(RecordedCall {
            method: "delete",
            entity,
            id: Some(id.to_string()),
            body: None,
            idempotency_key: None,
        });
        self.pause().await;
        match self.next_reply("delete", entity) {
            Some(reply) => reply.into_result().map(|_| ()),
            None => Ok(()),
        }
    }

    async fn fetch(&self, entity: EntityKind, id: &EntityId) -> Result<Option<Value>, SyncError> {
        self.record(RecordedCall {
            method: "fetch",
            entity,
            id: Some(id.to_string()),
            body: None,
            idempotency_key: None,
        });
        Ok(self
            .server_copies
            .lock()
            .unwrap()
            .get(&(entity, id.to_string()))
            .cloned())
    }
}

pub struct FixedProbe(pub bool);

#[async_trait]
impl ConnectivityProbe for FixedProbe {
    async fn is_reachable(&self) -> bool {
        self.0
    }
}

pub struct TestContext {
    pub state: AppState,
    pub gateway: Arc<ScriptedGateway>,
}

pub fn test_config(database_url: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.database.url = database_url.to_string();
    config.database.max_connections = 1;
    config.remote.base_url = "http://remote.test/api".to_string();
    config.remote.request_timeout = 5;
    config
}

/// Engine over an in-memory store and a scripted remote, initially offline.
pub async fn setup_engine() -> TestContext {
    setup_engine_with(ScriptedGateway::new(), "sqlite::memory:").await
}

pub async fn setup_engine_with(gateway: Arc<ScriptedGateway>, database_url: &str) -> TestContext {
    let state = AppState::with_remote(
        test_config(database_url),
        gateway.clone(),
        Arc::new(FixedProbe(true)),
    )
    .await
    .expect("engine");

    TestContext { state, gateway }
}

#[allow(dead_code)]
pub fn id(value: &str) -> EntityId {
    EntityId::new(value.to_string()).expect("entity id")
}
