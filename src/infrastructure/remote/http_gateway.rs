use crate::application::ports::remote_gateway::RemoteGateway;
use crate::domain::entities::offline::{remote_record_id, unwrap_envelope};
use crate::domain::value_objects::offline::{EntityId, EntityKind};
use crate::shared::config::RemoteConfig;
use crate::shared::error::{AppError, SyncError};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::Value;

const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";
const MAX_ERROR_BODY: usize = 256;

/// REST client for the order-management backend.
#[derive(Clone)]
pub struct HttpRemoteGateway {
    base_url: String,
    api_token: Option<String>,
    http: reqwest::Client,
}

impl HttpRemoteGateway {
    pub fn new(config: &RemoteConfig) -> Result<Self, AppError> {
        let trimmed = config.base_url.trim();
        if trimmed.is_empty() {
            return Err(AppError::ConfigurationError(
                "Remote base_url is empty".to_string(),
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            base_url: trimmed.trim_end_matches('/').to_string(),
            api_token: config
                .api_token
                .clone()
                .filter(|value| !value.trim().is_empty()),
            http,
        })
    }

    fn collection_url(&self, entity: EntityKind) -> String {
        format!("{}/{}", self.base_url, entity.collection())
    }

    fn record_url(&self, entity: EntityKind, id: &EntityId) -> String {
        format!("{}/{}/{}", self.base_url, entity.collection(), id)
    }

    fn request(&self, method: Method, url: String) -> reqwest::RequestBuilder {
        let builder = self.http.request(method, url);
        if let Some(token) = &self.api_token {
            builder.bearer_auth(token)
        } else {
            builder
        }
    }
}

#[async_trait]
impl RemoteGateway for HttpRemoteGateway {
    async fn create(
        &self,
        entity: EntityKind,
        body: &Value,
        idempotency_key: &str,
    ) -> Result<Value, SyncError> {
        let resp = self
            .request(Method::POST, self.collection_url(entity))
            .header(IDEMPOTENCY_HEADER, idempotency_key)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        read_record(resp).await
    }

    async fn update(
        &self,
        entity: EntityKind,
        id: &EntityId,
        body: &Value,
    ) -> Result<Value, SyncError> {
        let resp = self
            .request(Method::PUT, self.record_url(entity, id))
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        read_record(resp).await
    }

    async fn delete(&self, entity: EntityKind, id: &EntityId) -> Result<(), SyncError> {
        let resp = self
            .request(Method::DELETE, self.record_url(entity, id))
            .send()
            .await
            .map_err(transport_error)?;

        // A replayed delete finds nothing left to remove.
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        read_record(resp).await.map(|_| ())
    }

    async fn fetch(&self, entity: EntityKind, id: &EntityId) -> Result<Option<Value>, SyncError> {
        let resp = self
            .request(Method::GET, self.record_url(entity, id))
            .send()
            .await
            .map_err(transport_error)?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        read_record(resp).await.map(Some)
    }
}

fn transport_error(err: reqwest::Error) -> SyncError {
    if err.is_timeout() {
        SyncError::TransientNetwork(format!("request timed out: {err}"))
    } else {
        SyncError::TransientNetwork(err.to_string())
    }
}

async fn read_record(resp: reqwest::Response) -> Result<Value, SyncError> {
    let status = resp.status();
    let body = resp.text().await.map_err(transport_error)?;

    if !status.is_success() {
        return Err(classify_failure(status, &body));
    }
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    // The write may have landed; a garbled body is retried rather than rejected.
    let parsed: Value = serde_json::from_str(&body).map_err(|err| {
        SyncError::TransientNetwork(format!("unreadable response body: {err}"))
    })?;
    Ok(unwrap_envelope(parsed))
}

/// Maps a non-success response onto the sync error taxonomy.
pub fn classify_failure(status: StatusCode, body: &str) -> SyncError {
    let message = format!("HTTP {}: {}", status.as_u16(), error_message(body));

    match status {
        StatusCode::CONFLICT => {
            let remote = serde_json::from_str::<Value>(body)
                .ok()
                .map(unwrap_envelope)
                .filter(|record| remote_record_id(record).is_some());
            SyncError::ServerConflict { message, remote }
        }
        StatusCode::UNAUTHORIZED => SyncError::Unauthorized(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            SyncError::TransientNetwork(message)
        }
        status if status.is_client_error() => SyncError::PermanentValidation(message),
        _ => SyncError::TransientNetwork(message),
    }
}

fn error_message(body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for key in ["message", "error"] {
            if let Some(Value::String(text)) = map.get(key) {
                return text.clone();
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response".to_string();
    }
    trimmed.chars().take(MAX_ERROR_BODY).collect()
}
