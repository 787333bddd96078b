mod translator;


use crate::application::ports::{LocalStore, RemoteGateway, SyncQueueStore};
use crate::application::services::connectivity::ConnectivityMonitor;
use crate::application::services::identifier_reconciler::IdentifierReconciler;
use crate::domain::entities::offline::{
    DrainReport, LocalRecord, SyncEvent, SyncOperation, remote_record_id,
};
use crate::domain::value_objects::offline::{EntityId, EntityKind, FailureKind, SyncQueueStatus};
use crate::infrastructure::offline::metrics::{self, SyncOutcome, SyncOutcomeMetadata};
use crate::shared::error::{AppError, SyncError};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, broadcast};
use translator::RemoteCall;

const EVENT_CAPACITY: usize = 64;

/// What happened to one operation during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OperationOutcome {
    Synced,
    ConflictResolved,
    Deferred { parked: bool },
    Retried { halt: bool },
    Exhausted { halt: bool },
    Rejected,
}

/// Result of talking to the remote for one operation.
enum Executed {
    Synced,
    ConflictResolved,
}

/// Drains the sync queue against the remote, one operation at a time.
pub struct SyncExecutor {
    queue: Arc<dyn SyncQueueStore>,
    local: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteGateway>,
    reconciler: Arc<IdentifierReconciler>,
    connectivity: Arc<ConnectivityMonitor>,
    max_retry: u32,
    request_timeout: Duration,
    gate: Mutex<()>,
    rerun: AtomicBool,
    stop: AtomicBool,
    draining: AtomicBool,
    events: broadcast::Sender<SyncEvent>,
}

impl SyncExecutor {
    pub fn new(
        queue: Arc<dyn SyncQueueStore>,
        local: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteGateway>,
        reconciler: Arc<IdentifierReconciler>,
        connectivity: Arc<ConnectivityMonitor>,
        max_retry: u32,
        request_timeout: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            queue,
            local,
            remote,
            reconciler,
            connectivity,
            max_retry: max_retry.max(1),
            request_timeout,
            gate: Mutex::new(()),
            rerun: AtomicBool::new(false),
            stop: AtomicBool::new(false),
            draining: AtomicBool::new(false),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }

    /// Asks a running drain to stop before its next operation.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub(crate) fn emit(&self, event: SyncEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Runs drain passes until the queue settles. A call made while another
    /// drain is running returns at once and schedules one more pass instead.
    pub async fn drain(&self) -> Result<DrainReport, AppError> {
        self.rerun.store(true, Ordering::SeqCst);
        let mut total: Option<DrainReport> = None;
        loop {
            let Ok(guard) = self.gate.try_lock() else {
                if let Some(report) = total {
                    return Ok(report);
                }
                tracing::debug!(target: "sync::executor", "drain already running, coalescing");
                return Ok(DrainReport::coalesced());
            };
            let report = self.drain_locked().await?;
            drop(guard);

            let report = match total.take() {
                Some(mut earlier) => {
                    merge(&mut earlier, &report);
                    earlier.pending_count = report.pending_count;
                    earlier
                }
                None => report,
            };
            // A trigger can land between the last pass and the gate opening.
            if report.interrupted || !self.rerun.load(Ordering::SeqCst) {
                return Ok(report);
            }
            tracing::debug!(target: "sync::executor", "trigger arrived while closing, draining again");
            total = Some(report);
        }
    }

    async fn drain_locked(&self) -> Result<DrainReport, AppError> {
        self.stop.store(false, Ordering::SeqCst);
        self.draining.store(true, Ordering::SeqCst);
        let started = Instant::now();
        let result = self.run_passes().await;
        self.draining.store(false, Ordering::SeqCst);
        metrics::record_drain(started.elapsed().as_millis() as u64);

        let mut report = result?;
        report.pending_count = self.queue.pending_count().await?;

        if report.attempted() > 0 || report.deferred_count > 0 {
            tracing::info!(
                target: "sync::executor",
                synced = report.synced_count,
                failed = report.failed_count,
                conflicts = report.conflicts_resolved,
                deferred = report.deferred_count,
                retried = report.retried_count,
                pending = report.pending_count,
                interrupted = report.interrupted,
                "drain completed"
            );
        }
        self.emit(SyncEvent::DrainCompleted(report.clone()));
        Ok(report)
    }

    async fn run_passes(&self) -> Result<DrainReport, AppError> {
        let mut total = DrainReport::default();
        loop {
            self.rerun.store(false, Ordering::SeqCst);
            let pass = self.drain_pass().await?;
            merge(&mut total, &pass);

            if pass.interrupted || !self.rerun.swap(false, Ordering::SeqCst) {
                break;
            }
            tracing::debug!(target: "sync::executor", "running follow-up pass");
        }
        Ok(total)
    }

    async fn drain_pass(&self) -> Result<DrainReport, AppError> {
        let mut report = DrainReport::default();

        if !self.connectivity.is_online() {
            tracing::debug!(target: "sync::executor", "offline, skipping drain");
            return Ok(report);
        }

        let pending = self.queue.list_pending().await?;
        if pending.is_empty() {
            return Ok(report);
        }

        let mut blocked: HashSet<EntityKind> = HashSet::new();
        // Records waiting on a create stuck at the retry ceiling. They hold
        // back their own later operations but not the rest of the family.
        let mut parked: HashSet<(EntityKind, EntityId)> = HashSet::new();

        for queued in pending {
            if self.stop.load(Ordering::SeqCst) || !self.connectivity.is_online() {
                report.interrupted = true;
                break;
            }
            if blocked.contains(&queued.entity)
                || parked.contains(&(queued.entity, queued.entity_id.clone()))
            {
                continue;
            }

            // Earlier operations in this pass may have rewritten ids or
            // superseded this one.
            let Some(operation) = self.queue.get_operation(&queued.id).await? else {
                continue;
            };
            if !operation.is_drainable() {
                continue;
            }

            match self.process(&operation, &parked).await? {
                OperationOutcome::Synced => report.synced_count += 1,
                OperationOutcome::ConflictResolved => report.conflicts_resolved += 1,
                OperationOutcome::Deferred { parked: true } => {
                    report.deferred_count += 1;
                    parked.insert((operation.entity, operation.entity_id.clone()));
                }
                OperationOutcome::Deferred { parked: false } => {
                    report.deferred_count += 1;
                    blocked.insert(operation.entity);
                }
                OperationOutcome::Retried { halt } => {
                    report.retried_count += 1;
                    blocked.insert(operation.entity);
                    if halt {
                        report.interrupted = true;
                        break;
                    }
                }
                OperationOutcome::Exhausted { halt } => {
                    report.failed_count += 1;
                    blocked.insert(operation.entity);
                    if halt {
                        report.interrupted = true;
                        break;
                    }
                }
                OperationOutcome::Rejected => report.failed_count += 1,
            }
        }

        Ok(report)
    }

    async fn process(
        &self,
        operation: &SyncOperation,
        parked: &HashSet<(EntityKind, EntityId)>,
    ) -> Result<OperationOutcome, AppError> {
        self.queue
            .mark_status(&operation.id, SyncQueueStatus::Syncing, None)
            .await?;

        let mut error = None;
        let outcome = match self.execute(operation).await {
            Ok(Executed::Synced) => {
                self.queue
                    .mark_status(&operation.id, SyncQueueStatus::Completed, None)
                    .await?;
                OperationOutcome::Synced
            }
            Ok(Executed::ConflictResolved) => {
                self.queue
                    .mark_status(
                        &operation.id,
                        SyncQueueStatus::Completed,
                        Some("conflict resolved with server copy".to_string()),
                    )
                    .await?;
                OperationOutcome::ConflictResolved
            }
            Err(SyncError::DependencyNotReady {
                entity,
                entity_id,
                parked: exhausted,
            }) => {
                let parked = exhausted || parked.contains(&(entity, entity_id.clone()));
                tracing::debug!(
                    target: "sync::executor",
                    operation_id = %operation.id,
                    waiting_on = %entity,
                    waiting_on_id = %entity_id,
                    parked,
                    "dependency not synced yet, deferring"
                );
                self.queue
                    .mark_status(&operation.id, SyncQueueStatus::Pending, None)
                    .await?;
                OperationOutcome::Deferred { parked }
            }
            Err(err) if err.is_transient() => {
                let halt = matches!(err, SyncError::Unauthorized(_));
                error = Some(err.to_string());
                self.record_transient(operation, &err, halt).await?
            }
            Err(err) => {
                error = Some(err.to_string());
                self.record_rejection(operation, &err).await?;
                OperationOutcome::Rejected
            }
        };

        let outcome_kind = match outcome {
            OperationOutcome::Synced => SyncOutcome::Synced,
            OperationOutcome::ConflictResolved => SyncOutcome::ConflictResolved,
            OperationOutcome::Deferred { .. } => SyncOutcome::Deferred,
            OperationOutcome::Retried { .. } => SyncOutcome::Retried,
            OperationOutcome::Exhausted { .. } | OperationOutcome::Rejected => SyncOutcome::Failed,
        };
        metrics::record_outcome(
            outcome_kind,
            &SyncOutcomeMetadata {
                operation_id: Some(operation.id.to_string()),
                entity: Some(operation.entity.to_string()),
                operation_type: Some(operation.operation_type.to_string()),
                retry_count: Some(operation.retry_count),
                error,
            },
        );

        Ok(outcome)
    }

    async fn record_transient(
        &self,
        operation: &SyncOperation,
        err: &SyncError,
        halt: bool,
    ) -> Result<OperationOutcome, AppError> {
        let message = err.to_string();
        let (retry_count, next) = operation.next_after_transient_failure(self.max_retry);

        if next == SyncQueueStatus::Failed {
            tracing::warn!(
                target: "sync::executor",
                operation_id = %operation.id,
                entity = %operation.entity,
                retry_count,
                error = %message,
                "retry ceiling reached"
            );
            self.queue
                .record_failure(&operation.id, FailureKind::Exhausted, retry_count, message.clone())
                .await?;
            self.emit_failure(operation, FailureKind::Exhausted, message);
            return Ok(OperationOutcome::Exhausted { halt });
        }

        tracing::debug!(
            target: "sync::executor",
            operation_id = %operation.id,
            entity = %operation.entity,
            retry_count,
            error = %message,
            "transient failure, will retry"
        );
        self.queue
            .record_retry(&operation.id, retry_count, message)
            .await?;
        Ok(OperationOutcome::Retried { halt })
    }

    async fn record_rejection(
        &self,
        operation: &SyncOperation,
        err: &SyncError,
    ) -> Result<(), AppError> {
        let message = err.to_string();
        tracing::warn!(
            target: "sync::executor",
            operation_id = %operation.id,
            entity = %operation.entity,
            entity_id = %operation.entity_id,
            error = %message,
            "operation rejected by remote"
        );
        self.queue
            .record_failure(
                &operation.id,
                FailureKind::Rejected,
                operation.retry_count,
                message.clone(),
            )
            .await?;
        self.emit_failure(operation, FailureKind::Rejected, message);
        Ok(())
    }

    fn emit_failure(&self, operation: &SyncOperation, kind: FailureKind, error: String) {
        self.emit(SyncEvent::OperationFailed {
            operation_id: operation.id.clone(),
            entity: operation.entity,
            entity_id: operation.entity_id.clone(),
            kind,
            error,
        });
    }

    async fn execute(&self, operation: &SyncOperation) -> Result<Executed, SyncError> {
        if !operation.is_create()
            && let Some(create) = self
                .queue
                .find_unsynced_create(operation.entity, &operation.entity_id, Some(operation.seq))
                .await?
        {
            if create.is_rejected() {
                return Err(SyncError::PermanentValidation(format!(
                    "create of {} {} was rejected by the remote",
                    operation.entity, operation.entity_id
                )));
            }
            return Err(SyncError::DependencyNotReady {
                entity: operation.entity,
                entity_id: operation.entity_id.clone(),
                parked: create.is_exhausted(),
            });
        }

        // The remote already holds this record; only the local rewrite is owed.
        if operation.is_create()
            && let Some(remote_id) = &operation.remote_id
        {
            self.reconcile(operation.entity, &operation.entity_id, remote_id)
                .await?;
            return Ok(Executed::Synced);
        }

        let call = translator::translate(operation, self.queue.as_ref(), &self.reconciler).await?;
        match self.dispatch(operation.entity, call).await {
            Ok(response) => {
                self.apply_success(operation, response).await?;
                Ok(Executed::Synced)
            }
            Err(SyncError::ServerConflict { message, remote }) => {
                self.resolve_conflict(operation, remote, message).await
            }
            Err(err) => Err(err),
        }
    }

    async fn dispatch(&self, entity: EntityKind, call: RemoteCall) -> Result<Value, SyncError> {
        let request = async {
            match call {
                RemoteCall::Create {
                    body,
                    idempotency_key,
                } => self.remote.create(entity, &body, &idempotency_key).await,
                RemoteCall::Update { id, body } => self.remote.update(entity, &id, &body).await,
                RemoteCall::Delete { id } => {
                    self.remote.delete(entity, &id).await.map(|_| Value::Null)
                }
            }
        };

        tokio::time::timeout(self.request_timeout, request)
            .await
            .map_err(|_| {
                SyncError::TransientNetwork(format!(
                    "request timed out after {}s",
                    self.request_timeout.as_secs()
                ))
            })?
    }

    async fn apply_success(
        &self,
        operation: &SyncOperation,
        response: Value,
    ) -> Result<(), SyncError> {
        if !operation.is_create() {
            return Ok(());
        }

        let Some(raw_id) = remote_record_id(&response) else {
            tracing::warn!(
                target: "sync::executor",
                operation_id = %operation.id,
                entity = %operation.entity,
                "create response carried no id, keeping local id"
            );
            return Ok(());
        };
        let remote_id = EntityId::new(raw_id).map_err(SyncError::LocalStorage)?;

        self.queue
            .record_remote_id(&operation.id, &remote_id)
            .await?;
        self.reconcile(operation.entity, &operation.entity_id, &remote_id)
            .await
    }

    async fn reconcile(
        &self,
        entity: EntityKind,
        temporary_id: &EntityId,
        remote_id: &EntityId,
    ) -> Result<(), SyncError> {
        if temporary_id == remote_id {
            return Ok(());
        }
        self.reconciler
            .reconcile(entity, temporary_id, remote_id)
            .await?;
        self.emit(SyncEvent::IdentifierReconciled {
            entity,
            temporary_id: temporary_id.clone(),
            remote_id: remote_id.clone(),
        });
        Ok(())
    }

    /// Server wins: the local record is replaced by the remote copy.
    async fn resolve_conflict(
        &self,
        operation: &SyncOperation,
        remote: Option<Value>,
        message: String,
    ) -> Result<Executed, SyncError> {
        let server_copy = match remote {
            Some(record) => Some(record),
            None => {
                self.remote
                    .fetch(operation.entity, &operation.entity_id)
                    .await?
            }
        };

        let Some(server_copy) = server_copy else {
            if operation.is_create() {
                // Nothing to adopt; keep the local record and surface the conflict.
                return Err(SyncError::ServerConflict {
                    message,
                    remote: None,
                });
            }
            self.local
                .remove(operation.entity, &operation.entity_id)
                .await?;
            tracing::info!(
                target: "sync::executor",
                operation_id = %operation.id,
                entity = %operation.entity,
                entity_id = %operation.entity_id,
                "conflict: record gone on remote, removed locally"
            );
            return Ok(Executed::ConflictResolved);
        };

        let server_id = match remote_record_id(&server_copy) {
            Some(raw) => EntityId::new(raw).map_err(SyncError::LocalStorage)?,
            None => operation.entity_id.clone(),
        };
        if server_id != operation.entity_id {
            if operation.is_create() {
                self.queue
                    .record_remote_id(&operation.id, &server_id)
                    .await?;
            }
            self.reconcile(operation.entity, &operation.entity_id, &server_id)
                .await?;
        }

        self.local
            .update(&LocalRecord::new(operation.entity, server_id.clone(), server_copy))
            .await?;

        tracing::info!(
            target: "sync::executor",
            operation_id = %operation.id,
            entity = %operation.entity,
            entity_id = %server_id,
            "conflict: local record overwritten with server copy"
        );
        Ok(Executed::ConflictResolved)
    }
}

fn merge(total: &mut DrainReport, pass: &DrainReport) {
    total.synced_count += pass.synced_count;
    total.failed_count += pass.failed_count;
    total.conflicts_resolved += pass.conflicts_resolved;
    total.deferred_count += pass.deferred_count;
    total.retried_count += pass.retried_count;
    total.interrupted |= pass.interrupted;
}
