use crate::application::ports::{ConnectivityProbe, RemoteGateway, SyncQueueStore};
use crate::application::services::{
    ConnectivityMonitor, IdentifierReconciler, OfflineSyncService, SchedulerHandle,
    SyncExecutor, SyncScheduler,
};
use crate::domain::entities::offline::SyncEvent;
use crate::infrastructure::database::ConnectionPool;
use crate::infrastructure::offline::{QueueMaintenanceJob, SqliteOfflineStore};
use crate::infrastructure::remote::{HttpHealthProbe, HttpRemoteGateway};
use crate::shared::config::AppConfig;
use crate::shared::error::AppError;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Everything the engine needs, wired from one `AppConfig`.
pub struct AppState {
    pub config: AppConfig,
    pub pool: ConnectionPool,
    pub store: Arc<SqliteOfflineStore>,
    pub connectivity: Arc<ConnectivityMonitor>,
    pub executor: Arc<SyncExecutor>,
    pub service: Arc<OfflineSyncService>,
    pub maintenance: Arc<QueueMaintenanceJob>,
    probe: Arc<dyn ConnectivityProbe>,
    trigger: Arc<Notify>,
}

impl AppState {
    pub async fn new(config: AppConfig) -> Result<Self, AppError> {
        config.validate().map_err(AppError::ConfigurationError)?;
        let remote = Arc::new(HttpRemoteGateway::new(&config.remote)?);
        let probe = Arc::new(HttpHealthProbe::new(&config.remote)?);
        Self::with_remote(config, remote, probe).await
    }

    /// Same wiring with caller-supplied remote collaborators.
    pub async fn with_remote(
        config: AppConfig,
        remote: Arc<dyn RemoteGateway>,
        probe: Arc<dyn ConnectivityProbe>,
    ) -> Result<Self, AppError> {
        ensure_database_dir(&config.database.url)?;
        let pool = ConnectionPool::new(&config.database.url, config.database.max_connections)
            .await?;
        pool.migrate().await?;

        let store = Arc::new(SqliteOfflineStore::new(pool.get_pool().clone()));
        let recovered = store.recover_interrupted().await?;
        if recovered > 0 {
            tracing::warn!(
                target: "sync::queue",
                recovered,
                "operations interrupted mid-sync returned to pending"
            );
        }

        let connectivity = Arc::new(ConnectivityMonitor::default());
        let reconciler = Arc::new(IdentifierReconciler::new(store.clone()));
        let executor = Arc::new(SyncExecutor::new(
            store.clone(),
            store.clone(),
            remote,
            reconciler,
            connectivity.clone(),
            config.sync.max_retry,
            config.remote.timeout(),
        ));
        let trigger = Arc::new(Notify::new());
        let service = Arc::new(OfflineSyncService::new(
            store.clone(),
            store.clone(),
            executor.clone(),
            connectivity.clone(),
            trigger.clone(),
        ));
        let maintenance =
            QueueMaintenanceJob::new(store.clone(), store.clone(), config.sync.retention());

        tracing::info!(
            target: "sync::scheduler",
            database = %config.database.url,
            remote = %config.remote.base_url,
            "sync engine initialized"
        );

        Ok(Self {
            config,
            pool,
            store,
            connectivity,
            executor,
            service,
            maintenance,
            probe,
            trigger,
        })
    }

    /// Checks the remote once and records the result.
    pub async fn probe_now(&self) -> bool {
        let reachable = self.probe.is_reachable().await;
        self.connectivity.set_online(reachable);
        reachable
    }

    pub fn start_probe(&self) -> JoinHandle<()> {
        self.connectivity
            .spawn_probe(self.probe.clone(), self.config.sync.probe_interval())
    }

    pub fn start_scheduler(&self) -> SchedulerHandle {
        SyncScheduler::new(
            self.executor.clone(),
            self.store.clone(),
            self.connectivity.clone(),
            self.config.sync.interval(),
            self.trigger.clone(),
        )
        .spawn()
    }

    /// Prunes completed history after every drain that moved something.
    pub fn start_maintenance(&self) -> JoinHandle<()> {
        let mut events = self.executor.subscribe();
        let job = self.maintenance.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(SyncEvent::DrainCompleted(report)) if report.synced_count > 0 => {
                        job.trigger();
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(target: "sync::queue", skipped, "maintenance listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    pub async fn shutdown(&self) {
        self.executor.request_stop();
        self.pool.close().await;
    }
}

/// File-backed SQLite urls need their directory before the first connect.
fn ensure_database_dir(url: &str) -> Result<(), AppError> {
    let Some(rest) = url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path == ":memory:" {
        return Ok(());
    }
    if let Some(parent) = Path::new(path).parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|err| {
            AppError::Storage(format!("failed to create {}: {err}", parent.display()))
        })?;
    }
    Ok(())
}
