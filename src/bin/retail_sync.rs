use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use retail_sync::application::ports::SyncQueueStore;
use retail_sync::domain::entities::offline::SyncEvent;
use retail_sync::domain::value_objects::offline::SyncOperationId;
use retail_sync::infrastructure::offline::{QueueMaintenanceJob, metrics};
use retail_sync::{AppConfig, AppState, init_logging};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "retail-sync")]
#[command(about = "Inspect and drive the offline sync queue", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// SQLite url of the local store
    #[arg(long, global = true, env = "RETAIL_SYNC_DATABASE_URL")]
    database_url: Option<String>,

    /// Base url of the remote API
    #[arg(long, global = true, env = "RETAIL_SYNC_REMOTE_URL")]
    remote_url: Option<String>,

    /// Enable JSON logging
    #[arg(long, global = true, env = "RETAIL_SYNC_JSON_LOGS")]
    json_logs: bool,

    /// Pretty-print command output
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Queue counts, connectivity and drain state
    Status,
    /// Failed operations with their last error
    Failed,
    /// Re-arm a failed operation
    Retry {
        /// Operation id as shown by `failed`
        id: String,
    },
    /// Drain the queue once
    Drain,
    /// Delete completed operations older than the given age
    Prune {
        #[arg(long, default_value_t = 24 * 7)]
        older_than_hours: u64,
    },
    /// Keep syncing until Ctrl+C
    Run,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RetryOutput {
    operation_id: String,
    rearmed: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    let mut config = AppConfig::from_env();
    if let Some(url) = cli.database_url.as_deref() {
        config.database.url = url.to_string();
    }
    if let Some(url) = cli.remote_url.as_deref() {
        config.remote.base_url = url.trim_end_matches('/').to_string();
    }

    let state = AppState::new(config)
        .await
        .context("failed to initialize the sync engine")?;

    let result = match cli.command {
        Commands::Status => status(&state, cli.pretty).await,
        Commands::Failed => failed(&state, cli.pretty).await,
        Commands::Retry { id } => retry(&state, &id, cli.pretty).await,
        Commands::Drain => drain(&state, cli.pretty).await,
        Commands::Prune { older_than_hours } => prune(&state, older_than_hours, cli.pretty).await,
        Commands::Run => run(&state).await,
    };

    state.shutdown().await;
    result
}

async fn status(state: &AppState, pretty: bool) -> Result<()> {
    state.probe_now().await;
    let snapshot = state.service.sync_status().await?;
    print_json(&snapshot, pretty)
}

async fn failed(state: &AppState, pretty: bool) -> Result<()> {
    let operations = state.service.failed_operations().await?;
    print_json(&operations, pretty)
}

async fn retry(state: &AppState, id: &str, pretty: bool) -> Result<()> {
    let operation_id = SyncOperationId::parse(id).map_err(anyhow::Error::msg)?;
    if state.store.get_operation(&operation_id).await?.is_none() {
        bail!("no queued operation with id {id}");
    }
    let rearmed = state.service.retry_operation(&operation_id).await?;
    if !rearmed {
        warn!("operation {id} is not failed; nothing to retry");
    }
    print_json(
        &RetryOutput {
            operation_id: operation_id.to_string(),
            rearmed,
        },
        pretty,
    )
}

async fn drain(state: &AppState, pretty: bool) -> Result<()> {
    if !state.probe_now().await {
        warn!(
            "remote {} is unreachable; nothing will be sent",
            state.config.remote.base_url
        );
    }
    let report = state.service.sync_now().await?;
    info!(
        synced = report.synced_count,
        failed = report.failed_count,
        pending = report.pending_count,
        "drain finished"
    );
    print_json(
        &serde_json::json!({
            "report": report,
            "metrics": metrics::snapshot(),
        }),
        pretty,
    )
}

async fn prune(state: &AppState, older_than_hours: u64, pretty: bool) -> Result<()> {
    let hours = i64::try_from(older_than_hours).context("--older-than-hours is too large")?;
    let retention = chrono::Duration::try_hours(hours).context("--older-than-hours is too large")?;
    let report = QueueMaintenanceJob::new(state.store.clone(), state.store.clone(), retention)
        .run_once()
        .await?;
    print_json(&report, pretty)
}

async fn run(state: &AppState) -> Result<()> {
    if !state.config.sync.auto_sync {
        bail!("auto sync is disabled (RETAIL_SYNC_AUTO_SYNC); use `drain` instead");
    }

    let mut events = state.service.subscribe();
    let probe = state.start_probe();
    let maintenance = state.start_maintenance();
    let scheduler = state.start_scheduler();
    info!(
        remote = %state.config.remote.base_url,
        "retail-sync is running. Press Ctrl+C to stop."
    );

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl+C")?;
                break;
            }
            event = events.recv() => match event {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event stream lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    }

    info!("Shutting down...");
    state.executor.request_stop();
    scheduler.shutdown().await;
    probe.abort();
    maintenance.abort();
    Ok(())
}

fn log_event(event: &SyncEvent) {
    match event {
        SyncEvent::DrainCompleted(report) if report.attempted() > 0 => info!(
            synced = report.synced_count,
            failed = report.failed_count,
            conflicts = report.conflicts_resolved,
            pending = report.pending_count,
            "drain completed"
        ),
        SyncEvent::DrainCompleted(_) => {}
        SyncEvent::OperationFailed {
            operation_id,
            entity,
            kind,
            error,
            ..
        } => warn!(%operation_id, %entity, %kind, error = %error, "operation failed"),
        SyncEvent::IdentifierReconciled {
            entity,
            temporary_id,
            remote_id,
        } => info!(%entity, %temporary_id, %remote_id, "identifier reconciled"),
        SyncEvent::ConnectivityChanged { online } => info!(online, "connectivity changed"),
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let output = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{output}");
    Ok(())
}
