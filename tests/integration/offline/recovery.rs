use crate::common::offline_support::{ScriptedGateway, id, setup_engine, setup_engine_with};
use retail_sync::application::ports::SyncQueueStore;
use retail_sync::domain::value_objects::offline::{EntityKind, SyncQueueStatus};
use retail_sync::infrastructure::offline::QueueMaintenanceJob;
use serde_json::json;

#[tokio::test]
async fn interrupted_operations_resume_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("sync.db").display());

    let op_id = {
        let ctx = setup_engine_with(ScriptedGateway::new(), &url).await;
        let record = ctx
            .state
            .service
            .update_record(EntityKind::Commission, &id("com-1"), json!({"rate": 0.05}))
            .await
            .unwrap();
        let pending = ctx.state.store.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].entity_id, record.id);

        // the process dies while the request is in flight
        ctx.state
            .store
            .mark_status(&pending[0].id, SyncQueueStatus::Syncing, None)
            .await
            .unwrap();
        ctx.state.shutdown().await;
        pending[0].id.clone()
    };

    let ctx = setup_engine_with(ScriptedGateway::new(), &url).await;
    let recovered = ctx.state.store.get_operation(&op_id).await.unwrap().unwrap();
    assert_eq!(recovered.status, SyncQueueStatus::Pending);

    ctx.state.connectivity.set_online(true);
    let report = ctx.state.service.sync_now().await.unwrap();
    assert_eq!(report.synced_count, 1);
    assert_eq!(ctx.gateway.calls_for("update").len(), 1);
    ctx.state.shutdown().await;
}

#[tokio::test]
async fn delete_after_restart_still_reaches_remote_for_in_flight_create() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("sync.db").display());

    let record_id = {
        let ctx = setup_engine_with(ScriptedGateway::new(), &url).await;
        let record = ctx
            .state
            .service
            .create_record(EntityKind::Client, json!({"name": "Ana"}))
            .await
            .unwrap();
        let pending = ctx.state.store.list_pending().await.unwrap();
        // the create may have landed before the process died
        ctx.state
            .store
            .mark_status(&pending[0].id, SyncQueueStatus::Syncing, None)
            .await
            .unwrap();
        ctx.state.shutdown().await;
        record.id
    };

    let ctx = setup_engine_with(ScriptedGateway::new(), &url).await;
    let delete = ctx
        .state
        .service
        .delete_record(EntityKind::Client, &record_id)
        .await
        .unwrap();
    let stored = ctx.state.store.get_operation(&delete).await.unwrap().unwrap();
    assert_eq!(stored.status, SyncQueueStatus::Pending);

    ctx.state.connectivity.set_online(true);
    let report = ctx.state.service.sync_now().await.unwrap();
    assert_eq!(report.synced_count, 2);
    let deletes = ctx.gateway.calls_for("delete");
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes[0].id.as_deref(), Some("srv-1"));
    ctx.state.shutdown().await;
}

#[tokio::test]
async fn maintenance_prunes_completed_history_only() {
    let ctx = setup_engine().await;
    ctx.state
        .service
        .update_record(EntityKind::User, &id("u1"), json!({"name": "admin"}))
        .await
        .unwrap();
    ctx.state.connectivity.set_online(true);
    ctx.state.service.sync_now().await.unwrap();

    ctx.state.connectivity.set_online(false);
    ctx.state
        .service
        .update_record(EntityKind::User, &id("u2"), json!({"name": "caja"}))
        .await
        .unwrap();

    // negative retention puts the cutoff in the future
    let job = QueueMaintenanceJob::new(
        ctx.state.store.clone(),
        ctx.state.store.clone(),
        chrono::Duration::hours(-1),
    );
    let report = job.run_once().await.unwrap();
    assert_eq!(report.pruned_count, 1);
    assert_eq!(report.pending_count, 1);

    let stats = ctx.state.service.sync_status().await.unwrap().stats;
    assert_eq!(stats.completed, 0);
    assert_eq!(stats.pending, 1);
}
