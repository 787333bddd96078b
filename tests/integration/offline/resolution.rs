use crate::common::offline_support::{Reply, ScriptedGateway, id, setup_engine, setup_engine_with};
use retail_sync::application::ports::SyncQueueStore;
use retail_sync::domain::value_objects::offline::{EntityKind, FailureKind, SyncQueueStatus};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn server_copy_wins_a_conflict() {
    let ctx = setup_engine().await;
    ctx.gateway.script(
        "update",
        EntityKind::Product,
        Reply::Conflict(Some(json!({"id": "p1", "name": "Server name", "price": 12}))),
    );

    let local = ctx
        .state
        .service
        .update_record(EntityKind::Product, &id("p1"), json!({"name": "Local name", "price": 9}))
        .await
        .unwrap();
    assert_eq!(local.data["name"], "Local name");

    ctx.state.connectivity.set_online(true);
    let report = ctx.state.service.sync_now().await.unwrap();
    assert_eq!(report.conflicts_resolved, 1);
    assert_eq!(report.failed_count, 0);

    let local = ctx
        .state
        .service
        .get_record(EntityKind::Product, &id("p1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(local.data["name"], "Server name");
    assert_eq!(local.data["price"], 12);

    let stats = ctx.state.service.sync_status().await.unwrap().stats;
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.pending, 0);
}

#[tokio::test]
async fn conflict_without_server_record_removes_local_copy() {
    let ctx = setup_engine().await;
    ctx.gateway
        .script("update", EntityKind::Budget, Reply::Conflict(None));

    ctx.state
        .service
        .update_record(EntityKind::Budget, &id("b1"), json!({"total": 300}))
        .await
        .unwrap();

    ctx.state.connectivity.set_online(true);
    let report = ctx.state.service.sync_now().await.unwrap();
    assert_eq!(report.conflicts_resolved, 1);

    // the gateway was asked for its copy and had none
    assert_eq!(ctx.gateway.calls_for("fetch").len(), 1);
    assert!(
        ctx.state
            .service
            .get_record(EntityKind::Budget, &id("b1"))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn transient_failures_stop_at_the_retry_ceiling() {
    let ctx = setup_engine().await;
    for _ in 0..3 {
        ctx.gateway
            .script("update", EntityKind::Category, Reply::Transient("HTTP 503"));
    }

    ctx.state
        .service
        .update_record(EntityKind::Category, &id("cat-1"), json!({"name": "Limpieza"}))
        .await
        .unwrap();
    ctx.state.connectivity.set_online(true);

    for attempt in 1..=2 {
        let report = ctx.state.service.sync_now().await.unwrap();
        assert_eq!(report.retried_count, 1);
        let pending = ctx.state.store.list_pending().await.unwrap();
        assert_eq!(pending[0].retry_count, attempt);
    }

    let report = ctx.state.service.sync_now().await.unwrap();
    assert_eq!(report.failed_count, 1);
    assert!(ctx.state.store.list_pending().await.unwrap().is_empty());

    let failed = ctx.state.service.failed_operations().await.unwrap();
    assert_eq!(failed[0].retry_count, 3);
    assert_eq!(failed[0].status, SyncQueueStatus::Failed);
    assert_eq!(failed[0].failure_kind, Some(FailureKind::Exhausted));

    ctx.state.service.sync_now().await.unwrap();
    assert_eq!(ctx.gateway.calls_for("update").len(), 3);

    // manual retry gives it a fresh budget; the remote is healthy again
    assert!(ctx.state.service.retry_operation(&failed[0].id).await.unwrap());
    let report = ctx.state.service.sync_now().await.unwrap();
    assert_eq!(report.synced_count, 1);
}

#[tokio::test]
async fn overlapping_drains_coalesce() {
    let gateway = ScriptedGateway::with_delay(Duration::from_millis(100));
    let ctx = Arc::new(setup_engine_with(gateway, "sqlite::memory:").await);
    for n in 0..2 {
        ctx.state
            .service
            .update_record(EntityKind::Store, &id(&format!("s{n}")), json!({"n": n}))
            .await
            .unwrap();
    }
    ctx.state.connectivity.set_online(true);

    let background = {
        let ctx = Arc::clone(&ctx);
        tokio::spawn(async move { ctx.state.service.sync_now().await.unwrap() })
    };
    while !ctx.state.executor.is_draining() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let overlapping = ctx.state.service.sync_now().await.unwrap();
    assert!(overlapping.coalesced);
    assert_eq!(overlapping.attempted(), 0);

    let first = background.await.unwrap();
    assert_eq!(first.synced_count, 2);
    assert_eq!(ctx.gateway.calls().len(), 2);
}
