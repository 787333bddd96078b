use crate::common::offline_support::{Reply, id, setup_engine};
use retail_sync::application::ports::{LocalStore, SyncQueueStore};
use retail_sync::domain::entities::offline::{SyncEvent, SyncOperationDraft};
use retail_sync::domain::value_objects::offline::{
    EntityKind, FailureKind, OfflinePayload, SyncOperationType, SyncQueueStatus,
};
use serde_json::json;

#[tokio::test]
async fn offline_order_create_is_reconciled_to_remote_id() {
    let ctx = setup_engine().await;
    ctx.gateway.script(
        "create",
        EntityKind::Order,
        Reply::Ok(json!({"data": {"_id": "abc123", "clientId": "c1", "total": 99}})),
    );

    let op = ctx
        .state
        .store
        .commit_mutation(SyncOperationDraft::new(
            SyncOperationType::Create,
            EntityKind::Order,
            id("1700000000000"),
            OfflinePayload::new(json!({"id": "1700000000000", "clientId": "c1", "total": 99}))
                .unwrap(),
        ))
        .await
        .unwrap();

    // offline: nothing leaves the device
    let report = ctx.state.service.sync_now().await.unwrap();
    assert_eq!(report.attempted(), 0);
    assert!(ctx.gateway.calls().is_empty());
    assert_eq!(ctx.state.service.pending_count().await.unwrap(), 1);

    ctx.state.connectivity.set_online(true);
    let report = ctx.state.service.sync_now().await.unwrap();
    assert_eq!(report.synced_count, 1);
    assert_eq!(report.pending_count, 0);

    let creates = ctx.gateway.calls_for("create");
    assert_eq!(creates.len(), 1);
    assert_eq!(creates[0].body, Some(json!({"clientId": "c1", "total": 99})));
    assert_eq!(creates[0].idempotency_key.as_deref(), Some(op.id.as_str()));

    let store = &ctx.state.store;
    assert!(
        store
            .get(EntityKind::Order, &id("1700000000000"))
            .await
            .unwrap()
            .is_none()
    );
    let record = store
        .get(EntityKind::Order, &id("abc123"))
        .await
        .unwrap()
        .expect("reconciled record");
    assert_eq!(record.data["id"], "abc123");
    assert_eq!(record.data["total"], 99);

    let completed = store.get_operation(&op.id).await.unwrap().unwrap();
    assert_eq!(completed.status, SyncQueueStatus::Completed);
    assert_eq!(completed.entity_id.as_str(), "abc123");
}

#[tokio::test]
async fn client_update_rejected_with_400_is_failed_and_not_pending() {
    let ctx = setup_engine().await;
    ctx.gateway.script(
        "update",
        EntityKind::Client,
        Reply::Rejected("HTTP 400: email is invalid"),
    );
    let mut events = ctx.state.service.subscribe();

    ctx.state
        .service
        .update_record(
            EntityKind::Client,
            &id("c1"),
            json!({"name": "Ana", "email": "nope"}),
        )
        .await
        .unwrap();

    ctx.state.connectivity.set_online(true);
    let report = ctx.state.service.sync_now().await.unwrap();
    assert_eq!(report.failed_count, 1);
    assert_eq!(report.synced_count, 0);

    let failed = ctx.state.service.failed_operations().await.unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].status, SyncQueueStatus::Failed);
    assert_eq!(failed[0].failure_kind, Some(FailureKind::Rejected));
    assert!(failed[0].error.as_deref().unwrap().contains("email is invalid"));
    assert!(ctx.state.store.list_pending().await.unwrap().is_empty());
    assert_eq!(ctx.state.service.pending_count().await.unwrap(), 0);

    let mut saw_failure = false;
    while let Ok(event) = events.try_recv() {
        if let SyncEvent::OperationFailed { kind, entity, .. } = event {
            assert_eq!(kind, FailureKind::Rejected);
            assert_eq!(entity, EntityKind::Client);
            saw_failure = true;
        }
    }
    assert!(saw_failure);

    // rejected operations are not retried automatically
    ctx.state.service.sync_now().await.unwrap();
    assert_eq!(ctx.gateway.calls_for("update").len(), 1);

    // the local edit is kept for the user to fix
    let local = ctx
        .state
        .service
        .get_record(EntityKind::Client, &id("c1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(local.data["email"], "nope");
}
