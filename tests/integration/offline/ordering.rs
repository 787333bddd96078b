use crate::common::offline_support::{id, setup_engine};
use retail_sync::application::ports::SyncQueueStore;
use retail_sync::domain::value_objects::offline::{EntityKind, SyncOperationType};
use serde_json::json;

#[tokio::test]
async fn offline_enqueues_are_listed_in_insertion_order() {
    let ctx = setup_engine().await;
    let service = &ctx.state.service;

    let product = service
        .create_record(EntityKind::Product, json!({"name": "Yerba", "price": 10}))
        .await
        .unwrap();
    service
        .update_record(EntityKind::Client, &id("c9"), json!({"name": "Luz"}))
        .await
        .unwrap();
    service
        .update_record(
            EntityKind::Product,
            &product.id,
            json!({"name": "Yerba", "price": 12}),
        )
        .await
        .unwrap();
    service
        .delete_record(EntityKind::Store, &id("s3"))
        .await
        .unwrap();

    let pending = ctx.state.store.list_pending().await.unwrap();
    let summary: Vec<(SyncOperationType, EntityKind)> = pending
        .iter()
        .map(|op| (op.operation_type, op.entity))
        .collect();
    assert_eq!(
        summary,
        vec![
            (SyncOperationType::Create, EntityKind::Product),
            (SyncOperationType::Update, EntityKind::Client),
            (SyncOperationType::Update, EntityKind::Product),
            (SyncOperationType::Delete, EntityKind::Store),
        ]
    );
    assert!(pending.windows(2).all(|pair| pair[0].seq < pair[1].seq));
    assert!(pending.iter().all(|op| op.retry_count == 0));
}

#[tokio::test]
async fn completed_operations_never_run_again() {
    let ctx = setup_engine().await;
    ctx.state
        .service
        .update_record(EntityKind::Category, &id("cat-1"), json!({"name": "Bebidas"}))
        .await
        .unwrap();
    ctx.state
        .service
        .delete_record(EntityKind::Provider, &id("prov-2"))
        .await
        .unwrap();

    ctx.state.connectivity.set_online(true);
    let first = ctx.state.service.sync_now().await.unwrap();
    assert_eq!(first.synced_count, 2);

    let second = ctx.state.service.sync_now().await.unwrap();
    assert_eq!(second.attempted(), 0);
    assert_eq!(ctx.gateway.calls().len(), 2);
    assert_eq!(ctx.state.service.sync_status().await.unwrap().stats.completed, 2);
}

#[tokio::test]
async fn dependents_wait_for_parent_create_and_use_remote_ids() {
    let ctx = setup_engine().await;
    let service = &ctx.state.service;

    let client = service
        .create_record(EntityKind::Client, json!({"name": "Ana"}))
        .await
        .unwrap();
    let order = service
        .create_record(
            EntityKind::Order,
            json!({"clientId": client.id.as_str(), "total": 40}),
        )
        .await
        .unwrap();
    service
        .update_record(
            EntityKind::Client,
            &client.id,
            json!({"name": "Ana Maria"}),
        )
        .await
        .unwrap();

    ctx.state.connectivity.set_online(true);
    let report = service.sync_now().await.unwrap();
    assert_eq!(report.synced_count, 3);

    let calls = ctx.gateway.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!((calls[0].method, calls[0].entity), ("create", EntityKind::Client));
    assert_eq!((calls[1].method, calls[1].entity), ("create", EntityKind::Order));
    assert_eq!(calls[1].body.as_ref().unwrap()["clientId"], "srv-1");
    assert_eq!((calls[2].method, calls[2].entity), ("update", EntityKind::Client));
    assert_eq!(calls[2].id.as_deref(), Some("srv-1"));
    assert_eq!(calls[2].body.as_ref().unwrap()["id"], "srv-1");

    // local records now carry remote ids, including the foreign reference
    assert!(service.get_record(EntityKind::Client, &client.id).await.unwrap().is_none());
    assert!(service.get_record(EntityKind::Order, &order.id).await.unwrap().is_none());
    let orders = service.list_records(EntityKind::Order).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].id.as_str(), "srv-2");
    assert_eq!(orders[0].data["clientId"], "srv-1");
}

#[tokio::test]
async fn delete_of_unsynced_record_never_reaches_remote() {
    let ctx = setup_engine().await;
    let service = &ctx.state.service;

    let product = service
        .create_record(EntityKind::Product, json!({"name": "Temporal"}))
        .await
        .unwrap();
    service
        .update_record(EntityKind::Product, &product.id, json!({"name": "Temporal 2"}))
        .await
        .unwrap();
    service
        .delete_record(EntityKind::Product, &product.id)
        .await
        .unwrap();

    ctx.state.connectivity.set_online(true);
    let report = service.sync_now().await.unwrap();
    assert_eq!(report.attempted(), 0);
    assert!(ctx.gateway.calls().is_empty());
    assert_eq!(service.pending_count().await.unwrap(), 0);
}
