pub mod offline;

pub use offline::{
    EntityId, EntityKind, EntityReference, FailureKind, OfflinePayload, SyncOperationId,
    SyncOperationType, SyncQueueStatus,
};
