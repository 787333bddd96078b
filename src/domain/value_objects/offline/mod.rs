pub mod entity_id;
pub mod entity_kind;
pub mod operation_id;
pub mod operation_type;
pub mod payload;
pub mod sync_queue_status;

pub use entity_id::EntityId;
pub use entity_kind::{EntityKind, EntityReference};
pub use operation_id::SyncOperationId;
pub use operation_type::SyncOperationType;
pub use payload::OfflinePayload;
pub use sync_queue_status::{FailureKind, SyncQueueStatus};
