pub mod entities;
pub mod value_objects;

pub use entities::offline::{
    DrainReport, LocalRecord, SyncEvent, SyncOperation, SyncOperationDraft, SyncQueueStats,
    SyncStatusSnapshot,
};
