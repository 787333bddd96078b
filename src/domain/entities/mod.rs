pub mod offline;

pub use offline::{
    DrainReport, LocalRecord, SyncEvent, SyncOperation, SyncOperationDraft, SyncQueueStats,
    SyncStatusSnapshot,
};
