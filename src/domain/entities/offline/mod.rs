pub mod drain_report;
pub mod local_record;
pub mod queue_stats;
pub mod remote_record;
pub mod sync_event;
pub mod sync_operation;
pub mod sync_status;

pub use drain_report::DrainReport;
pub use local_record::LocalRecord;
pub use queue_stats::SyncQueueStats;
pub use remote_record::{remote_record_id, unwrap_envelope};
pub use sync_event::SyncEvent;
pub use sync_operation::{SyncOperation, SyncOperationDraft};
pub use sync_status::SyncStatusSnapshot;
