pub mod connectivity;
pub mod identifier_reconciler;
pub mod offline_service;
pub mod sync_executor;
pub mod sync_scheduler;

#[cfg(test)]
pub(crate) mod test_support;

pub use connectivity::ConnectivityMonitor;
pub use identifier_reconciler::IdentifierReconciler;
pub use offline_service::OfflineSyncService;
pub use sync_executor::SyncExecutor;
pub use sync_scheduler::{SchedulerHandle, SyncScheduler};
