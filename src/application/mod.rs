pub mod ports;
pub mod services;

pub use services::{
    ConnectivityMonitor, IdentifierReconciler, OfflineSyncService, SchedulerHandle,
    SyncExecutor, SyncScheduler,
};
