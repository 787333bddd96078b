pub mod maintenance_job;
mod mappers;
pub mod metrics;
mod rows;
pub mod sqlite_store;

pub use maintenance_job::{QueueMaintenanceJob, QueueMaintenanceReport};
pub use sqlite_store::SqliteOfflineStore;
