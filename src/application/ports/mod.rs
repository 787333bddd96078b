pub mod connectivity_probe;
pub mod identifier_store;
pub mod local_store;
pub mod remote_gateway;
pub mod sync_queue_store;

pub use connectivity_probe::ConnectivityProbe;
pub use identifier_store::{IdentifierStore, RemapSummary};
pub use local_store::LocalStore;
pub use remote_gateway::RemoteGateway;
pub use sync_queue_store::SyncQueueStore;
