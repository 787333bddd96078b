pub mod health_probe;
pub mod http_gateway;

pub use health_probe::HttpHealthProbe;
pub use http_gateway::HttpRemoteGateway;
