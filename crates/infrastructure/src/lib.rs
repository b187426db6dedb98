pub mod database;
pub mod forward_transport;
pub mod node_locator;
pub mod observability;

pub use database::*;
pub use forward_transport::HttpForwardTransport;
pub use node_locator::SystemNodeLocator;
pub use observability::*;
