pub mod app_config;
pub mod database;
pub mod dispatcher;
pub mod janitor;
pub mod node;
pub mod observability;

pub use app_config::AppConfig;
pub use database::DatabaseConfig;
pub use dispatcher::{ClusterSelection, DispatcherConfig, ExecutionMode};
pub use janitor::JanitorConfig;
pub use node::NodeConfig;
pub use observability::ObservabilityConfig;
