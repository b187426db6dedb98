pub mod admission;
pub mod execution;
pub mod resolver;
pub mod selection;
pub mod state_listener;
pub mod zombie_reaper;

pub use admission::{AdmissionDecision, AdmissionLimits, ExecutionStrategy};
pub use execution::{DispatcherComponents, ExecutionDispatcher};
pub use resolver::{ClusterMatch, CriteriaResolver, Resolution};
pub use selection::{ClusterSelector, FirstMatchSelector, RandomSelector};
pub use state_listener::JobStateListener;
pub use zombie_reaper::{ZombieReaper, ZombieReaperConfig};
