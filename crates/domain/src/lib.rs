pub mod associations;
pub mod entities;
pub mod events;
pub mod lifecycle;
pub mod ports;
pub mod repositories;
pub mod services;
pub mod tags;

pub use associations::*;
pub use entities::*;
pub use events::*;
pub use lifecycle::*;
pub use ports::*;
pub use repositories::*;
pub use services::*;
pub use tags::*;

pub use fedexec_core::{ErrorKind, PlatformError, PlatformResult, ResourceKind};
