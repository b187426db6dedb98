pub mod mapping;
pub mod schema;
pub mod sqlite;

pub use sqlite::{
    DatabaseManager, DbPool, SqliteApplicationRepository, SqliteAssociationRepository,
    SqliteClusterRepository, SqliteCommandRepository, SqliteJobRepository,
};
