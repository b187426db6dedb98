pub mod sqlite_application_repository;
pub mod sqlite_association_repository;
pub mod sqlite_cluster_repository;
pub mod sqlite_command_repository;
pub mod sqlite_job_repository;

pub use sqlite_application_repository::SqliteApplicationRepository;
pub use sqlite_association_repository::SqliteAssociationRepository;
pub use sqlite_cluster_repository::SqliteClusterRepository;
pub use sqlite_command_repository::SqliteCommandRepository;
pub use sqlite_job_repository::SqliteJobRepository;

use std::time::Duration;

use fedexec_core::config::DatabaseConfig;
use fedexec_core::PlatformResult;
use sqlx::{Pool, Sqlite, SqlitePool};
use tracing::{debug, info};

use crate::database::schema::SCHEMA_STATEMENTS;

pub struct DatabaseManager {
    pool: SqlitePool,
}

impl DatabaseManager {
    pub async fn new(config: &DatabaseConfig) -> PlatformResult<Self> {
        let mut options = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds));

        // 内存库每个连接各自独立，只能保持单个常驻连接
        if config.url.contains(":memory:") {
            debug!("使用内存数据库，连接池固定为单连接");
            options = options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        } else {
            options = options.max_lifetime(Duration::from_secs(1800)); // 30分钟默认生命周期
        }

        let pool = options.connect(&config.url).await?;
        info!("数据库连接池已建立: {}", config.url);
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// 创建缺失的表与索引
    pub async fn migrate(&self) -> PlatformResult<()> {
        for statement in SCHEMA_STATEMENTS {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        debug!("数据库结构已就绪，共 {} 条语句", SCHEMA_STATEMENTS.len());
        Ok(())
    }

    pub async fn health_check(&self) -> PlatformResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

pub type DbPool = Pool<Sqlite>;
