use async_trait::async_trait;
use fedexec_core::{PlatformError, PlatformResult, ResourceKind};
use fedexec_domain::entities::Application;
use fedexec_domain::repositories::{ApplicationRepository, ResourceRepository};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::database::mapping::{map_insert_error, MappingHelpers};

const APPLICATION_COLUMNS: &str = "id, name, user_name, version, status, tags, config_files, \
     dependency_files, created, updated, entity_version";

pub struct SqliteApplicationRepository {
    pool: SqlitePool,
}

impl SqliteApplicationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_application(row: &sqlx::sqlite::SqliteRow) -> PlatformResult<Application> {
        let status: String = row.try_get("status")?;
        Ok(Application {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            user: row.try_get("user_name")?,
            version: row.try_get("version")?,
            status: status.parse()?,
            tags: MappingHelpers::parse_json(row, "tags")?,
            config_files: MappingHelpers::parse_json(row, "config_files")?,
            dependency_files: MappingHelpers::parse_json(row, "dependency_files")?,
            audit: MappingHelpers::parse_audit(row)?,
        })
    }
}

#[async_trait]
impl ResourceRepository<Application> for SqliteApplicationRepository {
    async fn create(&self, application: &Application) -> PlatformResult<Application> {
        sqlx::query(&format!(
            "INSERT INTO applications ({APPLICATION_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&application.id)
        .bind(&application.name)
        .bind(&application.user)
        .bind(&application.version)
        .bind(application.status.as_str())
        .bind(MappingHelpers::to_json(&application.tags, "tags")?)
        .bind(MappingHelpers::to_json(&application.config_files, "config_files")?)
        .bind(MappingHelpers::to_json(&application.dependency_files, "dependency_files")?)
        .bind(MappingHelpers::to_millis(application.audit.created))
        .bind(MappingHelpers::to_millis(application.audit.updated))
        .bind(application.audit.version)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, format!("应用 {}", application.id)))?;

        debug!("创建应用成功: {} ({})", application.name, application.id);
        Ok(application.clone())
    }

    async fn get_by_id(&self, id: &str) -> PlatformResult<Option<Application>> {
        let row = sqlx::query(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_application).transpose()
    }

    async fn update(&self, application: &Application) -> PlatformResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE applications
            SET name = ?, user_name = ?, version = ?, status = ?, tags = ?,
                config_files = ?, dependency_files = ?, updated = ?, entity_version = ?
            WHERE id = ?
            "#,
        )
        .bind(&application.name)
        .bind(&application.user)
        .bind(&application.version)
        .bind(application.status.as_str())
        .bind(MappingHelpers::to_json(&application.tags, "tags")?)
        .bind(MappingHelpers::to_json(&application.config_files, "config_files")?)
        .bind(MappingHelpers::to_json(&application.dependency_files, "dependency_files")?)
        .bind(MappingHelpers::to_millis(application.audit.updated))
        .bind(application.audit.version)
        .bind(&application.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PlatformError::not_found(
                ResourceKind::Application,
                &application.id,
            ));
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> PlatformResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM command_applications WHERE application_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM applications WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(PlatformError::not_found(ResourceKind::Application, id));
        }
        tx.commit().await?;

        debug!("删除应用成功: {}", id);
        Ok(())
    }
}

impl ApplicationRepository for SqliteApplicationRepository {}
