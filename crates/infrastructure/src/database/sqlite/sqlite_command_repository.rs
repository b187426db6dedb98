use async_trait::async_trait;
use fedexec_core::{PlatformError, PlatformResult, ResourceKind};
use fedexec_domain::entities::{Command, CommandStatus};
use fedexec_domain::repositories::{CommandRepository, ResourceRepository};
use fedexec_domain::tags::TagSet;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::database::mapping::{map_insert_error, MappingHelpers, TAG_SUPERSET_CLAUSE};

const COMMAND_COLUMNS: &str = "id, name, user_name, version, description, status, executable, \
     check_delay_ms, tags, config_files, dependency_files, created, updated, entity_version";

pub struct SqliteCommandRepository {
    pool: SqlitePool,
}

impl SqliteCommandRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_command(row: &sqlx::sqlite::SqliteRow) -> PlatformResult<Command> {
        let status: String = row.try_get("status")?;
        let check_delay_ms: i64 = row.try_get("check_delay_ms")?;
        Ok(Command {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            user: row.try_get("user_name")?,
            version: row.try_get("version")?,
            description: row.try_get("description")?,
            status: status.parse()?,
            executable: row.try_get("executable")?,
            check_delay_ms: check_delay_ms.max(0) as u64,
            tags: MappingHelpers::parse_json(row, "tags")?,
            config_files: MappingHelpers::parse_json(row, "config_files")?,
            dependency_files: MappingHelpers::parse_json(row, "dependency_files")?,
            audit: MappingHelpers::parse_audit(row)?,
        })
    }
}

#[async_trait]
impl ResourceRepository<Command> for SqliteCommandRepository {
    async fn create(&self, command: &Command) -> PlatformResult<Command> {
        sqlx::query(&format!(
            "INSERT INTO commands ({COMMAND_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&command.id)
        .bind(&command.name)
        .bind(&command.user)
        .bind(&command.version)
        .bind(&command.description)
        .bind(command.status.as_str())
        .bind(&command.executable)
        .bind(command.check_delay_ms as i64)
        .bind(MappingHelpers::to_json(&command.tags, "tags")?)
        .bind(MappingHelpers::to_json(&command.config_files, "config_files")?)
        .bind(MappingHelpers::to_json(&command.dependency_files, "dependency_files")?)
        .bind(MappingHelpers::to_millis(command.audit.created))
        .bind(MappingHelpers::to_millis(command.audit.updated))
        .bind(command.audit.version)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, format!("命令 {}", command.id)))?;

        debug!("创建命令成功: {} ({})", command.name, command.id);
        Ok(command.clone())
    }

    async fn get_by_id(&self, id: &str) -> PlatformResult<Option<Command>> {
        let row = sqlx::query(&format!("SELECT {COMMAND_COLUMNS} FROM commands WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_command).transpose()
    }

    async fn update(&self, command: &Command) -> PlatformResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE commands
            SET name = ?, user_name = ?, version = ?, description = ?, status = ?, executable = ?,
                check_delay_ms = ?, tags = ?, config_files = ?, dependency_files = ?,
                updated = ?, entity_version = ?
            WHERE id = ?
            "#,
        )
        .bind(&command.name)
        .bind(&command.user)
        .bind(&command.version)
        .bind(&command.description)
        .bind(command.status.as_str())
        .bind(&command.executable)
        .bind(command.check_delay_ms as i64)
        .bind(MappingHelpers::to_json(&command.tags, "tags")?)
        .bind(MappingHelpers::to_json(&command.config_files, "config_files")?)
        .bind(MappingHelpers::to_json(&command.dependency_files, "dependency_files")?)
        .bind(MappingHelpers::to_millis(command.audit.updated))
        .bind(command.audit.version)
        .bind(&command.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PlatformError::not_found(ResourceKind::Command, &command.id));
        }

        debug!("更新命令成功: {}", command.id);
        Ok(())
    }

    async fn delete(&self, id: &str) -> PlatformResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM cluster_commands WHERE command_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM command_applications WHERE command_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM commands WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(PlatformError::not_found(ResourceKind::Command, id));
        }
        tx.commit().await?;

        debug!("删除命令成功: {}", id);
        Ok(())
    }
}

#[async_trait]
impl CommandRepository for SqliteCommandRepository {
    async fn find_matching(
        &self,
        tags: &TagSet,
        status: CommandStatus,
        cluster_id: &str,
    ) -> PlatformResult<Vec<Command>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {COMMAND_COLUMNS} FROM commands
            WHERE id IN (SELECT command_id FROM cluster_commands WHERE cluster_id = ?)
              AND status = ?
              AND {TAG_SUPERSET_CLAUSE}
            ORDER BY id
            "#
        ))
        .bind(cluster_id)
        .bind(status.as_str())
        .bind(MappingHelpers::to_json(tags, "tags")?)
        .bind(tags.len() as i64)
        .fetch_all(&self.pool)
        .await?;

        let commands = rows
            .iter()
            .map(Self::row_to_command)
            .collect::<PlatformResult<Vec<_>>>()?;
        debug!(
            "集群 {} 上标签 {:?} 匹配到 {} 个命令",
            cluster_id,
            tags,
            commands.len()
        );
        Ok(commands)
    }
}
