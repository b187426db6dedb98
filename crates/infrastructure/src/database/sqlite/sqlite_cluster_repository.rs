use async_trait::async_trait;
use fedexec_core::{PlatformError, PlatformResult, ResourceKind};
use fedexec_domain::entities::{Cluster, ClusterStatus};
use fedexec_domain::repositories::{ClusterRepository, ResourceRepository};
use fedexec_domain::tags::TagSet;
use sqlx::{Row, SqlitePool};
use tracing::{debug, instrument};

use crate::database::mapping::{map_insert_error, MappingHelpers, TAG_SUPERSET_CLAUSE};

const CLUSTER_COLUMNS: &str = "id, name, user_name, version, description, status, tags, \
     config_files, dependency_files, created, updated, entity_version";

pub struct SqliteClusterRepository {
    pool: SqlitePool,
}

impl SqliteClusterRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_cluster(row: &sqlx::sqlite::SqliteRow) -> PlatformResult<Cluster> {
        let status: String = row.try_get("status")?;
        Ok(Cluster {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            user: row.try_get("user_name")?,
            version: row.try_get("version")?,
            description: row.try_get("description")?,
            status: status.parse()?,
            tags: MappingHelpers::parse_json(row, "tags")?,
            config_files: MappingHelpers::parse_json(row, "config_files")?,
            dependency_files: MappingHelpers::parse_json(row, "dependency_files")?,
            audit: MappingHelpers::parse_audit(row)?,
        })
    }
}

#[async_trait]
impl ResourceRepository<Cluster> for SqliteClusterRepository {
    async fn create(&self, cluster: &Cluster) -> PlatformResult<Cluster> {
        sqlx::query(&format!(
            "INSERT INTO clusters ({CLUSTER_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&cluster.id)
        .bind(&cluster.name)
        .bind(&cluster.user)
        .bind(&cluster.version)
        .bind(&cluster.description)
        .bind(cluster.status.as_str())
        .bind(MappingHelpers::to_json(&cluster.tags, "tags")?)
        .bind(MappingHelpers::to_json(&cluster.config_files, "config_files")?)
        .bind(MappingHelpers::to_json(&cluster.dependency_files, "dependency_files")?)
        .bind(MappingHelpers::to_millis(cluster.audit.created))
        .bind(MappingHelpers::to_millis(cluster.audit.updated))
        .bind(cluster.audit.version)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, format!("集群 {}", cluster.id)))?;

        debug!("创建集群成功: {} ({})", cluster.name, cluster.id);
        Ok(cluster.clone())
    }

    async fn get_by_id(&self, id: &str) -> PlatformResult<Option<Cluster>> {
        let row = sqlx::query(&format!("SELECT {CLUSTER_COLUMNS} FROM clusters WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_cluster).transpose()
    }

    async fn update(&self, cluster: &Cluster) -> PlatformResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE clusters
            SET name = ?, user_name = ?, version = ?, description = ?, status = ?, tags = ?,
                config_files = ?, dependency_files = ?, updated = ?, entity_version = ?
            WHERE id = ?
            "#,
        )
        .bind(&cluster.name)
        .bind(&cluster.user)
        .bind(&cluster.version)
        .bind(&cluster.description)
        .bind(cluster.status.as_str())
        .bind(MappingHelpers::to_json(&cluster.tags, "tags")?)
        .bind(MappingHelpers::to_json(&cluster.config_files, "config_files")?)
        .bind(MappingHelpers::to_json(&cluster.dependency_files, "dependency_files")?)
        .bind(MappingHelpers::to_millis(cluster.audit.updated))
        .bind(cluster.audit.version)
        .bind(&cluster.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PlatformError::not_found(ResourceKind::Cluster, &cluster.id));
        }

        debug!("更新集群成功: {}", cluster.id);
        Ok(())
    }

    async fn delete(&self, id: &str) -> PlatformResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM cluster_commands WHERE cluster_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM clusters WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(PlatformError::not_found(ResourceKind::Cluster, id));
        }
        tx.commit().await?;

        debug!("删除集群成功: {}", id);
        Ok(())
    }
}

#[async_trait]
impl ClusterRepository for SqliteClusterRepository {
    #[instrument(skip(self, tags), fields(tag_count = tags.len()))]
    async fn find_matching(
        &self,
        tags: &TagSet,
        status: ClusterStatus,
    ) -> PlatformResult<Vec<Cluster>> {
        let rows = sqlx::query(&format!(
            "SELECT {CLUSTER_COLUMNS} FROM clusters WHERE status = ? AND {TAG_SUPERSET_CLAUSE} ORDER BY id"
        ))
        .bind(status.as_str())
        .bind(MappingHelpers::to_json(tags, "tags")?)
        .bind(tags.len() as i64)
        .fetch_all(&self.pool)
        .await?;

        let clusters = rows
            .iter()
            .map(Self::row_to_cluster)
            .collect::<PlatformResult<Vec<_>>>()?;
        debug!("标签 {:?} 匹配到 {} 个集群", tags, clusters.len());
        Ok(clusters)
    }
}
