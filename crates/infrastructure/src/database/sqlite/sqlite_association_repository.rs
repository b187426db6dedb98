use async_trait::async_trait;
use fedexec_core::PlatformResult;
use fedexec_domain::associations::{Association, AssociationKind, Side};
use fedexec_domain::repositories::AssociationRepository;
use sqlx::{Row, SqlitePool};
use tracing::debug;

/// 关联表的 (左列, 右列)
fn columns(kind: AssociationKind) -> (&'static str, &'static str) {
    match kind {
        AssociationKind::ClusterCommand => ("cluster_id", "command_id"),
        AssociationKind::CommandApplication => ("command_id", "application_id"),
    }
}

pub struct SqliteAssociationRepository {
    pool: SqlitePool,
}

impl SqliteAssociationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AssociationRepository for SqliteAssociationRepository {
    async fn set_association(
        &self,
        association: &Association,
        present: bool,
    ) -> PlatformResult<bool> {
        let table = association.kind.table_name();
        let (left, right) = columns(association.kind);
        let sql = if present {
            format!("INSERT OR IGNORE INTO {table} ({left}, {right}) VALUES (?, ?)")
        } else {
            format!("DELETE FROM {table} WHERE {left} = ? AND {right} = ?")
        };

        let result = sqlx::query(&sql)
            .bind(&association.left)
            .bind(&association.right)
            .execute(&self.pool)
            .await?;

        let changed = result.rows_affected() > 0;
        debug!(
            "{} {} -> {} ({}): 变更 {}",
            table,
            association.left,
            association.right,
            if present { "关联" } else { "解除" },
            changed
        );
        Ok(changed)
    }

    async fn linked_ids(
        &self,
        kind: AssociationKind,
        known: Side,
        id: &str,
    ) -> PlatformResult<Vec<String>> {
        let table = kind.table_name();
        let (left, right) = columns(kind);
        let (known_column, other_column) = match known {
            Side::Left => (left, right),
            Side::Right => (right, left),
        };

        let rows = sqlx::query(&format!(
            "SELECT {other_column} AS linked FROM {table} WHERE {known_column} = ? ORDER BY {other_column}"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let linked = rows
            .iter()
            .map(|row| row.try_get::<String, _>("linked"))
            .collect::<Result<Vec<_>, sqlx::Error>>()?;
        Ok(linked)
    }
}
