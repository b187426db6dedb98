use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fedexec_core::{PlatformError, PlatformResult, ResourceKind};
use fedexec_domain::entities::Job;
use fedexec_domain::repositories::JobRepository;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{query::Query, Row, Sqlite, SqlitePool};
use tracing::{debug, instrument, warn};

use crate::database::mapping::{map_insert_error, MappingHelpers};
use crate::database::schema::ACTIVE_JOB_STATUSES;

const JOB_COLUMNS: &str = "id, name, user_name, version, description, command_args, tags, status, \
     status_msg, started, finished, host_name, kill_uri, output_uri, archive_location, \
     process_handle, exit_code, cluster_id, cluster_name, command_id, command_name, \
     matched_criterion, disable_log_archival, forwarded, created, updated, entity_version";

/// 带版本校验的更新，版本号不一致时不影响任何行
const UPDATE_JOB_SQL: &str = r#"
    UPDATE jobs
    SET name = ?, user_name = ?, version = ?, description = ?, command_args = ?, tags = ?,
        status = ?, status_msg = ?, started = ?, finished = ?, host_name = ?, kill_uri = ?,
        output_uri = ?, archive_location = ?, process_handle = ?, exit_code = ?,
        cluster_id = ?, cluster_name = ?, command_id = ?, command_name = ?,
        matched_criterion = ?, disable_log_archival = ?, forwarded = ?,
        updated = ?, entity_version = entity_version + 1
    WHERE id = ? AND entity_version = ?
"#;

pub struct SqliteJobRepository {
    pool: SqlitePool,
}

impl SqliteJobRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_job(row: &SqliteRow) -> PlatformResult<Job> {
        let status: String = row.try_get("status")?;
        Ok(Job {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            user: row.try_get("user_name")?,
            version: row.try_get("version")?,
            description: row.try_get("description")?,
            command_args: MappingHelpers::parse_json(row, "command_args")?,
            tags: MappingHelpers::parse_json(row, "tags")?,
            status: status.parse()?,
            status_msg: row.try_get("status_msg")?,
            started: MappingHelpers::parse_optional_time(row, "started")?,
            finished: MappingHelpers::parse_optional_time(row, "finished")?,
            host_name: row.try_get("host_name")?,
            kill_uri: row.try_get("kill_uri")?,
            output_uri: row.try_get("output_uri")?,
            archive_location: row.try_get("archive_location")?,
            process_handle: row.try_get("process_handle")?,
            exit_code: row.try_get("exit_code")?,
            cluster_id: row.try_get("cluster_id")?,
            cluster_name: row.try_get("cluster_name")?,
            command_id: row.try_get("command_id")?,
            command_name: row.try_get("command_name")?,
            matched_criterion: MappingHelpers::parse_optional_json(row, "matched_criterion")?,
            disable_log_archival: row.try_get("disable_log_archival")?,
            forwarded: row.try_get("forwarded")?,
            audit: MappingHelpers::parse_audit(row)?,
        })
    }

    fn update_query<'q>(
        job: &'q Job,
        now: DateTime<Utc>,
    ) -> PlatformResult<Query<'q, Sqlite, SqliteArguments<'q>>> {
        let matched_criterion = job
            .matched_criterion
            .as_ref()
            .map(|criterion| MappingHelpers::to_json(criterion, "matched_criterion"))
            .transpose()?;

        Ok(sqlx::query(UPDATE_JOB_SQL)
            .bind(&job.name)
            .bind(&job.user)
            .bind(&job.version)
            .bind(&job.description)
            .bind(MappingHelpers::to_json(&job.command_args, "command_args")?)
            .bind(MappingHelpers::to_json(&job.tags, "tags")?)
            .bind(job.status.as_str())
            .bind(&job.status_msg)
            .bind(job.started.map(MappingHelpers::to_millis))
            .bind(job.finished.map(MappingHelpers::to_millis))
            .bind(&job.host_name)
            .bind(&job.kill_uri)
            .bind(&job.output_uri)
            .bind(&job.archive_location)
            .bind(job.process_handle)
            .bind(job.exit_code)
            .bind(&job.cluster_id)
            .bind(&job.cluster_name)
            .bind(&job.command_id)
            .bind(&job.command_name)
            .bind(matched_criterion)
            .bind(job.disable_log_archival)
            .bind(job.forwarded)
            .bind(MappingHelpers::to_millis(now))
            .bind(&job.id)
            .bind(job.audit.version))
    }
}

#[async_trait]
impl JobRepository for SqliteJobRepository {
    #[instrument(skip(self, job), fields(job_id = %job.id))]
    async fn create(&self, job: &Job) -> PlatformResult<Job> {
        let matched_criterion = job
            .matched_criterion
            .as_ref()
            .map(|criterion| MappingHelpers::to_json(criterion, "matched_criterion"))
            .transpose()?;

        sqlx::query(&format!(
            "INSERT INTO jobs ({JOB_COLUMNS}) VALUES \
             (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&job.id)
        .bind(&job.name)
        .bind(&job.user)
        .bind(&job.version)
        .bind(&job.description)
        .bind(MappingHelpers::to_json(&job.command_args, "command_args")?)
        .bind(MappingHelpers::to_json(&job.tags, "tags")?)
        .bind(job.status.as_str())
        .bind(&job.status_msg)
        .bind(job.started.map(MappingHelpers::to_millis))
        .bind(job.finished.map(MappingHelpers::to_millis))
        .bind(&job.host_name)
        .bind(&job.kill_uri)
        .bind(&job.output_uri)
        .bind(&job.archive_location)
        .bind(job.process_handle)
        .bind(job.exit_code)
        .bind(&job.cluster_id)
        .bind(&job.cluster_name)
        .bind(&job.command_id)
        .bind(&job.command_name)
        .bind(matched_criterion)
        .bind(job.disable_log_archival)
        .bind(job.forwarded)
        .bind(MappingHelpers::to_millis(job.audit.created))
        .bind(MappingHelpers::to_millis(job.audit.updated))
        .bind(job.audit.version)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, format!("作业 {}", job.id)))?;

        debug!("创建作业成功: {}", job.entity_description());
        Ok(job.clone())
    }

    async fn get_by_id(&self, id: &str) -> PlatformResult<Option<Job>> {
        let row = sqlx::query(&format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_job).transpose()
    }

    async fn exists(&self, id: &str) -> PlatformResult<bool> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<i64, _>("count")? > 0)
    }

    #[instrument(skip(self, job), fields(job_id = %job.id, version = job.audit.version))]
    async fn update(&self, job: &Job) -> PlatformResult<Job> {
        let now = MappingHelpers::now();
        let result = Self::update_query(job, now)?.execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            if !self.exists(&job.id).await? {
                return Err(PlatformError::not_found(ResourceKind::Job, &job.id));
            }
            debug!("作业 {} 版本 {} 已过期", job.id, job.audit.version);
            return Err(PlatformError::OptimisticLock { id: job.id.clone() });
        }

        let mut updated = job.clone();
        updated.audit = job.audit.on_update(now);
        debug!(
            "更新作业成功: {} -> {} (版本 {})",
            job.id, job.status, updated.audit.version
        );
        Ok(updated)
    }

    #[instrument(skip(self, jobs), fields(count = jobs.len()))]
    async fn update_batch(&self, jobs: &[Job]) -> PlatformResult<Vec<String>> {
        if jobs.is_empty() {
            return Ok(Vec::new());
        }

        let now = MappingHelpers::now();
        let mut tx = self.pool.begin().await?;
        let mut written = Vec::with_capacity(jobs.len());
        for job in jobs {
            let result = Self::update_query(job, now)?.execute(&mut *tx).await?;
            if result.rows_affected() == 0 {
                warn!("批量更新跳过作业 {}: 版本 {} 已过期", job.id, job.audit.version);
                continue;
            }
            written.push(job.id.clone());
        }
        tx.commit().await?;

        debug!("批量更新作业: 写入 {}/{}", written.len(), jobs.len());
        Ok(written)
    }

    #[instrument(skip(self))]
    async fn find_stale(&self, cutoff: DateTime<Utc>) -> PlatformResult<Vec<Job>> {
        let rows = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE status IN {ACTIVE_JOB_STATUSES} AND updated < ? ORDER BY id"
        ))
        .bind(MappingHelpers::to_millis(cutoff))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_job).collect()
    }

    async fn count_active_on_host(&self, host: &str) -> PlatformResult<usize> {
        let row = sqlx::query(&format!(
            "SELECT COUNT(*) AS count FROM jobs WHERE host_name = ? AND status IN {ACTIVE_JOB_STATUSES}"
        ))
        .bind(host)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get::<i64, _>("count")?.max(0) as usize)
    }

    async fn active_counts_by_host(&self) -> PlatformResult<Vec<(String, usize)>> {
        let rows = sqlx::query(&format!(
            "SELECT host_name, COUNT(*) AS count FROM jobs WHERE status IN {ACTIVE_JOB_STATUSES} \
             GROUP BY host_name ORDER BY host_name"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> PlatformResult<(String, usize)> {
                let host: String = row.try_get("host_name")?;
                let count: i64 = row.try_get("count")?;
                Ok((host, count.max(0) as usize))
            })
            .collect()
    }
}
