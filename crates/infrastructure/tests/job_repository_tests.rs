use anyhow::Result;
use chrono::{Duration, Utc};
use fedexec_core::ErrorKind;
use fedexec_domain::entities::JobStatus;
use fedexec_domain::lifecycle::ZOMBIE_EXIT_CODE;
use fedexec_domain::repositories::JobRepository;
use fedexec_domain::tags::Criterion;
use fedexec_infrastructure::database::SqliteJobRepository;
use fedexec_testing_utils::JobBuilder;

use database_test_utils::TestDatabase;

#[tokio::test]
async fn test_sqlite_job_round_trip() -> Result<()> {
    let db = TestDatabase::new().await?;
    let repo = SqliteJobRepository::new(db.pool());

    let mut job = JobBuilder::new("job-1").build();
    job.matched_criterion = Some(Criterion::from_strs(["prod", "yarn"])?);
    job.cluster_id = Some("c1".to_string());
    job.command_args = vec!["-f".to_string(), "query.sql".to_string()];
    repo.create(&job).await?;

    let stored = repo.get_by_id("job-1").await?.unwrap();
    assert_eq!(stored.status, JobStatus::Running);
    assert_eq!(stored.process_handle, 4242);
    assert_eq!(stored.matched_criterion, job.matched_criterion);
    assert_eq!(stored.command_args, job.command_args);
    assert_eq!(stored.kill_uri, "http://node-a:8080/api/v1/jobs/job-1");
    assert_eq!(stored.audit.version, 0);
    assert!(repo.exists("job-1").await?);
    assert!(!repo.exists("job-2").await?);

    let err = repo.create(&job).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    Ok(())
}

#[tokio::test]
async fn test_sqlite_job_update_is_optimistic() -> Result<()> {
    let db = TestDatabase::new().await?;
    let repo = SqliteJobRepository::new(db.pool());
    repo.create(&JobBuilder::new("job-1").build()).await?;

    let first = repo.get_by_id("job-1").await?.unwrap();
    let second = first.clone();

    let mut killed = first;
    killed.set_status(JobStatus::Killed, "killed", Utc::now())?;
    let written = repo.update(&killed).await?;
    assert_eq!(written.audit.version, 1);

    // 基于旧版本的写入被拒绝
    let err = repo.update(&second).await.unwrap_err();
    assert!(err.is_optimistic_lock());

    let stored = repo.get_by_id("job-1").await?.unwrap();
    assert_eq!(stored.status, JobStatus::Killed);
    assert_eq!(stored.audit.version, 1);
    assert_eq!(stored.audit.updated, written.audit.updated);

    let ghost = JobBuilder::new("ghost").build();
    assert_eq!(repo.update(&ghost).await.unwrap_err().kind(), ErrorKind::NotFound);
    Ok(())
}

#[tokio::test]
async fn test_sqlite_job_update_batch_skips_stale_rows() -> Result<()> {
    let db = TestDatabase::new().await?;
    let repo = SqliteJobRepository::new(db.pool());
    let old = Utc::now() - Duration::hours(2);
    repo.create(&JobBuilder::new("job-1").updated_at(old).build()).await?;
    repo.create(&JobBuilder::new("job-2").updated_at(old).build()).await?;

    let mut stale = repo.find_stale(Utc::now() - Duration::minutes(30)).await?;
    assert_eq!(stale.len(), 2);

    // 清理期间 job-2 收到了心跳
    let heartbeat = repo.get_by_id("job-2").await?.unwrap();
    repo.update(&heartbeat).await?;

    let now = Utc::now();
    for job in stale.iter_mut() {
        job.apply_exit_code(ZOMBIE_EXIT_CODE, now)?;
    }
    let written = repo.update_batch(&stale).await?;
    assert_eq!(written, vec!["job-1".to_string()]);

    assert_eq!(repo.get_by_id("job-1").await?.unwrap().status, JobStatus::Failed);
    assert_eq!(repo.get_by_id("job-2").await?.unwrap().status, JobStatus::Running);
    assert!(repo.update_batch(&[]).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_sqlite_find_stale_ignores_terminal_and_recent_jobs() -> Result<()> {
    let db = TestDatabase::new().await?;
    let repo = SqliteJobRepository::new(db.pool());
    let old = Utc::now() - Duration::hours(2);

    repo.create(&JobBuilder::new("stale").updated_at(old).build()).await?;
    repo.create(&JobBuilder::new("fresh").build()).await?;
    repo.create(
        &JobBuilder::new("done")
            .with_status(JobStatus::Succeeded)
            .updated_at(old)
            .build(),
    )
    .await?;
    repo.create(
        &JobBuilder::new("starting")
            .with_status(JobStatus::Init)
            .updated_at(old)
            .build(),
    )
    .await?;

    let stale = repo.find_stale(Utc::now() - Duration::minutes(30)).await?;
    let ids: Vec<&str> = stale.iter().map(|j| j.id.as_str()).collect();
    assert_eq!(ids, vec!["stale", "starting"]);
    Ok(())
}

#[tokio::test]
async fn test_sqlite_active_job_counts() -> Result<()> {
    let db = TestDatabase::new().await?;
    let repo = SqliteJobRepository::new(db.pool());

    repo.create(&JobBuilder::new("a1").build()).await?;
    repo.create(&JobBuilder::new("a2").with_status(JobStatus::Init).build())
        .await?;
    repo.create(&JobBuilder::new("a3").with_status(JobStatus::Failed).build())
        .await?;
    repo.create(&JobBuilder::new("b1").on_host("node-b").build()).await?;

    assert_eq!(repo.count_active_on_host("node-a").await?, 2);
    assert_eq!(repo.count_active_on_host("node-c").await?, 0);
    assert_eq!(
        repo.active_counts_by_host().await?,
        vec![("node-a".to_string(), 2), ("node-b".to_string(), 1)]
    );
    Ok(())
}
