#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration as StdDuration;

    use chrono::{Duration, Utc};
    use fedexec_dispatcher::zombie_reaper::{ZombieReaper, ZombieReaperConfig};
    use fedexec_domain::entities::JobStatus;
    use fedexec_domain::lifecycle::{ZOMBIE_EXIT_CODE, ZOMBIE_MESSAGE};
    use fedexec_domain::ports::JobCounter;
    use fedexec_testing_utils::{JobBuilder, MockJobRepository, RecordingMetricsSink, TestEnv};

    fn reaper(jobs: &MockJobRepository, metrics: &RecordingMetricsSink) -> ZombieReaper {
        ZombieReaper::new(Arc::new(jobs.clone()), Arc::new(metrics.clone()), None)
    }

    #[test]
    fn test_config_default() {
        let config = ZombieReaperConfig::default();
        assert_eq!(config.zombie_timeout_seconds, 1800);
        assert_eq!(config.sweep_interval_seconds, 300);
    }

    #[tokio::test]
    async fn test_reaps_only_stale_jobs() {
        let now = Utc::now();
        let jobs = MockJobRepository::new();
        jobs.insert(JobBuilder::new("stale").updated_at(now - Duration::minutes(45)).build());
        jobs.insert(JobBuilder::new("fresh").updated_at(now - Duration::minutes(10)).build());
        let metrics = RecordingMetricsSink::new();

        let count = reaper(&jobs, &metrics)
            .reap_zombies(now, Duration::minutes(30))
            .await
            .unwrap();
        assert_eq!(count, 1);

        let stale = jobs.get("stale").unwrap();
        assert_eq!(stale.status, JobStatus::Failed);
        assert_eq!(stale.finished, Some(now));
        assert_eq!(stale.exit_code, Some(ZOMBIE_EXIT_CODE));
        assert_eq!(stale.status_msg, ZOMBIE_MESSAGE);

        let fresh = jobs.get("fresh").unwrap();
        assert_eq!(fresh.status, JobStatus::Running);
        assert!(fresh.finished.is_none());
        assert_eq!(metrics.count(JobCounter::Zombie), 1);
    }

    #[tokio::test]
    async fn test_threshold_boundaries() {
        let now = Utc::now();
        let timeout = Duration::minutes(30);
        let jobs = MockJobRepository::new();
        jobs.insert(JobBuilder::new("twice").updated_at(now - timeout * 2).build());
        jobs.insert(JobBuilder::new("half").updated_at(now - timeout / 2).build());
        let metrics = RecordingMetricsSink::new();

        let count = reaper(&jobs, &metrics).reap_zombies(now, timeout).await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(jobs.get("twice").unwrap().status, JobStatus::Failed);
        assert_eq!(jobs.get("half").unwrap().status, JobStatus::Running);
    }

    #[tokio::test]
    async fn test_terminal_and_init_jobs() {
        let now = Utc::now();
        let old = now - Duration::hours(5);
        let jobs = MockJobRepository::new();
        let done = JobBuilder::new("done")
            .with_status(JobStatus::Succeeded)
            .updated_at(old)
            .build();
        jobs.insert(done.clone());
        jobs.insert(
            JobBuilder::new("stuck-init")
                .with_status(JobStatus::Init)
                .updated_at(old)
                .build(),
        );
        let metrics = RecordingMetricsSink::new();

        let count = reaper(&jobs, &metrics)
            .reap_zombies(now, Duration::minutes(30))
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(jobs.get("done").unwrap(), done);
        assert_eq!(jobs.get("stuck-init").unwrap().status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_nothing_to_reap() {
        let jobs = MockJobRepository::new();
        let metrics = RecordingMetricsSink::new();
        let count = reaper(&jobs, &metrics)
            .reap_zombies(Utc::now(), Duration::minutes(30))
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_sweep_loop_start_stop() {
        let jobs = MockJobRepository::new();
        jobs.insert(
            JobBuilder::new("stale")
                .updated_at(Utc::now() - Duration::hours(2))
                .build(),
        );
        let metrics = RecordingMetricsSink::new();
        let reaper = Arc::new(ZombieReaper::new(
            Arc::new(jobs.clone()),
            Arc::new(metrics.clone()),
            Some(ZombieReaperConfig {
                zombie_timeout_seconds: 60,
                sweep_interval_seconds: 1,
            }),
        ));

        let looping = reaper.clone();
        let handle = tokio::spawn(async move { looping.start().await });

        let reaped = TestEnv::wait_for(
            || {
                let jobs = jobs.clone();
                async move { jobs.get("stale").map(|j| j.is_terminal()).unwrap_or(false) }
            },
            StdDuration::from_secs(3),
        )
        .await;
        assert!(reaped);
        assert!(reaper.is_running().await);

        reaper.stop().await;
        let result = tokio::time::timeout(StdDuration::from_secs(3), handle).await;
        assert!(result.is_ok());
    }
}
