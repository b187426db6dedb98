mod common;

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::common::*;
    use fedexec_dispatcher::state_listener::JobStateListener;
    use fedexec_domain::entities::JobStatus;
    use fedexec_domain::events::JobExit;
    use fedexec_dispatcher::ExecutionDispatcher;
    use fedexec_domain::lifecycle::{JOB_KILLED_EXIT_CODE, JOB_SUCCEEDED_MESSAGE};
    use fedexec_domain::ports::JobCounter;
    use fedexec_testing_utils::{
        JobRequestBuilder, MockJobRepository, RecordingMetricsSink, TestEnv,
    };
    use tokio::sync::mpsc;

    async fn submit(h: &Harness, id: &str) {
        let request = JobRequestBuilder::new()
            .with_id(id)
            .with_cluster_criteria(&[&["prod", "hadoop"]])
            .build();
        h.dispatcher.submit_job(request).await.unwrap();
    }

    /// 监听器需要共享调度器，仓储与指标留给测试断言
    fn share(h: Harness) -> (Arc<ExecutionDispatcher>, MockJobRepository, RecordingMetricsSink) {
        let Harness {
            jobs,
            metrics,
            dispatcher,
            ..
        } = h;
        (Arc::new(dispatcher), jobs, metrics)
    }

    #[tokio::test]
    async fn test_handle_exit_finalizes_job() {
        let h = harness();
        submit(&h, "job-1").await;
        let (dispatcher, jobs, metrics) = share(h);

        let listener = JobStateListener::new(dispatcher, Duration::from_secs(60));
        listener
            .handle_exit(JobExit {
                job_id: "job-1".to_string(),
                exit_code: 0,
            })
            .await;

        let job = jobs.get("job-1").unwrap();
        assert_eq!(job.status, JobStatus::Succeeded);
        assert_eq!(job.status_msg, JOB_SUCCEEDED_MESSAGE);
        assert_eq!(metrics.count(JobCounter::Succeeded), 1);
    }

    #[tokio::test]
    async fn test_exit_for_unknown_job_is_logged_and_ignored() {
        let (dispatcher, jobs, _metrics) = share(harness());
        let listener = JobStateListener::new(dispatcher, Duration::from_secs(60));
        listener
            .handle_exit(JobExit {
                job_id: "ghost".to_string(),
                exit_code: 1,
            })
            .await;
        assert_eq!(jobs.count(), 0);
    }

    #[tokio::test]
    async fn test_listener_loop_consumes_exit_events() {
        let h = harness();
        submit(&h, "job-1").await;
        submit(&h, "job-2").await;
        let (dispatcher, jobs, _metrics) = share(h);

        let listener = Arc::new(JobStateListener::new(dispatcher, Duration::from_millis(50)));
        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = {
            let listener = Arc::clone(&listener);
            tokio::spawn(async move { listener.start(receiver).await })
        };

        sender
            .send(JobExit {
                job_id: "job-1".to_string(),
                exit_code: 1,
            })
            .unwrap();
        sender
            .send(JobExit {
                job_id: "job-2".to_string(),
                exit_code: JOB_KILLED_EXIT_CODE,
            })
            .unwrap();

        let watched = jobs.clone();
        assert!(
            TestEnv::wait_for(
                move || {
                    let jobs = watched.clone();
                    async move {
                        jobs.get("job-1").map(|j| j.status) == Some(JobStatus::Failed)
                            && jobs.get("job-2").map(|j| j.status) == Some(JobStatus::Killed)
                    }
                },
                Duration::from_secs(2),
            )
            .await
        );
        assert!(listener.is_running().await);

        drop(sender);
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(!listener.is_running().await);
    }

    #[tokio::test]
    async fn test_listener_heartbeats_running_jobs() {
        let h = harness();
        submit(&h, "job-1").await;
        let version_after_launch = h.jobs.get("job-1").unwrap().audit.version;
        let (dispatcher, jobs, _metrics) = share(h);

        let listener = Arc::new(JobStateListener::new(dispatcher, Duration::from_millis(20)));
        let (_sender, receiver) = mpsc::unbounded_channel();
        let handle = {
            let listener = Arc::clone(&listener);
            tokio::spawn(async move { listener.start(receiver).await })
        };

        let watched = jobs.clone();
        assert!(
            TestEnv::wait_for(
                move || {
                    let jobs = watched.clone();
                    async move {
                        jobs.get("job-1").unwrap().audit.version > version_after_launch
                    }
                },
                Duration::from_secs(2),
            )
            .await
        );
        assert_eq!(jobs.get("job-1").unwrap().status, JobStatus::Running);

        listener.stop().await;
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_heartbeat_skips_killed_jobs() {
        let h = harness();
        submit(&h, "job-1").await;
        submit(&h, "job-2").await;
        h.dispatcher.kill_job("job-2").await.unwrap();

        assert_eq!(h.dispatcher.heartbeat_running_jobs().await, 1);
        assert_eq!(h.jobs.get("job-2").unwrap().status, JobStatus::Killed);
    }
}
