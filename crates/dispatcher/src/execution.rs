//! 作业执行调度
//!
//! 负责准入、启动记账与 kill 协调。每个操作都是一次独立的读-改-写，
//! 节点之间通过作业表的乐观锁版本号同步。

use std::sync::Arc;

use chrono::Utc;
use fedexec_core::config::DispatcherConfig;
use fedexec_core::{PlatformError, PlatformResult, ResourceKind};
use fedexec_domain::entities::{Job, JobRequest, JobStatus};
use fedexec_domain::lifecycle::{finalize, JOB_KILLED_EXIT_CODE, JOB_KILLED_MESSAGE, JOB_RUNNING_MESSAGE};
use fedexec_domain::ports::{
    ForwardTransport, JobCounter, LaunchContext, MetricsSink, NodeLocator, ProcessManager,
};
use fedexec_domain::repositories::{ClusterRepository, CommandRepository, JobRepository};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::admission::{AdmissionDecision, ExecutionStrategy};
use crate::resolver::CriteriaResolver;
use crate::selection::{selector_for, ClusterSelector};

pub const NO_MATCH_MESSAGE: &str = "No cluster/command matched the job criteria";

/// 调度器依赖的仓储与协作方
#[derive(Clone)]
pub struct DispatcherComponents {
    pub clusters: Arc<dyn ClusterRepository>,
    pub commands: Arc<dyn CommandRepository>,
    pub jobs: Arc<dyn JobRepository>,
    pub process_manager: Arc<dyn ProcessManager>,
    pub transport: Arc<dyn ForwardTransport>,
    pub locator: Arc<dyn NodeLocator>,
    pub metrics: Arc<dyn MetricsSink>,
}

pub struct ExecutionDispatcher {
    jobs: Arc<dyn JobRepository>,
    resolver: CriteriaResolver,
    selector: Box<dyn ClusterSelector>,
    strategy: ExecutionStrategy,
    process_manager: Arc<dyn ProcessManager>,
    transport: Arc<dyn ForwardTransport>,
    locator: Arc<dyn NodeLocator>,
    metrics: Arc<dyn MetricsSink>,
    heartbeat_max_attempts: u32,
}

impl ExecutionDispatcher {
    pub fn new(components: DispatcherComponents, config: &DispatcherConfig) -> Self {
        Self::with_parts(
            components,
            ExecutionStrategy::from_config(config),
            selector_for(config.cluster_selection),
            config.heartbeat_max_attempts,
        )
    }

    pub fn with_parts(
        components: DispatcherComponents,
        strategy: ExecutionStrategy,
        selector: Box<dyn ClusterSelector>,
        heartbeat_max_attempts: u32,
    ) -> Self {
        info!(
            "创建执行调度器: 策略 {}, 集群选择 {}",
            strategy.name(),
            selector.name()
        );
        Self {
            jobs: components.jobs,
            resolver: CriteriaResolver::new(components.clusters, components.commands),
            selector,
            strategy,
            process_manager: components.process_manager,
            transport: components.transport,
            locator: components.locator,
            metrics: components.metrics,
            heartbeat_max_attempts: heartbeat_max_attempts.max(1),
        }
    }

    pub fn strategy(&self) -> &ExecutionStrategy {
        &self.strategy
    }

    pub async fn get_job(&self, id: &str) -> PlatformResult<Job> {
        self.jobs
            .get_by_id(id)
            .await?
            .ok_or_else(|| PlatformError::not_found(ResourceKind::Job, id))
    }

    /// 提交作业，返回作业 id（转发时为远端返回的 id）
    #[instrument(skip(self, request), fields(job_name = %request.name))]
    pub async fn submit_job(&self, request: JobRequest) -> PlatformResult<String> {
        request.validate()?;
        if let Some(id) = &request.id {
            if self.jobs.exists(id).await? {
                return Err(PlatformError::Conflict(format!("作业 {id} 已存在")));
            }
        }
        let job_id = request
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let decision = self
            .strategy
            .admit(&request, self.jobs.as_ref(), self.locator.as_ref())
            .await?;
        if let AdmissionDecision::Forward { host } = decision {
            return self.forward_submit(&host, &request, &job_id).await;
        }

        self.metrics.increment(JobCounter::Submitted);
        let now = Utc::now();
        let mut job = Job::from_request(job_id.clone(), &request, now)?;
        job.host_name = self.locator.host_name().to_string();
        job.kill_uri = self.locator.kill_uri(&job_id);
        job.output_uri = self.locator.output_uri(&job_id);

        let matches = self
            .resolver
            .resolve_for_job(&mut job, &request.cluster_criteria, &request.command_criterion)
            .await?;
        let selected = self
            .selector
            .select(&matches)
            .and_then(|m| m.commands.first().map(|command| (m.cluster.clone(), command.clone())));
        if let Some((cluster, command)) = &selected {
            job.cluster_id = Some(cluster.id.clone());
            job.cluster_name = Some(cluster.name.clone());
            job.command_id = Some(command.id.clone());
            job.command_name = Some(command.name.clone());
        }

        let mut job = self.jobs.create(&job).await?;
        debug!("作业 {} 已创建，kill 地址 {}", job.id, job.kill_uri);

        let Some((cluster, command)) = selected else {
            warn!("作业 {} 没有匹配的集群/命令", job.id);
            job.set_status(JobStatus::Failed, NO_MATCH_MESSAGE, Utc::now())?;
            self.jobs.update(&job).await?;
            self.metrics.increment(JobCounter::Failed);
            return Err(PlatformError::precondition(NO_MATCH_MESSAGE));
        };

        let launched = self
            .process_manager
            .launch(LaunchContext {
                job: &job,
                cluster: &cluster,
                command: &command,
            })
            .await;

        match launched {
            Ok(handle) => {
                job.process_handle = handle;
                job.set_status(JobStatus::Running, JOB_RUNNING_MESSAGE, Utc::now())?;
                match self.jobs.update(&job).await {
                    Ok(_) => {}
                    // 进程已经退出并被先一步落了终态
                    Err(e) if e.is_optimistic_lock() => {
                        let stored = self.get_job(&job_id).await?;
                        if !stored.is_terminal() {
                            return Err(e);
                        }
                        debug!("作业 {} 在启动记账前已结束: {}", job_id, stored.status);
                    }
                    Err(e) => return Err(e),
                }
                info!(
                    "作业 {} 已在集群 {} 上通过命令 {} 启动，句柄 {}",
                    job_id, cluster.name, command.name, handle
                );
                Ok(job_id)
            }
            Err(e) => {
                error!("作业 {} 启动失败: {}", job_id, e);
                job.set_status(JobStatus::Failed, e.to_string(), Utc::now())?;
                if let Err(persist_err) = self.jobs.update(&job).await {
                    error!("记录作业 {} 的失败状态时出错: {}", job_id, persist_err);
                }
                self.metrics.increment(JobCounter::Failed);
                Err(e)
            }
        }
    }

    async fn forward_submit(
        &self,
        host: &str,
        request: &JobRequest,
        job_id: &str,
    ) -> PlatformResult<String> {
        let mut forwarded = request.clone();
        forwarded.id = Some(job_id.to_string());
        forwarded.forwarded = true;

        let remote_id = self.transport.submit(host, &forwarded).await?;
        self.metrics.increment(JobCounter::Forwarded);
        info!("作业 {} 已转发到 {}", remote_id, host);
        Ok(remote_id)
    }

    /// 终止作业
    ///
    /// 终态作业原样返回；仍在初始化的作业无法终止；属于其他节点的作业
    /// 把请求转发给所属节点并返回其结果。
    #[instrument(skip(self))]
    pub async fn kill_job(&self, id: &str) -> PlatformResult<Job> {
        let job = self.get_job(id).await?;
        if job.is_terminal() {
            debug!("作业 {} 已处于终态 {}，忽略 kill", id, job.status);
            return Ok(job);
        }
        if job.status == JobStatus::Init || !job.is_launched() {
            return Err(PlatformError::precondition(format!(
                "作业 {id} 仍在初始化，无法终止"
            )));
        }

        let owner = self.strategy.owning_host(&job)?;
        if owner != self.locator.host_name() {
            info!("作业 {} 属于节点 {}，转发 kill 请求", id, owner);
            return self.transport.kill(&owner, &job).await;
        }

        self.process_manager.kill(&job).await?;

        match self.persist_kill(job).await {
            Ok(job) => Ok(job),
            Err(e) if e.is_optimistic_lock() => {
                // 被心跳或退出回调抢先写入，基于最新记录再应用一次
                let stored = self.get_job(id).await?;
                if stored.is_terminal() {
                    return Ok(stored);
                }
                self.persist_kill(stored).await.map_err(|e| {
                    PlatformError::Server(format!("记录作业 {id} 的 kill 状态失败: {e}"))
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn persist_kill(&self, mut job: Job) -> PlatformResult<Job> {
        job.set_status(JobStatus::Killed, JOB_KILLED_MESSAGE, Utc::now())?;
        job.exit_code = Some(JOB_KILLED_EXIT_CODE);
        self.archive(&mut job);
        let job = self.jobs.update(&job).await?;
        self.metrics.increment(JobCounter::Killed);
        info!("作业 {} 已被终止", job.id);
        Ok(job)
    }

    /// 根据进程退出码落终态
    ///
    /// 作业已处于另一个终态时忽略本次调用，返回已存储的记录。
    #[instrument(skip(self))]
    pub async fn finalize_job(&self, id: &str, exit_code: i32) -> PlatformResult<Job> {
        let job = self.get_job(id).await?;
        match self.apply_exit(job, exit_code).await {
            Ok(job) => Ok(job),
            Err(e) if e.is_optimistic_lock() => {
                let stored = self.get_job(id).await?;
                self.apply_exit(stored, exit_code).await.map_err(|e| {
                    PlatformError::Server(format!("记录作业 {id} 的退出码 {exit_code} 失败: {e}"))
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn apply_exit(&self, mut job: Job, exit_code: i32) -> PlatformResult<Job> {
        let (status, _) = finalize(exit_code);
        let was_terminal = job.is_terminal();
        if was_terminal && job.status != status {
            info!(
                "作业 {} 已处于终态 {}，忽略退出码 {}",
                job.id, job.status, exit_code
            );
            return Ok(job);
        }

        let now = Utc::now();
        // 启动记账尚未落库时退出事件就到了
        if job.status == JobStatus::Init {
            job.set_status(JobStatus::Running, JOB_RUNNING_MESSAGE, now)?;
        }
        job.apply_exit_code(exit_code, now)?;
        self.archive(&mut job);

        let job = self.jobs.update(&job).await?;
        if !was_terminal {
            self.metrics.increment(match status {
                JobStatus::Succeeded => JobCounter::Succeeded,
                JobStatus::Killed => JobCounter::Killed,
                _ => JobCounter::Failed,
            });
        }
        info!("作业 {} 结束: {} ({})", job.id, job.status, job.status_msg);
        Ok(job)
    }

    fn archive(&self, job: &mut Job) {
        if !job.disable_log_archival {
            job.archive_location = Some(self.locator.archive_uri(&job.id));
        }
    }

    /// 刷新作业的更新时间，遇到版本冲突时重新读取并重试，最多
    /// `heartbeat_max_attempts` 次
    #[instrument(skip(self))]
    pub async fn heartbeat(&self, id: &str) -> PlatformResult<Job> {
        for attempt in 1..=self.heartbeat_max_attempts {
            let job = self.get_job(id).await?;
            if job.is_terminal() {
                return Ok(job);
            }
            match self.jobs.update(&job).await {
                Ok(job) => return Ok(job),
                Err(e) if e.is_optimistic_lock() => {
                    warn!(
                        "作业 {} 心跳版本冲突 (第 {}/{} 次)",
                        id, attempt, self.heartbeat_max_attempts
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Err(PlatformError::Server(format!(
            "作业 {id} 心跳在 {} 次尝试后仍然冲突",
            self.heartbeat_max_attempts
        )))
    }

    /// 为本节点上所有仍在运行的作业发送心跳，返回成功的数量
    pub async fn heartbeat_running_jobs(&self) -> usize {
        let mut refreshed = 0;
        for id in self.process_manager.running_jobs().await {
            match self.heartbeat(&id).await {
                Ok(_) => refreshed += 1,
                Err(e) => warn!("作业 {} 心跳失败: {}", id, e),
            }
        }
        refreshed
    }
}
