//! 执行策略
//!
//! 两种部署形态并存，由配置选择：
//! - `LocalAdmissionControl`：按本机运行中作业数决定本地执行、转发到空闲节点或拒绝，
//!   作业归属节点取自 kill 地址的主机名；
//! - `AgentDelegated`：每个节点的代理自行负责执行，提交总在本地进行，
//!   作业归属节点取自作业记录的 `host_name`。

use std::collections::BTreeMap;

use fedexec_core::config::{DispatcherConfig, ExecutionMode};
use fedexec_core::{PlatformError, PlatformResult};
use fedexec_domain::entities::{Job, JobRequest};
use fedexec_domain::ports::NodeLocator;
use fedexec_domain::repositories::JobRepository;
use tracing::{debug, info, warn};
use url::Url;

/// 准入控制阈值
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionLimits {
    pub max_running_jobs: usize,
    pub job_forward_threshold: usize,
    pub idle_host_threshold: usize,
    pub idle_host_threshold_delta: usize,
}

impl From<&DispatcherConfig> for AdmissionLimits {
    fn from(config: &DispatcherConfig) -> Self {
        Self {
            max_running_jobs: config.max_running_jobs,
            job_forward_threshold: config.job_forward_threshold,
            idle_host_threshold: config.idle_host_threshold,
            idle_host_threshold_delta: config.idle_host_threshold_delta,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionDecision {
    RunLocally,
    Forward { host: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStrategy {
    LocalAdmissionControl(AdmissionLimits),
    AgentDelegated,
}

pub fn capacity_message(max_running_jobs: usize) -> String {
    format!(
        "Number of running jobs greater than system limit ({max_running_jobs}) - try another instance or try again later"
    )
}

impl ExecutionStrategy {
    pub fn from_config(config: &DispatcherConfig) -> Self {
        match config.execution_mode {
            ExecutionMode::LocalAdmissionControl => {
                ExecutionStrategy::LocalAdmissionControl(AdmissionLimits::from(config))
            }
            ExecutionMode::AgentDelegated => ExecutionStrategy::AgentDelegated,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExecutionStrategy::LocalAdmissionControl(_) => "LocalAdmissionControl",
            ExecutionStrategy::AgentDelegated => "AgentDelegated",
        }
    }

    /// 决定新作业在哪里运行
    pub async fn admit(
        &self,
        request: &JobRequest,
        jobs: &dyn JobRepository,
        locator: &dyn NodeLocator,
    ) -> PlatformResult<AdmissionDecision> {
        let limits = match self {
            ExecutionStrategy::AgentDelegated => return Ok(AdmissionDecision::RunLocally),
            ExecutionStrategy::LocalAdmissionControl(limits) => limits,
        };

        let local_host = locator.host_name();
        let running = jobs.count_active_on_host(local_host).await?;
        debug!("本机 {} 当前运行作业数: {}", local_host, running);

        if !request.forwarded && running >= limits.job_forward_threshold {
            match find_idle_host(limits, limits.max_running_jobs, jobs, locator).await? {
                Some(host) => {
                    info!(
                        "本机运行作业数 {} 达到转发阈值 {}，转发到 {}",
                        running, limits.job_forward_threshold, host
                    );
                    return Ok(AdmissionDecision::Forward { host });
                }
                None => debug!("没有找到空闲节点，尝试本地执行"),
            }
        }

        if running >= limits.max_running_jobs {
            warn!("本机运行作业数 {} 达到上限 {}", running, limits.max_running_jobs);
            return Err(PlatformError::CapacityExceeded(capacity_message(
                limits.max_running_jobs,
            )));
        }

        Ok(AdmissionDecision::RunLocally)
    }

    /// 作业所属节点的主机名
    pub fn owning_host(&self, job: &Job) -> PlatformResult<String> {
        match self {
            ExecutionStrategy::LocalAdmissionControl(_) => {
                if job.kill_uri.trim().is_empty() {
                    return Err(PlatformError::precondition(format!(
                        "作业 {} 缺少 kill 地址，无法定位所属节点",
                        job.id
                    )));
                }
                let url = Url::parse(&job.kill_uri).map_err(|e| {
                    PlatformError::precondition(format!(
                        "作业 {} 的 kill 地址 {} 无效: {}",
                        job.id, job.kill_uri, e
                    ))
                })?;
                url.host_str()
                    .map(|host| host.to_string())
                    .ok_or_else(|| {
                        PlatformError::precondition(format!(
                            "作业 {} 的 kill 地址 {} 没有主机名",
                            job.id, job.kill_uri
                        ))
                    })
            }
            ExecutionStrategy::AgentDelegated => {
                if job.host_name.trim().is_empty() {
                    return Err(PlatformError::precondition(format!(
                        "作业 {} 没有记录所属节点",
                        job.id
                    )));
                }
                Ok(job.host_name.clone())
            }
        }
    }
}

/// 在其他节点中查找负载最低且不超过阈值的节点
///
/// 阈值从 `idle_host_threshold` 开始，每轮增加 `idle_host_threshold_delta`，
/// 直到 `max_jobs`；增量为 0 时只检查一轮。
pub async fn find_idle_host(
    limits: &AdmissionLimits,
    max_jobs: usize,
    jobs: &dyn JobRepository,
    locator: &dyn NodeLocator,
) -> PlatformResult<Option<String>> {
    let local_host = locator.host_name();
    let mut loads: BTreeMap<String, usize> = locator
        .peer_hosts()
        .into_iter()
        .map(|host| (host, 0))
        .collect();
    for (host, count) in jobs.active_counts_by_host().await? {
        loads.insert(host, count);
    }
    loads.remove(local_host);
    loads.retain(|host, _| !host.trim().is_empty());

    let least_loaded = loads.iter().min_by_key(|(_, count)| **count);
    let Some((host, count)) = least_loaded else {
        return Ok(None);
    };

    let mut threshold = limits.idle_host_threshold;
    loop {
        if *count <= threshold {
            debug!("阈值 {} 下选中空闲节点 {} (运行作业数 {})", threshold, host, count);
            return Ok(Some(host.clone()));
        }
        if limits.idle_host_threshold_delta == 0 || threshold >= max_jobs {
            return Ok(None);
        }
        threshold = (threshold + limits.idle_host_threshold_delta).min(max_jobs);
    }
}
