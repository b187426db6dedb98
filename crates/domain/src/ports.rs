//! 外部协作方接口
//!
//! 进程管理、跨节点转发、节点定位与指标上报都由调用方注入，
//! 调度核心只决定是否启动、在哪里启动以及最终状态。

use std::fmt;

use async_trait::async_trait;
use fedexec_core::PlatformResult;

use crate::entities::{Cluster, Command, Job, JobRequest};

/// 启动作业所需的上下文
#[derive(Debug, Clone)]
pub struct LaunchContext<'a> {
    pub job: &'a Job,
    pub cluster: &'a Cluster,
    pub command: &'a Command,
}

/// 作业进程管理
#[async_trait]
pub trait ProcessManager: Send + Sync {
    /// 启动作业进程并返回进程句柄
    async fn launch(&self, context: LaunchContext<'_>) -> PlatformResult<i64>;
    /// 终止作业进程
    async fn kill(&self, job: &Job) -> PlatformResult<()>;
    /// 本节点上仍在运行的作业 id
    async fn running_jobs(&self) -> Vec<String> {
        Vec::new()
    }
}

/// 向其他节点转发请求
#[async_trait]
pub trait ForwardTransport: Send + Sync {
    /// 在远端提交作业，返回作业 id
    async fn submit(&self, host: &str, request: &JobRequest) -> PlatformResult<String>;
    /// 在远端终止作业，返回远端的作业记录
    async fn kill(&self, host: &str, job: &Job) -> PlatformResult<Job>;
}

/// 本节点的网络位置
pub trait NodeLocator: Send + Sync {
    fn host_name(&self) -> &str;
    /// 本节点对外可达的根地址，例如 `http://node-a:8080`
    fn base_url(&self) -> String;
    fn archive_uri(&self, job_id: &str) -> String;
    /// 参与负载转发的其他节点
    fn peer_hosts(&self) -> Vec<String>;

    fn kill_uri(&self, job_id: &str) -> String {
        format!("{}/api/v1/jobs/{job_id}", self.base_url())
    }

    fn output_uri(&self, job_id: &str) -> String {
        format!("{}/api/v1/jobs/{job_id}/output", self.base_url())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobCounter {
    Submitted,
    Succeeded,
    Failed,
    Killed,
    Forwarded,
    Zombie,
}

impl JobCounter {
    pub const ALL: [JobCounter; 6] = [
        JobCounter::Submitted,
        JobCounter::Succeeded,
        JobCounter::Failed,
        JobCounter::Killed,
        JobCounter::Forwarded,
        JobCounter::Zombie,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobCounter::Submitted => "submitted",
            JobCounter::Succeeded => "succeeded",
            JobCounter::Failed => "failed",
            JobCounter::Killed => "killed",
            JobCounter::Forwarded => "forwarded",
            JobCounter::Zombie => "zombie",
        }
    }

    /// 导出的指标名
    pub fn metric_name(&self) -> String {
        format!("fedexec_jobs_{}_total", self.as_str())
    }
}

impl fmt::Display for JobCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 指标上报，失败不影响业务
pub trait MetricsSink: Send + Sync {
    fn increment(&self, counter: JobCounter);
}
