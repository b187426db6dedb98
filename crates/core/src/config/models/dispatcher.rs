use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, ConfigResult, ConfigValidator, ValidationUtils};

/// 作业执行准入模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// 按本节点负载决定本地执行、转发或拒绝
    LocalAdmissionControl,
    /// 由节点代理自行负责容量，接收到的作业总在本地执行
    AgentDelegated,
}

/// 同一条件下多个候选集群之间的选择方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterSelection {
    First,
    Random,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    pub execution_mode: ExecutionMode,
    pub cluster_selection: ClusterSelection,
    pub max_running_jobs: usize,
    pub job_forward_threshold: usize,
    pub idle_host_threshold: usize,
    pub idle_host_threshold_delta: usize,
    pub heartbeat_max_attempts: u32,
    pub heartbeat_interval_seconds: u64,
    pub forward_timeout_seconds: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            execution_mode: ExecutionMode::LocalAdmissionControl,
            cluster_selection: ClusterSelection::Random,
            max_running_jobs: 30,
            job_forward_threshold: 20,
            idle_host_threshold: 5,
            idle_host_threshold_delta: 5,
            heartbeat_max_attempts: 5,
            heartbeat_interval_seconds: 30,
            forward_timeout_seconds: 30,
        }
    }
}

impl ConfigValidator for DispatcherConfig {
    fn validate(&self) -> ConfigResult<()> {
        ValidationUtils::validate_count(
            self.max_running_jobs,
            "dispatcher.max_running_jobs",
            10000,
        )?;
        if self.job_forward_threshold > self.max_running_jobs {
            return Err(ConfigError::Validation(format!(
                "dispatcher.job_forward_threshold ({}) cannot exceed dispatcher.max_running_jobs ({})",
                self.job_forward_threshold, self.max_running_jobs
            )));
        }
        if self.heartbeat_max_attempts == 0 {
            return Err(ConfigError::Validation(
                "dispatcher.heartbeat_max_attempts must be greater than 0".to_string(),
            ));
        }
        ValidationUtils::validate_seconds(
            self.heartbeat_interval_seconds,
            "dispatcher.heartbeat_interval_seconds",
            3600,
        )?;
        ValidationUtils::validate_seconds(
            self.forward_timeout_seconds,
            "dispatcher.forward_timeout_seconds",
            3600,
        )
    }
}
