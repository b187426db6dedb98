//! Metrics collector for job lifecycle counters

use fedexec_core::{PlatformError, PlatformResult};
use fedexec_domain::ports::{JobCounter, MetricsSink};
use metrics::{counter, describe_counter, Counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{debug, info};

/// 安装全局 Prometheus recorder，返回用于渲染 `/metrics` 的句柄
///
/// 进程内只能安装一次，重复安装返回配置错误。
pub fn install_prometheus_recorder() -> PlatformResult<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| PlatformError::Configuration(format!("安装Prometheus recorder失败: {e}")))?;

    for job_counter in JobCounter::ALL {
        describe_counter!(
            job_counter.metric_name(),
            format!("Total number of {job_counter} jobs")
        );
    }
    info!("Prometheus指标导出已启用");
    Ok(handle)
}

/// 作业生命周期计数器
pub struct MetricsCollector {
    submitted: Counter,
    succeeded: Counter,
    failed: Counter,
    killed: Counter,
    forwarded: Counter,
    zombie: Counter,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            submitted: counter!(JobCounter::Submitted.metric_name()),
            succeeded: counter!(JobCounter::Succeeded.metric_name()),
            failed: counter!(JobCounter::Failed.metric_name()),
            killed: counter!(JobCounter::Killed.metric_name()),
            forwarded: counter!(JobCounter::Forwarded.metric_name()),
            zombie: counter!(JobCounter::Zombie.metric_name()),
        }
    }

    fn counter(&self, job_counter: JobCounter) -> &Counter {
        match job_counter {
            JobCounter::Submitted => &self.submitted,
            JobCounter::Succeeded => &self.succeeded,
            JobCounter::Failed => &self.failed,
            JobCounter::Killed => &self.killed,
            JobCounter::Forwarded => &self.forwarded,
            JobCounter::Zombie => &self.zombie,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSink for MetricsCollector {
    fn increment(&self, job_counter: JobCounter) {
        self.counter(job_counter).increment(1);
        debug!(counter = %job_counter, "作业计数器递增");
    }
}
