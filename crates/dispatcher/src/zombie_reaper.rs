use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use fedexec_core::config::JanitorConfig;
use fedexec_core::PlatformResult;
use fedexec_domain::lifecycle::ZOMBIE_EXIT_CODE;
use fedexec_domain::ports::{JobCounter, MetricsSink};
use fedexec_domain::repositories::JobRepository;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// 僵尸作业清理配置
#[derive(Debug, Clone)]
pub struct ZombieReaperConfig {
    /// 超过该时长没有更新的非终态作业视为僵尸（秒）
    pub zombie_timeout_seconds: u64,
    /// 扫描间隔（秒）
    pub sweep_interval_seconds: u64,
}

impl Default for ZombieReaperConfig {
    fn default() -> Self {
        Self {
            zombie_timeout_seconds: 1800, // 30分钟
            sweep_interval_seconds: 300,
        }
    }
}

impl From<&JanitorConfig> for ZombieReaperConfig {
    fn from(config: &JanitorConfig) -> Self {
        Self {
            zombie_timeout_seconds: config.zombie_timeout_seconds,
            sweep_interval_seconds: config.sweep_interval_seconds,
        }
    }
}

/// 僵尸作业清理
///
/// 只有超时且期间没有任何进展的作业才会被判定死亡，单次心跳缺失不会触发。
pub struct ZombieReaper {
    jobs: Arc<dyn JobRepository>,
    metrics: Arc<dyn MetricsSink>,
    config: ZombieReaperConfig,
    running: Arc<RwLock<bool>>,
}

impl ZombieReaper {
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        metrics: Arc<dyn MetricsSink>,
        config: Option<ZombieReaperConfig>,
    ) -> Self {
        Self {
            jobs,
            metrics,
            config: config.unwrap_or_default(),
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// 将 `now - zombie_timeout` 之前最后更新的非终态作业置为 FAILED，
    /// 整批在一个事务内写入，返回实际清理的数量
    pub async fn reap_zombies(
        &self,
        now: DateTime<Utc>,
        zombie_timeout: chrono::Duration,
    ) -> PlatformResult<usize> {
        let cutoff = now - zombie_timeout;
        let stale = self.jobs.find_stale(cutoff).await?;
        if stale.is_empty() {
            debug!("没有发现僵尸作业");
            return Ok(0);
        }

        let mut reaped = Vec::with_capacity(stale.len());
        for mut job in stale {
            warn!(
                "作业 {} 自 {} 起没有更新，标记为僵尸",
                job.id,
                job.last_updated().format("%Y-%m-%d %H:%M:%S UTC")
            );
            match job.apply_exit_code(ZOMBIE_EXIT_CODE, now) {
                Ok(()) => reaped.push(job),
                Err(e) => error!("无法将作业 {} 标记为僵尸: {}", job.id, e),
            }
        }

        let written = self.jobs.update_batch(&reaped).await?;
        for _ in &written {
            self.metrics.increment(JobCounter::Zombie);
        }
        if written.len() < reaped.len() {
            debug!(
                "{} 个作业在扫描期间被其他写入者更新，本轮跳过",
                reaped.len() - written.len()
            );
        }
        Ok(written.len())
    }

    /// 按配置的超时时间执行一轮清理
    pub async fn sweep_once(&self) -> PlatformResult<usize> {
        let timeout = chrono::Duration::seconds(self.config.zombie_timeout_seconds as i64);
        self.reap_zombies(Utc::now(), timeout).await
    }

    /// 运行清理循环，直到调用 [`ZombieReaper::stop`]
    pub async fn start(&self) -> PlatformResult<()> {
        info!(
            "启动僵尸作业清理循环: 超时 {}s, 间隔 {}s",
            self.config.zombie_timeout_seconds, self.config.sweep_interval_seconds
        );
        {
            let mut running = self.running.write().await;
            *running = true;
        }

        let interval = Duration::from_secs(self.config.sweep_interval_seconds);
        loop {
            if !*self.running.read().await {
                info!("收到停止信号，退出僵尸作业清理循环");
                break;
            }

            match self.sweep_once().await {
                Ok(0) => {}
                Ok(count) => info!("清理了 {} 个僵尸作业", count),
                Err(e) => error!("僵尸作业清理出错: {}", e),
            }

            tokio::time::sleep(interval).await;
        }
        Ok(())
    }

    pub async fn stop(&self) {
        info!("停止僵尸作业清理");
        let mut running = self.running.write().await;
        *running = false;
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }
}
