use std::sync::Arc;
use std::time::Duration;

use fedexec_core::PlatformResult;
use fedexec_domain::events::JobExit;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, info};

use crate::execution::ExecutionDispatcher;

/// 作业状态监听
///
/// 消费本地进程的退出事件并落终态，同时按固定间隔为运行中的作业发送心跳，
/// 使其不会被僵尸清理误判。
pub struct JobStateListener {
    dispatcher: Arc<ExecutionDispatcher>,
    heartbeat_interval: Duration,
    running: Arc<RwLock<bool>>,
}

impl JobStateListener {
    pub fn new(dispatcher: Arc<ExecutionDispatcher>, heartbeat_interval: Duration) -> Self {
        Self {
            dispatcher,
            heartbeat_interval,
            running: Arc::new(RwLock::new(false)),
        }
    }

    pub async fn handle_exit(&self, exit: JobExit) {
        match self
            .dispatcher
            .finalize_job(&exit.job_id, exit.exit_code)
            .await
        {
            Ok(job) => debug!("作业 {} 已落终态 {}", job.id, job.status),
            Err(e) => error!(
                "处理作业 {} 的退出码 {} 失败: {}",
                exit.job_id, exit.exit_code, e
            ),
        }
    }

    /// 运行监听循环，直到调用 [`JobStateListener::stop`] 或事件通道关闭
    pub async fn start(&self, mut exits: mpsc::UnboundedReceiver<JobExit>) -> PlatformResult<()> {
        info!("启动作业状态监听，心跳间隔 {:?}", self.heartbeat_interval);
        {
            let mut running = self.running.write().await;
            *running = true;
        }

        let mut ticker = tokio::time::interval(self.heartbeat_interval);
        loop {
            if !*self.running.read().await {
                info!("收到停止信号，退出作业状态监听");
                break;
            }

            tokio::select! {
                exit = exits.recv() => match exit {
                    Some(exit) => self.handle_exit(exit).await,
                    None => {
                        info!("退出事件通道已关闭");
                        break;
                    }
                },
                _ = ticker.tick() => {
                    let refreshed = self.dispatcher.heartbeat_running_jobs().await;
                    if refreshed > 0 {
                        debug!("已为 {} 个运行中的作业发送心跳", refreshed);
                    }
                }
            }
        }

        let mut running = self.running.write().await;
        *running = false;
        Ok(())
    }

    pub async fn stop(&self) {
        info!("停止作业状态监听");
        let mut running = self.running.write().await;
        *running = false;
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }
}
