use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use fedexec_core::{PlatformError, PlatformResult};
use fedexec_domain::entities::Job;
use fedexec_domain::events::JobExit;
use fedexec_domain::lifecycle::{JOB_KILLED_EXIT_CODE, ProcessStatus};
use fedexec_domain::ports::{LaunchContext, ProcessManager};
use tokio::process::Command;
use tokio::sync::{mpsc, RwLock};
use tracing::{error, info, warn};

/// 本地进程管理器
///
/// 每个作业在 `work_root/<job_id>` 目录下运行，标准输出与错误输出写入同目录
/// 的 `stdout` / `stderr` 文件。进程退出后通过 [`JobExit`] 事件上报退出码，
/// 被 kill 的进程统一上报 kill 退出码，被信号终止的进程上报中断退出码。
pub struct LocalProcessManager {
    work_root: PathBuf,
    /// 正在运行的作业进程ID
    running_processes: Arc<RwLock<HashMap<String, u32>>>,
    /// 已发出 kill 的作业
    killed: Arc<RwLock<HashSet<String>>>,
    exit_sender: mpsc::UnboundedSender<JobExit>,
}

impl LocalProcessManager {
    pub fn new(work_root: impl Into<PathBuf>, exit_sender: mpsc::UnboundedSender<JobExit>) -> Self {
        Self {
            work_root: work_root.into(),
            running_processes: Arc::new(RwLock::new(HashMap::new())),
            killed: Arc::new(RwLock::new(HashSet::new())),
            exit_sender,
        }
    }

    pub fn job_directory(&self, job_id: &str) -> PathBuf {
        self.work_root.join(job_id)
    }

    pub async fn is_running(&self, job_id: &str) -> bool {
        self.running_processes.read().await.contains_key(job_id)
    }

    /// 已发出 kill、尚未收到退出的作业
    pub async fn has_pending_kill(&self, job_id: &str) -> bool {
        self.killed.read().await.contains(job_id)
    }

    pub async fn running_count(&self) -> usize {
        self.running_processes.read().await.len()
    }

    fn open_output(dir: &Path, name: &str) -> PlatformResult<Stdio> {
        let file = std::fs::File::create(dir.join(name)).map_err(|e| {
            PlatformError::Server(format!("创建输出文件 {} 失败: {e}", dir.join(name).display()))
        })?;
        Ok(Stdio::from(file))
    }
}

#[async_trait]
impl ProcessManager for LocalProcessManager {
    async fn launch(&self, context: LaunchContext<'_>) -> PlatformResult<i64> {
        let job = context.job;
        let dir = self.job_directory(&job.id);
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            PlatformError::Server(format!("创建作业目录 {} 失败: {e}", dir.display()))
        })?;

        info!(
            "启动作业进程: job_id={}, command={}, args={:?}",
            job.id, context.command.executable, job.command_args
        );

        let mut cmd = Command::new(&context.command.executable);
        cmd.args(&job.command_args)
            .current_dir(&dir)
            .stdin(Stdio::null())
            .stdout(Self::open_output(&dir, "stdout")?)
            .stderr(Self::open_output(&dir, "stderr")?)
            .env("FEDEXEC_JOB_ID", &job.id)
            .env("FEDEXEC_JOB_NAME", &job.name)
            .env("FEDEXEC_CLUSTER_ID", &context.cluster.id)
            .env("FEDEXEC_CLUSTER_NAME", &context.cluster.name)
            .env("FEDEXEC_COMMAND_ID", &context.command.id)
            .env("FEDEXEC_COMMAND_NAME", &context.command.name);

        let mut child = cmd.spawn().map_err(|e| {
            PlatformError::Server(format!(
                "启动作业 {} 的命令 {} 失败: {e}",
                job.id, context.command.executable
            ))
        })?;
        let pid = child
            .id()
            .ok_or_else(|| PlatformError::Server(format!("作业 {} 的进程已提前退出", job.id)))?;

        self.running_processes
            .write()
            .await
            .insert(job.id.clone(), pid);

        let job_id = job.id.clone();
        let running_processes = Arc::clone(&self.running_processes);
        let killed = Arc::clone(&self.killed);
        let exit_sender = self.exit_sender.clone();
        tokio::spawn(async move {
            let exit_code = match child.wait().await {
                Ok(status) => status.code().unwrap_or(ProcessStatus::JobInterrupted.code()),
                Err(e) => {
                    error!("等待作业 {} 的进程失败: {}", job_id, e);
                    ProcessStatus::JobInterrupted.code()
                }
            };

            running_processes.write().await.remove(&job_id);
            let exit_code = if killed.write().await.remove(&job_id) {
                JOB_KILLED_EXIT_CODE
            } else {
                exit_code
            };

            info!("作业进程退出: job_id={}, pid={}, exit_code={}", job_id, pid, exit_code);
            if exit_sender
                .send(JobExit {
                    job_id: job_id.clone(),
                    exit_code,
                })
                .is_err()
            {
                warn!("退出事件接收端已关闭，丢弃作业 {} 的退出码", job_id);
            }
        });

        Ok(pid as i64)
    }

    async fn kill(&self, job: &Job) -> PlatformResult<()> {
        // 持有写锁直到信号发出，退出监视任务无法在此期间移除进程记录
        let running = self.running_processes.write().await;
        let Some(pid) = running.get(&job.id).copied() else {
            warn!("未找到要终止的作业进程: job_id={}", job.id);
            return Ok(());
        };
        self.killed.write().await.insert(job.id.clone());
        let result = terminate(pid).await;
        drop(running);

        if let Err(e) = result {
            self.killed.write().await.remove(&job.id);
            if !self.is_running(&job.id).await {
                warn!("作业 {} 的进程 {} 已退出: {}", job.id, pid, e);
                return Ok(());
            }
            error!("终止作业进程失败: job_id={}, pid={}, error={}", job.id, pid, e);
            return Err(e);
        }

        info!("已向作业进程发送终止信号: job_id={}, pid={}", job.id, pid);
        Ok(())
    }

    async fn running_jobs(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.running_processes.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(unix)]
async fn terminate(pid: u32) -> PlatformResult<()> {
    let output = Command::new("kill")
        .arg(pid.to_string())
        .output()
        .await
        .map_err(|e| PlatformError::Server(format!("执行kill命令失败: {e}")))?;
    if output.status.success() {
        Ok(())
    } else {
        Err(PlatformError::Server(format!(
            "终止进程 {pid} 失败: {}",
            String::from_utf8_lossy(&output.stderr)
        )))
    }
}

#[cfg(windows)]
async fn terminate(pid: u32) -> PlatformResult<()> {
    let output = Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/F"])
        .output()
        .await
        .map_err(|e| PlatformError::Server(format!("执行taskkill命令失败: {e}")))?;
    if output.status.success() {
        Ok(())
    } else {
        Err(PlatformError::Server(format!(
            "终止进程 {pid} 失败: {}",
            String::from_utf8_lossy(&output.stderr)
        )))
    }
}
