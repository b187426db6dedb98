use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use fedexec_api::{create_app, AppState};
use fedexec_core::config::AppConfig;
use fedexec_dispatcher::{
    DispatcherComponents, ExecutionDispatcher, JobStateListener, ZombieReaper, ZombieReaperConfig,
};
use fedexec_domain::events::JobExit;
use fedexec_domain::ports::NodeLocator;
use fedexec_domain::services::ResourceService;
use fedexec_infrastructure::{
    install_prometheus_recorder, DatabaseManager, HttpForwardTransport, MetricsCollector,
    SqliteApplicationRepository, SqliteAssociationRepository, SqliteClusterRepository,
    SqliteCommandRepository, SqliteJobRepository, SystemNodeLocator,
};
use fedexec_worker::LocalProcessManager;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info};

/// 一个联邦执行节点
///
/// 持有数据库、调度器、注册中心服务以及三个后台循环：
/// 进程退出事件与心跳、僵尸清理、REST 接口。
pub struct Application {
    config: AppConfig,
    database: DatabaseManager,
    host_name: String,
    dispatcher: Arc<ExecutionDispatcher>,
    resources: Arc<ResourceService>,
    reaper: Arc<ZombieReaper>,
    listener: Arc<JobStateListener>,
    exits: mpsc::UnboundedReceiver<JobExit>,
    metrics: Option<PrometheusHandle>,
}

impl Application {
    pub async fn new(config: AppConfig) -> Result<Self> {
        info!("初始化节点");

        // recorder 必须先于计数器创建安装
        let metrics = if config.observability.metrics_enabled {
            Some(install_prometheus_recorder().context("安装指标导出失败")?)
        } else {
            None
        };
        let metrics_sink = Arc::new(MetricsCollector::new());

        let database = DatabaseManager::new(&config.database)
            .await
            .with_context(|| format!("连接数据库失败: {}", config.database.url))?;
        database.migrate().await.context("初始化数据库结构失败")?;
        let pool = database.pool().clone();

        let clusters = Arc::new(SqliteClusterRepository::new(pool.clone()));
        let commands = Arc::new(SqliteCommandRepository::new(pool.clone()));
        let applications = Arc::new(SqliteApplicationRepository::new(pool.clone()));
        let associations = Arc::new(SqliteAssociationRepository::new(pool.clone()));
        let jobs = Arc::new(SqliteJobRepository::new(pool));

        let locator = Arc::new(SystemNodeLocator::from_config(&config.node).context("解析节点身份失败")?);
        let host_name = locator.host_name().to_string();
        info!("本节点: {} ({})", host_name, locator.base_url());

        let transport = Arc::new(
            HttpForwardTransport::new(
                config.node.port,
                Duration::from_secs(config.dispatcher.forward_timeout_seconds),
            )
            .context("创建转发客户端失败")?,
        );

        let (exit_sender, exits) = mpsc::unbounded_channel();
        let process_manager = Arc::new(LocalProcessManager::new(
            &config.node.work_root,
            exit_sender,
        ));

        let components = DispatcherComponents {
            clusters: clusters.clone(),
            commands: commands.clone(),
            jobs: jobs.clone(),
            process_manager,
            transport,
            locator,
            metrics: metrics_sink.clone(),
        };
        let dispatcher = Arc::new(ExecutionDispatcher::new(components, &config.dispatcher));
        info!("执行策略: {}", dispatcher.strategy().name());

        let resources = Arc::new(ResourceService::new(
            clusters,
            commands,
            applications,
            associations,
        ));
        let reaper = Arc::new(ZombieReaper::new(
            jobs,
            metrics_sink,
            Some(ZombieReaperConfig::from(&config.janitor)),
        ));
        let listener = Arc::new(JobStateListener::new(
            Arc::clone(&dispatcher),
            Duration::from_secs(config.dispatcher.heartbeat_interval_seconds),
        ));

        Ok(Self {
            config,
            database,
            host_name,
            dispatcher,
            resources,
            reaper,
            listener,
            exits,
            metrics,
        })
    }

    pub fn dispatcher(&self) -> Arc<ExecutionDispatcher> {
        Arc::clone(&self.dispatcher)
    }

    pub fn resources(&self) -> Arc<ResourceService> {
        Arc::clone(&self.resources)
    }

    /// 运行所有组件直到收到关闭信号
    pub async fn run(self, shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let Application {
            config,
            database,
            host_name,
            dispatcher,
            resources,
            reaper,
            listener,
            exits,
            metrics,
        } = self;

        let mut handles = Vec::new();

        // 进程退出事件与心跳
        {
            let listener = Arc::clone(&listener);
            let mut shutdown_rx = shutdown_rx.resubscribe();
            handles.push(tokio::spawn(async move {
                tokio::select! {
                    result = listener.start(exits) => {
                        if let Err(e) = result {
                            error!("作业状态监听失败: {}", e);
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("作业状态监听收到关闭信号");
                        listener.stop().await;
                    }
                }
            }));
        }

        // 僵尸清理
        if config.janitor.enabled {
            let reaper = Arc::clone(&reaper);
            let mut shutdown_rx = shutdown_rx.resubscribe();
            handles.push(tokio::spawn(async move {
                tokio::select! {
                    result = reaper.start() => {
                        if let Err(e) = result {
                            error!("僵尸清理循环失败: {}", e);
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("僵尸清理循环收到关闭信号");
                        reaper.stop().await;
                    }
                }
            }));
        } else {
            info!("僵尸清理已禁用");
        }

        // REST 接口
        let bind_address = format!("{}:{}", config.node.bind_address, config.node.port);
        let tcp_listener = TcpListener::bind(&bind_address)
            .await
            .with_context(|| format!("绑定地址失败: {bind_address}"))?;
        info!("API服务器启动在 http://{}", bind_address);

        let router = create_app(AppState {
            dispatcher,
            resources,
            metrics,
            host_name,
        });
        let mut server_shutdown = shutdown_rx.resubscribe();
        let serve_result = axum::serve(tcp_listener, router)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.recv().await;
                info!("API服务器收到关闭信号");
            })
            .await;
        if let Err(e) = serve_result {
            error!("API服务器运行失败: {}", e);
        }

        for handle in handles {
            let _ = handle.await;
        }

        database.close().await;
        info!("所有组件已停止");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_config(work_root: &std::path::Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.database.url = "sqlite::memory:".to_string();
        config.node.hostname = "127.0.0.1".to_string();
        config.node.bind_address = "127.0.0.1".to_string();
        config.node.port = 0;
        config.node.work_root = work_root.display().to_string();
        config.observability.metrics_enabled = false;
        config
    }

    #[tokio::test]
    async fn test_application_starts_and_stops() {
        let work_root = tempfile::tempdir().unwrap();
        let app = Application::new(memory_config(work_root.path()))
            .await
            .unwrap();

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(app.run(shutdown_rx));
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown_tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }
}
