use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use fedexec::{wait_for_shutdown_signal, Application, ShutdownManager};
use fedexec_core::config::AppConfig;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 联邦作业执行节点
#[derive(Debug, Parser)]
#[command(name = "fedexec", version, about = "联邦作业执行平台")]
struct Cli {
    /// 配置文件路径，未指定时按默认路径查找
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// 日志级别，未指定时使用配置文件中的值
    #[arg(short, long, value_name = "LEVEL", value_parser = ["trace", "debug", "info", "warn", "error"])]
    log_level: Option<String>,

    /// 日志格式
    #[arg(long, value_name = "FORMAT", value_parser = ["json", "pretty"], default_value = "pretty")]
    log_format: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("加载配置文件失败: {path}"),
        None => "加载配置失败".to_string(),
    })?;

    let log_level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.observability.log_level.clone());
    init_logging(&log_level, &cli.log_format)?;

    info!("启动联邦作业执行节点");
    if let Some(path) = &cli.config {
        info!("配置文件: {path}");
    }

    let app = Application::new(config).await?;
    let shutdown_manager = ShutdownManager::new();

    let app_handle = {
        let shutdown_rx = shutdown_manager.subscribe().await;
        tokio::spawn(async move {
            if let Err(e) = app.run(shutdown_rx).await {
                error!("节点运行失败: {e:#}");
            }
        })
    };

    wait_for_shutdown_signal().await;
    info!("收到关闭信号，开始优雅关闭...");
    shutdown_manager.shutdown().await;

    match tokio::time::timeout(Duration::from_secs(30), app_handle).await {
        Ok(Ok(())) => info!("节点已优雅关闭"),
        Ok(Err(e)) => error!("节点关闭时发生错误: {e}"),
        Err(_) => warn!("节点关闭超时，强制退出"),
    }

    info!("联邦作业执行节点已退出");
    Ok(())
}

/// 初始化日志系统
fn init_logging(log_level: &str, log_format: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .context("初始化JSON日志格式失败")?;
        }
        "pretty" => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
                .context("初始化Pretty日志格式失败")?;
        }
        _ => {
            return Err(anyhow::anyhow!("不支持的日志格式: {log_format}"));
        }
    }

    Ok(())
}
