use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use fedexec_dispatcher::ExecutionDispatcher;
use fedexec_domain::services::ResourceService;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::handlers::{
    health::health_check,
    jobs::{get_job, kill_job, submit_job},
    metrics::prometheus_metrics,
    registry::{
        create_application, create_cluster, create_command, delete_application, delete_cluster,
        delete_command, get_application, get_cluster, get_command, link_cluster_command,
        link_command_application, list_cluster_commands, list_command_applications,
        list_command_clusters, patch_application, patch_cluster, patch_command,
        unlink_cluster_command, unlink_command_application,
    },
};
use crate::middleware::{cors_layer, request_logging, trace_layer};

/// API应用状态
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<ExecutionDispatcher>,
    pub resources: Arc<ResourceService>,
    /// 未启用指标时为空，`/metrics` 返回 404
    pub metrics: Option<PrometheusHandle>,
    pub host_name: String,
}

/// 创建API路由
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        // 健康检查与指标
        .route("/health", get(health_check))
        .route("/metrics", get(prometheus_metrics))
        // 作业
        .route("/api/v1/jobs", post(submit_job))
        .route("/api/v1/jobs/{id}", get(get_job).delete(kill_job))
        // 集群
        .route("/api/v1/clusters", post(create_cluster))
        .route(
            "/api/v1/clusters/{id}",
            get(get_cluster).patch(patch_cluster).delete(delete_cluster),
        )
        .route("/api/v1/clusters/{id}/commands", get(list_cluster_commands))
        .route(
            "/api/v1/clusters/{id}/commands/{command_id}",
            put(link_cluster_command).delete(unlink_cluster_command),
        )
        // 命令
        .route("/api/v1/commands", post(create_command))
        .route(
            "/api/v1/commands/{id}",
            get(get_command).patch(patch_command).delete(delete_command),
        )
        .route("/api/v1/commands/{id}/clusters", get(list_command_clusters))
        .route(
            "/api/v1/commands/{id}/applications",
            get(list_command_applications),
        )
        .route(
            "/api/v1/commands/{id}/applications/{application_id}",
            put(link_command_application).delete(unlink_command_application),
        )
        // 应用
        .route("/api/v1/applications", post(create_application))
        .route(
            "/api/v1/applications/{id}",
            get(get_application)
                .patch(patch_application)
                .delete(delete_application),
        )
        .with_state(state)
}

/// 带中间件的完整应用
pub fn create_app(state: AppState) -> Router {
    create_routes(state)
        .layer(axum::middleware::from_fn(request_logging))
        .layer(trace_layer())
        .layer(cors_layer())
}
