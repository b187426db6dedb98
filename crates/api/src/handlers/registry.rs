//! 注册中心管理接口
//!
//! 集群、命令、应用的增删改查以及它们之间的关联，全部委托给
//! [`ResourceService`](fedexec_domain::services::ResourceService)。

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use fedexec_domain::entities::{
    Application, ApplicationStatus, AuditMetadata, Cluster, ClusterStatus, Command, CommandStatus,
};
use fedexec_domain::tags::TagSet;
use serde::{Deserialize, Serialize};

use crate::{error::ApiResult, routes::AppState};

fn default_check_delay_ms() -> u64 {
    10_000
}

#[derive(Debug, Deserialize)]
pub struct CreateClusterRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub user: String,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: ClusterStatus,
    #[serde(default)]
    pub tags: TagSet,
    #[serde(default)]
    pub config_files: Vec<String>,
    #[serde(default)]
    pub dependency_files: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommandRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub user: String,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: CommandStatus,
    pub executable: String,
    #[serde(default = "default_check_delay_ms")]
    pub check_delay_ms: u64,
    #[serde(default)]
    pub tags: TagSet,
    #[serde(default)]
    pub config_files: Vec<String>,
    #[serde(default)]
    pub dependency_files: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateApplicationRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub user: String,
    pub version: String,
    pub status: ApplicationStatus,
    #[serde(default)]
    pub tags: TagSet,
    #[serde(default)]
    pub config_files: Vec<String>,
    #[serde(default)]
    pub dependency_files: Vec<String>,
}

/// 部分更新，未给出的字段保持不变
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "S: Deserialize<'de>"))]
pub struct ResourcePatch<S> {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tags: Option<TagSet>,
    #[serde(default)]
    pub status: Option<S>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LinkResponse {
    pub changed: bool,
}

// ---- clusters ----

pub async fn create_cluster(
    State(state): State<AppState>,
    payload: Result<Json<CreateClusterRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    let cluster = Cluster {
        id: request.id.unwrap_or_default(),
        name: request.name,
        user: request.user,
        version: request.version,
        description: request.description,
        status: request.status,
        tags: request.tags,
        config_files: request.config_files,
        dependency_files: request.dependency_files,
        audit: AuditMetadata::on_create(Utc::now()),
    };
    let created = state.resources.create_cluster(cluster).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_cluster(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Cluster>> {
    Ok(Json(state.resources.get_cluster(&id).await?))
}

pub async fn patch_cluster(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ResourcePatch<ClusterStatus>>, JsonRejection>,
) -> ApiResult<Json<Cluster>> {
    let Json(patch) = payload?;
    let mut cluster = state.resources.get_cluster(&id).await?;
    if let Some(name) = patch.name {
        cluster = state.resources.rename_cluster(&id, &name).await?;
    }
    if let Some(tags) = patch.tags {
        cluster = state.resources.retag_cluster(&id, tags).await?;
    }
    if let Some(status) = patch.status {
        cluster = state.resources.set_cluster_status(&id, status).await?;
    }
    Ok(Json(cluster))
}

pub async fn delete_cluster(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.resources.delete_cluster(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_cluster_commands(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<String>>> {
    state.resources.get_cluster(&id).await?;
    Ok(Json(state.resources.commands_of_cluster(&id).await?))
}

pub async fn link_cluster_command(
    State(state): State<AppState>,
    Path((cluster_id, command_id)): Path<(String, String)>,
) -> ApiResult<Json<LinkResponse>> {
    let changed = state
        .resources
        .set_cluster_command_link(&cluster_id, &command_id, true)
        .await?;
    Ok(Json(LinkResponse { changed }))
}

pub async fn unlink_cluster_command(
    State(state): State<AppState>,
    Path((cluster_id, command_id)): Path<(String, String)>,
) -> ApiResult<Json<LinkResponse>> {
    let changed = state
        .resources
        .set_cluster_command_link(&cluster_id, &command_id, false)
        .await?;
    Ok(Json(LinkResponse { changed }))
}

// ---- commands ----

pub async fn create_command(
    State(state): State<AppState>,
    payload: Result<Json<CreateCommandRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    let command = Command {
        id: request.id.unwrap_or_default(),
        name: request.name,
        user: request.user,
        version: request.version,
        description: request.description,
        status: request.status,
        executable: request.executable,
        check_delay_ms: request.check_delay_ms,
        tags: request.tags,
        config_files: request.config_files,
        dependency_files: request.dependency_files,
        audit: AuditMetadata::on_create(Utc::now()),
    };
    let created = state.resources.create_command(command).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_command(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Command>> {
    Ok(Json(state.resources.get_command(&id).await?))
}

pub async fn patch_command(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ResourcePatch<CommandStatus>>, JsonRejection>,
) -> ApiResult<Json<Command>> {
    let Json(patch) = payload?;
    let mut command = state.resources.get_command(&id).await?;
    if let Some(name) = patch.name {
        command = state.resources.rename_command(&id, &name).await?;
    }
    if let Some(tags) = patch.tags {
        command = state.resources.retag_command(&id, tags).await?;
    }
    if let Some(status) = patch.status {
        command = state.resources.set_command_status(&id, status).await?;
    }
    Ok(Json(command))
}

pub async fn delete_command(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.resources.delete_command(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_command_clusters(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<String>>> {
    state.resources.get_command(&id).await?;
    Ok(Json(state.resources.clusters_of_command(&id).await?))
}

pub async fn list_command_applications(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<String>>> {
    state.resources.get_command(&id).await?;
    Ok(Json(state.resources.applications_of_command(&id).await?))
}

pub async fn link_command_application(
    State(state): State<AppState>,
    Path((command_id, application_id)): Path<(String, String)>,
) -> ApiResult<Json<LinkResponse>> {
    let changed = state
        .resources
        .set_command_application_link(&command_id, &application_id, true)
        .await?;
    Ok(Json(LinkResponse { changed }))
}

pub async fn unlink_command_application(
    State(state): State<AppState>,
    Path((command_id, application_id)): Path<(String, String)>,
) -> ApiResult<Json<LinkResponse>> {
    let changed = state
        .resources
        .set_command_application_link(&command_id, &application_id, false)
        .await?;
    Ok(Json(LinkResponse { changed }))
}

// ---- applications ----

pub async fn create_application(
    State(state): State<AppState>,
    payload: Result<Json<CreateApplicationRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    let application = Application {
        id: request.id.unwrap_or_default(),
        name: request.name,
        user: request.user,
        version: request.version,
        status: request.status,
        tags: request.tags,
        config_files: request.config_files,
        dependency_files: request.dependency_files,
        audit: AuditMetadata::on_create(Utc::now()),
    };
    let created = state.resources.create_application(application).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_application(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Application>> {
    Ok(Json(state.resources.get_application(&id).await?))
}

pub async fn patch_application(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ResourcePatch<ApplicationStatus>>, JsonRejection>,
) -> ApiResult<Json<Application>> {
    let Json(patch) = payload?;
    let mut application = state.resources.get_application(&id).await?;
    if let Some(name) = patch.name {
        application = state.resources.rename_application(&id, &name).await?;
    }
    if let Some(tags) = patch.tags {
        application = state.resources.retag_application(&id, tags).await?;
    }
    if let Some(status) = patch.status {
        application = state.resources.set_application_status(&id, status).await?;
    }
    Ok(Json(application))
}

pub async fn delete_application(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.resources.delete_application(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
