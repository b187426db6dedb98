use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use fedexec_domain::entities::{Job, JobRequest};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{error::ApiResult, routes::AppState};

/// 提交成功后返回的作业ID
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitJobResponse {
    pub id: String,
}

/// 提交作业
///
/// 本节点可能接受、转发或拒绝该请求；被转发的作业由对端持久化，
/// 这里返回的ID与对端一致。
pub async fn submit_job(
    State(state): State<AppState>,
    payload: Result<Json<JobRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    info!(
        "收到作业提交: name={}, forwarded={}",
        request.name, request.forwarded
    );

    let id = state.dispatcher.submit_job(request).await?;
    let location = format!("/api/v1/jobs/{id}");
    Ok((
        StatusCode::ACCEPTED,
        [(header::LOCATION, location)],
        Json(SubmitJobResponse { id }),
    ))
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Job>> {
    let job = state.dispatcher.get_job(&id).await?;
    Ok(Json(job))
}

/// 终止作业，返回终止后的作业记录
pub async fn kill_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Job>> {
    info!("收到作业终止请求: {}", id);
    let job = state.dispatcher.kill_job(&id).await?;
    Ok(Json(job))
}
