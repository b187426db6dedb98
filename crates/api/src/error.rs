use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fedexec_core::{ErrorKind, PlatformError};
use serde_json::json;
use tracing::{error, warn};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("请求体无效: {0}")]
    BadRequest(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Platform(err) => match err.kind() {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::PreconditionFailed => StatusCode::PRECONDITION_FAILED,
                ErrorKind::CapacityExceeded => StatusCode::SERVICE_UNAVAILABLE,
                ErrorKind::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// 响应体中的错误类型标识
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::Platform(err) => match err.kind() {
                ErrorKind::NotFound => "not_found",
                ErrorKind::Conflict => "conflict",
                ErrorKind::PreconditionFailed => "precondition_failed",
                ErrorKind::CapacityExceeded => "capacity_exceeded",
                ErrorKind::ServerError => "server_error",
            },
            ApiError::BadRequest(_) => "bad_request",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            // 对外只暴露错误消息本身，不带分类前缀
            ApiError::Platform(PlatformError::Conflict(msg))
            | ApiError::Platform(PlatformError::PreconditionFailed(msg))
            | ApiError::Platform(PlatformError::CapacityExceeded(msg))
            | ApiError::Platform(PlatformError::Server(msg)) => msg.clone(),
            other => other.to_string(),
        };

        if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            error!("请求处理失败: {}", self);
        } else {
            warn!("请求被拒绝 ({}): {}", status.as_u16(), message);
        }

        let body = Json(json!({
            "error": self.error_type(),
            "message": message,
        }));
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
