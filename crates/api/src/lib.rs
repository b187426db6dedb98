//! # Fedexec API
//!
//! 节点对外的 REST 接口，基于 Axum 构建。
//!
//! - `POST /api/v1/jobs` 提交作业，返回 202 与作业ID
//! - `GET /api/v1/jobs/{id}` 查询作业
//! - `DELETE /api/v1/jobs/{id}` 终止作业，返回作业记录
//! - `/api/v1/clusters`、`/api/v1/commands`、`/api/v1/applications` 注册中心管理
//! - `GET /health`、`GET /metrics`
//!
//! 跨节点转发也走同一组作业接口，错误分类通过状态码传递：
//! NotFound→404、Conflict→409、PreconditionFailed→412、
//! CapacityExceeded→503、其余→500，响应体为 `{"error": ..., "message": ...}`。

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;

pub use error::{ApiError, ApiResult};
pub use routes::{create_app, create_routes, AppState};
