//! 跨节点 HTTP 转发
//!
//! 转发的提交与 kill 直接调用对端节点的公开 REST 接口，对端返回的错误
//! 状态码被还原为同一错误分类，调用方无法区分本地与远端失败。

use std::time::Duration;

use async_trait::async_trait;
use fedexec_core::{PlatformError, PlatformResult, ResourceKind};
use fedexec_domain::entities::{Job, JobRequest};
use fedexec_domain::ports::ForwardTransport;
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RemoteError {
    message: String,
}

pub struct HttpForwardTransport {
    client: Client,
    scheme: String,
    port: u16,
}

impl HttpForwardTransport {
    pub fn new(port: u16, timeout: Duration) -> PlatformResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PlatformError::Configuration(format!("创建HTTP客户端失败: {e}")))?;
        Ok(Self {
            client,
            scheme: "http".to_string(),
            port,
        })
    }

    pub fn with_scheme(mut self, scheme: &str) -> Self {
        self.scheme = scheme.to_string();
        self
    }

    fn jobs_url(&self, host: &str) -> String {
        format!("{}://{}:{}/api/v1/jobs", self.scheme, host, self.port)
    }

    /// kill 地址指向 `host` 时直接使用它（保留对端端口），否则按本地配置拼接
    fn kill_url(&self, host: &str, job: &Job) -> String {
        match Url::parse(&job.kill_uri) {
            Ok(url) if url.host_str() == Some(host) => url.to_string(),
            _ => format!("{}/{}", self.jobs_url(host), job.id),
        }
    }

    async fn error_from_response(response: Response, job_id: Option<&str>) -> PlatformError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<RemoteError>(&body)
            .map(|e| e.message)
            .unwrap_or(body);

        match status {
            StatusCode::NOT_FOUND => match job_id {
                Some(id) => PlatformError::not_found(ResourceKind::Job, id),
                None => PlatformError::Server(message),
            },
            StatusCode::CONFLICT => PlatformError::Conflict(message),
            StatusCode::PRECONDITION_FAILED => PlatformError::PreconditionFailed(message),
            StatusCode::SERVICE_UNAVAILABLE => PlatformError::CapacityExceeded(message),
            _ => PlatformError::Server(format!("远端返回 {status}: {message}")),
        }
    }
}

fn network_error(host: &str, err: reqwest::Error) -> PlatformError {
    if err.is_timeout() {
        PlatformError::Network(format!("请求节点 {host} 超时: {err}"))
    } else {
        PlatformError::Network(format!("请求节点 {host} 失败: {err}"))
    }
}

#[async_trait]
impl ForwardTransport for HttpForwardTransport {
    async fn submit(&self, host: &str, request: &JobRequest) -> PlatformResult<String> {
        let url = self.jobs_url(host);
        debug!("转发作业提交到 {}", url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| network_error(host, e))?;

        if !response.status().is_success() {
            let err = Self::error_from_response(response, None).await;
            warn!("节点 {} 拒绝转发的作业: {}", host, err);
            return Err(err);
        }

        let body: SubmitResponse = response
            .json()
            .await
            .map_err(|e| PlatformError::Serialization(format!("解析节点 {host} 的提交响应失败: {e}")))?;
        Ok(body.id)
    }

    async fn kill(&self, host: &str, job: &Job) -> PlatformResult<Job> {
        let url = self.kill_url(host, job);
        debug!("转发作业 kill 请求到 {}", url);

        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(|e| network_error(host, e))?;

        if !response.status().is_success() {
            let err = Self::error_from_response(response, Some(&job.id)).await;
            warn!("节点 {} 处理 kill 请求失败: {}", host, err);
            return Err(err);
        }

        response
            .json::<Job>()
            .await
            .map_err(|e| PlatformError::Serialization(format!("解析节点 {host} 的作业记录失败: {e}")))
    }
}
