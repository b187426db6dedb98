use std::fmt;

use thiserror::Error;

/// 平台错误类型定义
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("{kind}未找到: {id}")]
    NotFound { kind: ResourceKind, id: String },

    #[error("资源冲突: {0}")]
    Conflict(String),

    #[error("前置条件不满足: {0}")]
    PreconditionFailed(String),

    #[error("容量不足: {0}")]
    CapacityExceeded(String),

    #[error("服务器错误: {0}")]
    Server(String),

    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("乐观锁冲突: 作业 {id} 已被并发修改")]
    OptimisticLock { id: String },

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("网络错误: {0}")]
    Network(String),

    #[error("配置错误: {0}")]
    Configuration(String),
}

/// 资源类别，用于 NotFound 错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Cluster,
    Command,
    Application,
    Job,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Cluster => write!(f, "集群"),
            ResourceKind::Command => write!(f, "命令"),
            ResourceKind::Application => write!(f, "应用"),
            ResourceKind::Job => write!(f, "作业"),
        }
    }
}

/// 对外暴露的错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    PreconditionFailed,
    CapacityExceeded,
    ServerError,
}

impl PlatformError {
    pub fn not_found(kind: ResourceKind, id: impl Into<String>) -> Self {
        PlatformError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        PlatformError::PreconditionFailed(message.into())
    }

    /// 将错误归入五种对外分类之一，底层错误一律视为服务器错误
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlatformError::NotFound { .. } => ErrorKind::NotFound,
            PlatformError::Conflict(_) => ErrorKind::Conflict,
            PlatformError::PreconditionFailed(_) => ErrorKind::PreconditionFailed,
            PlatformError::CapacityExceeded(_) => ErrorKind::CapacityExceeded,
            PlatformError::Server(_)
            | PlatformError::Database(_)
            | PlatformError::OptimisticLock { .. }
            | PlatformError::Serialization(_)
            | PlatformError::Network(_)
            | PlatformError::Configuration(_) => ErrorKind::ServerError,
        }
    }

    /// 调用方稍后重试是否可能成功
    pub fn is_retryable(&self) -> bool {
        matches!(self, PlatformError::CapacityExceeded(_))
    }

    pub fn is_optimistic_lock(&self) -> bool {
        matches!(self, PlatformError::OptimisticLock { .. })
    }
}

impl From<serde_json::Error> for PlatformError {
    fn from(err: serde_json::Error) -> Self {
        PlatformError::Serialization(err.to_string())
    }
}

/// 统一的Result类型
pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_classification() {
        assert_eq!(
            PlatformError::not_found(ResourceKind::Job, "j1").kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            PlatformError::Conflict("dup".to_string()).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            PlatformError::precondition("init").kind(),
            ErrorKind::PreconditionFailed
        );
        assert_eq!(
            PlatformError::CapacityExceeded("full".to_string()).kind(),
            ErrorKind::CapacityExceeded
        );
        assert_eq!(
            PlatformError::OptimisticLock { id: "j1".to_string() }.kind(),
            ErrorKind::ServerError
        );
        assert_eq!(
            PlatformError::Network("down".to_string()).kind(),
            ErrorKind::ServerError
        );
    }

    #[test]
    fn test_only_capacity_is_retryable() {
        assert!(PlatformError::CapacityExceeded("full".to_string()).is_retryable());
        assert!(!PlatformError::Server("boom".to_string()).is_retryable());
        assert!(!PlatformError::precondition("init").is_retryable());
    }

    #[test]
    fn test_not_found_message() {
        let err = PlatformError::not_found(ResourceKind::Cluster, "c-1");
        assert_eq!(err.to_string(), "集群未找到: c-1");
    }
}
