//! 节点配置
//!
//! 配置从 TOML 文件加载，随后由 `FEDEXEC__` 前缀的环境变量覆盖。
//! 每个配置段都实现 [`ConfigValidator`]，加载时统一校验，失败即退出。

pub mod models;
pub mod validation;

pub use models::*;
pub use validation::{ConfigValidator, ValidationUtils};

/// 配置错误类型
pub type ConfigResult<T> = Result<T, ConfigError>;

/// 配置错误枚举
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

impl From<ConfigError> for crate::PlatformError {
    fn from(err: ConfigError) -> Self {
        crate::PlatformError::Configuration(err.to_string())
    }
}
