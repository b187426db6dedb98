use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, ConfigResult, ConfigValidator, ValidationUtils};

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connection_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://fedexec.db?mode=rwc".to_string(),
            max_connections: 10,
            min_connections: 1,
            connection_timeout_seconds: 30,
        }
    }
}

impl ConfigValidator for DatabaseConfig {
    fn validate(&self) -> ConfigResult<()> {
        ValidationUtils::validate_not_empty(&self.url, "database.url")?;
        if !self.url.starts_with("sqlite:") {
            return Err(ConfigError::Validation(
                "database.url must be a sqlite URL".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::Validation(
                "database.max_connections must be greater than 0".to_string(),
            ));
        }
        if self.min_connections > self.max_connections {
            return Err(ConfigError::Validation(
                "database.min_connections cannot exceed database.max_connections".to_string(),
            ));
        }
        ValidationUtils::validate_seconds(
            self.connection_timeout_seconds,
            "database.connection_timeout_seconds",
            3600,
        )
    }
}
