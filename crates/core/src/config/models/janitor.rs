use serde::{Deserialize, Serialize};

use crate::config::{ConfigResult, ConfigValidator, ValidationUtils};

/// 僵尸作业清理配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JanitorConfig {
    pub enabled: bool,
    /// 超过该时长未更新的非终态作业被判定为僵尸
    pub zombie_timeout_seconds: u64,
    pub sweep_interval_seconds: u64,
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            zombie_timeout_seconds: 1800,
            sweep_interval_seconds: 300,
        }
    }
}

impl ConfigValidator for JanitorConfig {
    fn validate(&self) -> ConfigResult<()> {
        ValidationUtils::validate_seconds(
            self.zombie_timeout_seconds,
            "janitor.zombie_timeout_seconds",
            7 * 24 * 3600,
        )?;
        ValidationUtils::validate_seconds(
            self.sweep_interval_seconds,
            "janitor.sweep_interval_seconds",
            3600,
        )
    }
}
