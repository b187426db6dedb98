use serde::{Deserialize, Serialize};

use crate::config::{ConfigResult, ConfigValidator, ValidationUtils};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            log_level: "info".to_string(),
        }
    }
}

impl ConfigValidator for ObservabilityConfig {
    fn validate(&self) -> ConfigResult<()> {
        ValidationUtils::validate_one_of(
            &self.log_level,
            "observability.log_level",
            &["trace", "debug", "info", "warn", "error"],
        )
    }
}
