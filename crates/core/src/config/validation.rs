use super::{ConfigError, ConfigResult};

/// 配置校验接口
pub trait ConfigValidator {
    fn validate(&self) -> ConfigResult<()>;
}

/// 通用校验工具
pub struct ValidationUtils;

impl ValidationUtils {
    pub fn validate_not_empty(value: &str, field_name: &str) -> ConfigResult<()> {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "{field_name} cannot be empty"
            )));
        }
        Ok(())
    }

    pub fn validate_port(port: u16) -> ConfigResult<()> {
        if port == 0 {
            return Err(ConfigError::Validation("port cannot be 0".to_string()));
        }
        Ok(())
    }

    /// 超时必须在 (0, max] 之间
    pub fn validate_seconds(value: u64, field_name: &str, max: u64) -> ConfigResult<()> {
        if value == 0 {
            return Err(ConfigError::Validation(format!(
                "{field_name} must be greater than 0"
            )));
        }
        if value > max {
            return Err(ConfigError::Validation(format!(
                "{field_name} must be less than or equal to {max}"
            )));
        }
        Ok(())
    }

    pub fn validate_count(count: usize, field_name: &str, max: usize) -> ConfigResult<()> {
        if count == 0 {
            return Err(ConfigError::Validation(format!(
                "{field_name} must be greater than 0"
            )));
        }
        if count > max {
            return Err(ConfigError::Validation(format!(
                "{field_name} must be less than or equal to {max}"
            )));
        }
        Ok(())
    }

    pub fn validate_one_of(value: &str, field_name: &str, allowed: &[&str]) -> ConfigResult<()> {
        if !allowed.contains(&value) {
            return Err(ConfigError::Validation(format!(
                "Invalid {field_name}: {value}. Valid options: {allowed:?}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_not_empty() {
        assert!(ValidationUtils::validate_not_empty("test", "field").is_ok());
        assert!(ValidationUtils::validate_not_empty("", "field").is_err());
        assert!(ValidationUtils::validate_not_empty("   ", "field").is_err());
    }

    #[test]
    fn test_validate_seconds() {
        assert!(ValidationUtils::validate_seconds(30, "t", 3600).is_ok());
        assert!(ValidationUtils::validate_seconds(3600, "t", 3600).is_ok());
        assert!(ValidationUtils::validate_seconds(0, "t", 3600).is_err());
        assert!(ValidationUtils::validate_seconds(3601, "t", 3600).is_err());
    }

    #[test]
    fn test_validate_one_of() {
        assert!(ValidationUtils::validate_one_of("first", "sel", &["first", "random"]).is_ok());
        assert!(ValidationUtils::validate_one_of("least", "sel", &["first", "random"]).is_err());
    }
}
