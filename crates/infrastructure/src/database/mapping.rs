//! 数据库字段映射工具
//!
//! 标签、文件列表等集合字段以 JSON 文本存储，时间以 UTC 毫秒整数存储。

use chrono::{DateTime, Utc};
use fedexec_core::{PlatformError, PlatformResult};
use fedexec_domain::entities::AuditMetadata;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// 标签集合是候选标签超集的过滤条件，需要绑定 `(标签JSON数组, 标签个数)` 两个参数
pub const TAG_SUPERSET_CLAUSE: &str = "(SELECT COUNT(DISTINCT t.value) FROM json_each(tags) t \
     WHERE t.value IN (SELECT value FROM json_each(?))) = ?";

pub struct MappingHelpers;

impl MappingHelpers {
    pub fn to_json<T: Serialize + ?Sized>(value: &T, field: &str) -> PlatformResult<String> {
        serde_json::to_string(value)
            .map_err(|e| PlatformError::Serialization(format!("序列化字段 {field} 失败: {e}")))
    }

    pub fn parse_json<T: DeserializeOwned>(row: &SqliteRow, field: &str) -> PlatformResult<T> {
        let raw: String = row.try_get(field)?;
        serde_json::from_str(&raw)
            .map_err(|e| PlatformError::Serialization(format!("解析字段 {field} 失败: {e}")))
    }

    pub fn parse_optional_json<T: DeserializeOwned>(
        row: &SqliteRow,
        field: &str,
    ) -> PlatformResult<Option<T>> {
        match row.try_get::<Option<String>, _>(field)? {
            Some(raw) => serde_json::from_str(&raw).map(Some).map_err(|e| {
                PlatformError::Serialization(format!("解析字段 {field} 失败: {e}"))
            }),
            None => Ok(None),
        }
    }

    /// 截断到毫秒的当前时间，与存储精度一致
    pub fn now() -> DateTime<Utc> {
        let now = Utc::now();
        DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
    }

    pub fn to_millis(at: DateTime<Utc>) -> i64 {
        at.timestamp_millis()
    }

    pub fn parse_time(row: &SqliteRow, field: &str) -> PlatformResult<DateTime<Utc>> {
        let millis: i64 = row.try_get(field)?;
        Self::from_millis(millis, field)
    }

    pub fn parse_optional_time(
        row: &SqliteRow,
        field: &str,
    ) -> PlatformResult<Option<DateTime<Utc>>> {
        row.try_get::<Option<i64>, _>(field)?
            .map(|millis| Self::from_millis(millis, field))
            .transpose()
    }

    pub fn parse_audit(row: &SqliteRow) -> PlatformResult<AuditMetadata> {
        Ok(AuditMetadata {
            created: Self::parse_time(row, "created")?,
            updated: Self::parse_time(row, "updated")?,
            version: row.try_get("entity_version")?,
        })
    }

    fn from_millis(millis: i64, field: &str) -> PlatformResult<DateTime<Utc>> {
        DateTime::from_timestamp_millis(millis).ok_or_else(|| {
            PlatformError::Serialization(format!("字段 {field} 的时间戳无效: {millis}"))
        })
    }
}

/// 插入时的唯一键冲突转换为 Conflict
pub fn map_insert_error(err: sqlx::Error, what: String) -> PlatformError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            PlatformError::Conflict(format!("{what} 已存在"))
        }
        _ => PlatformError::Database(err),
    }
}
