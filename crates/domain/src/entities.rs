use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use fedexec_core::{PlatformError, PlatformResult, ResourceKind};
use serde::{Deserialize, Serialize};

use crate::tags::{normalize_system_tags, reject_system_tags, ClusterCriteria, Criterion, TagSet};

/// 进程句柄未分配（作业尚未启动）
pub const NOT_LAUNCHED_HANDLE: i64 = -1;

/// 审计元数据，由持久化边界显式调用 [`AuditMetadata::on_create`] / [`AuditMetadata::on_update`] 维护
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditMetadata {
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    /// 乐观锁版本号
    pub version: i64,
}

impl AuditMetadata {
    pub fn on_create(now: DateTime<Utc>) -> Self {
        Self {
            created: now,
            updated: now,
            version: 0,
        }
    }

    pub fn on_update(&self, now: DateTime<Utc>) -> Self {
        Self {
            created: self.created,
            updated: now,
            version: self.version + 1,
        }
    }
}

fn parse_status<T: Copy>(value: &str, table: &[(&str, T)], kind: &str) -> PlatformResult<T> {
    table
        .iter()
        .find(|(name, _)| *name == value)
        .map(|(_, status)| *status)
        .ok_or_else(|| PlatformError::Serialization(format!("无效的{kind}状态: {value}")))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClusterStatus {
    Up,
    OutOfService,
    Terminated,
}

impl ClusterStatus {
    const TABLE: [(&'static str, ClusterStatus); 3] = [
        ("UP", ClusterStatus::Up),
        ("OUT_OF_SERVICE", ClusterStatus::OutOfService),
        ("TERMINATED", ClusterStatus::Terminated),
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterStatus::Up => "UP",
            ClusterStatus::OutOfService => "OUT_OF_SERVICE",
            ClusterStatus::Terminated => "TERMINATED",
        }
    }
}

impl FromStr for ClusterStatus {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_status(s, &Self::TABLE, "集群")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandStatus {
    Active,
    Deprecated,
    Inactive,
}

impl CommandStatus {
    const TABLE: [(&'static str, CommandStatus); 3] = [
        ("ACTIVE", CommandStatus::Active),
        ("DEPRECATED", CommandStatus::Deprecated),
        ("INACTIVE", CommandStatus::Inactive),
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandStatus::Active => "ACTIVE",
            CommandStatus::Deprecated => "DEPRECATED",
            CommandStatus::Inactive => "INACTIVE",
        }
    }
}

impl FromStr for CommandStatus {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_status(s, &Self::TABLE, "命令")
    }
}

/// 应用与命令共用同一组状态
pub type ApplicationStatus = CommandStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Init,
    Running,
    Succeeded,
    Failed,
    Killed,
}

impl JobStatus {
    const TABLE: [(&'static str, JobStatus); 5] = [
        ("INIT", JobStatus::Init),
        ("RUNNING", JobStatus::Running),
        ("SUCCEEDED", JobStatus::Succeeded),
        ("FAILED", JobStatus::Failed),
        ("KILLED", JobStatus::Killed),
    ];

    pub const TERMINAL: [JobStatus; 3] = [JobStatus::Succeeded, JobStatus::Failed, JobStatus::Killed];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Init => "INIT",
            JobStatus::Running => "RUNNING",
            JobStatus::Succeeded => "SUCCEEDED",
            JobStatus::Failed => "FAILED",
            JobStatus::Killed => "KILLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        Self::TERMINAL.contains(self)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_status(s, &Self::TABLE, "作业")
    }
}

/// 带标签、可重命名的注册资源
pub trait TaggedResource {
    const KIND: ResourceKind;

    fn id(&self) -> &str;
    fn assign_id(&mut self, id: String);
    fn name(&self) -> &str;
    fn assign_name(&mut self, name: String);
    fn tags(&self) -> &TagSet;
    fn set_tags(&mut self, tags: TagSet);
    fn audit(&self) -> &AuditMetadata;
    fn set_audit(&mut self, audit: AuditMetadata);

    /// 重新计算系统标签，创建与重命名时调用
    fn normalize_tags(&mut self) -> PlatformResult<()> {
        let normalized = normalize_system_tags(self.tags(), self.id(), self.name())?;
        self.set_tags(normalized);
        Ok(())
    }
}

macro_rules! impl_tagged_resource {
    ($ty:ty, $kind:expr) => {
        impl TaggedResource for $ty {
            const KIND: ResourceKind = $kind;

            fn id(&self) -> &str {
                &self.id
            }
            fn assign_id(&mut self, id: String) {
                self.id = id;
            }
            fn name(&self) -> &str {
                &self.name
            }
            fn assign_name(&mut self, name: String) {
                self.name = name;
            }
            fn tags(&self) -> &TagSet {
                &self.tags
            }
            fn set_tags(&mut self, tags: TagSet) {
                self.tags = tags;
            }
            fn audit(&self) -> &AuditMetadata {
                &self.audit
            }
            fn set_audit(&mut self, audit: AuditMetadata) {
                self.audit = audit;
            }
        }
    };
}

/// 执行环境
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: String,
    pub name: String,
    pub user: String,
    pub version: String,
    pub description: Option<String>,
    pub status: ClusterStatus,
    pub tags: TagSet,
    pub config_files: Vec<String>,
    pub dependency_files: Vec<String>,
    pub audit: AuditMetadata,
}

impl Cluster {
    pub fn is_up(&self) -> bool {
        self.status == ClusterStatus::Up
    }
}

/// 集群上可运行的程序
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub id: String,
    pub name: String,
    pub user: String,
    pub version: String,
    pub description: Option<String>,
    pub status: CommandStatus,
    pub executable: String,
    /// 检查作业进程状态的间隔（毫秒）
    pub check_delay_ms: u64,
    pub tags: TagSet,
    pub config_files: Vec<String>,
    pub dependency_files: Vec<String>,
    pub audit: AuditMetadata,
}

impl Command {
    pub fn is_active(&self) -> bool {
        self.status == CommandStatus::Active
    }
}

/// 可复用的依赖包
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: String,
    pub name: String,
    pub user: String,
    pub version: String,
    pub status: ApplicationStatus,
    pub tags: TagSet,
    pub config_files: Vec<String>,
    pub dependency_files: Vec<String>,
    pub audit: AuditMetadata,
}

impl_tagged_resource!(Cluster, ResourceKind::Cluster);
impl_tagged_resource!(Command, ResourceKind::Command);
impl_tagged_resource!(Application, ResourceKind::Application);

/// 资源提示
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceHints {
    pub cpu: Option<u32>,
    pub memory_mb: Option<u64>,
    pub timeout_seconds: Option<u64>,
}

/// 提交时的抽象作业请求，提交后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    pub id: Option<String>,
    pub name: String,
    pub user: String,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub command_args: Vec<String>,
    pub cluster_criteria: ClusterCriteria,
    pub command_criterion: Criterion,
    #[serde(default)]
    pub tags: TagSet,
    #[serde(default)]
    pub resources: ResourceHints,
    #[serde(default)]
    pub disable_log_archival: bool,
    /// 已被其他节点转发过一次，不能再次转发
    #[serde(default)]
    pub forwarded: bool,
}

/// 作业 id 会出现在工作目录与 kill 地址中，只允许 `[A-Za-z0-9._-]`，且不能是 `.` / `..`
pub fn validate_job_id(id: &str) -> PlatformResult<()> {
    if id.is_empty() {
        return Err(PlatformError::precondition("作业 id 不能为空"));
    }
    if id == "." || id == ".." {
        return Err(PlatformError::precondition(format!("作业 id {id} 无效")));
    }
    if let Some(c) = id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
    {
        return Err(PlatformError::precondition(format!(
            "作业 id {id:?} 含有非法字符 {c:?}"
        )));
    }
    Ok(())
}

impl JobRequest {
    /// 提交前校验：客户端给出的 id 与标签
    pub fn validate(&self) -> PlatformResult<()> {
        if let Some(id) = &self.id {
            validate_job_id(id)?;
        }
        reject_system_tags(&self.tags)
    }
}

/// 具体的一次作业运行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub name: String,
    pub user: String,
    pub version: String,
    pub description: Option<String>,
    pub command_args: Vec<String>,
    pub tags: TagSet,
    pub status: JobStatus,
    pub status_msg: String,
    pub started: Option<DateTime<Utc>>,
    pub finished: Option<DateTime<Utc>>,
    pub host_name: String,
    pub kill_uri: String,
    pub output_uri: String,
    pub archive_location: Option<String>,
    pub process_handle: i64,
    pub exit_code: Option<i32>,
    pub cluster_id: Option<String>,
    pub cluster_name: Option<String>,
    pub command_id: Option<String>,
    pub command_name: Option<String>,
    /// 命中的集群条件，便于审计
    pub matched_criterion: Option<Criterion>,
    pub disable_log_archival: bool,
    pub forwarded: bool,
    pub audit: AuditMetadata,
}

impl Job {
    /// 由请求创建 INIT 状态的作业，标签带上系统标签
    pub fn from_request(id: String, request: &JobRequest, now: DateTime<Utc>) -> PlatformResult<Self> {
        let tags = normalize_system_tags(&request.tags, &id, &request.name)?;
        let mut job = Self {
            id,
            name: request.name.clone(),
            user: request.user.clone(),
            version: request.version.clone(),
            description: request.description.clone(),
            command_args: request.command_args.clone(),
            tags,
            status: JobStatus::Init,
            status_msg: String::new(),
            started: None,
            finished: None,
            host_name: String::new(),
            kill_uri: String::new(),
            output_uri: String::new(),
            archive_location: None,
            process_handle: NOT_LAUNCHED_HANDLE,
            exit_code: None,
            cluster_id: None,
            cluster_name: None,
            command_id: None,
            command_name: None,
            matched_criterion: None,
            disable_log_archival: request.disable_log_archival,
            forwarded: request.forwarded,
            audit: AuditMetadata::on_create(now),
        };
        job.mark_initialized(now);
        Ok(job)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_launched(&self) -> bool {
        self.process_handle != NOT_LAUNCHED_HANDLE
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.audit.updated
    }

    pub fn entity_description(&self) -> String {
        format!("作业 '{}' (ID: {}, 状态: {})", self.name, self.id, self.status)
    }
}
