//! 领域仓储抽象
//!
//! 定义注册中心与作业表的访问接口，具体实现位于 infrastructure。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fedexec_core::PlatformResult;

use crate::associations::{Association, AssociationKind, Side};
use crate::entities::{Application, Cluster, ClusterStatus, Command, CommandStatus, Job};
use crate::tags::TagSet;

/// 注册资源的通用增删改查
#[async_trait]
pub trait ResourceRepository<T: Send + Sync>: Send + Sync {
    /// 创建资源，id 已存在时返回 Conflict
    async fn create(&self, resource: &T) -> PlatformResult<T>;
    async fn get_by_id(&self, id: &str) -> PlatformResult<Option<T>>;
    /// 更新资源，不存在时返回 NotFound
    async fn update(&self, resource: &T) -> PlatformResult<()>;
    /// 删除资源及其全部关联，不存在时返回 NotFound
    async fn delete(&self, id: &str) -> PlatformResult<()>;
}

/// 集群仓储
#[async_trait]
pub trait ClusterRepository: ResourceRepository<Cluster> {
    /// 查找状态匹配且标签为 `tags` 超集的集群
    async fn find_matching(
        &self,
        tags: &TagSet,
        status: ClusterStatus,
    ) -> PlatformResult<Vec<Cluster>>;
}

/// 命令仓储
#[async_trait]
pub trait CommandRepository: ResourceRepository<Command> {
    /// 查找关联到 `cluster_id`、状态匹配且标签为 `tags` 超集的命令
    async fn find_matching(
        &self,
        tags: &TagSet,
        status: CommandStatus,
        cluster_id: &str,
    ) -> PlatformResult<Vec<Command>>;
}

/// 应用仓储
pub trait ApplicationRepository: ResourceRepository<Application> {}

/// 资源关联仓储，边的两侧由同一次写入同时更新
#[async_trait]
pub trait AssociationRepository: Send + Sync {
    /// 建立（`present = true`）或移除一条关联，返回是否发生变化
    async fn set_association(&self, association: &Association, present: bool)
        -> PlatformResult<bool>;
    async fn linked_ids(
        &self,
        kind: AssociationKind,
        known: Side,
        id: &str,
    ) -> PlatformResult<Vec<String>>;
}

/// 作业仓储，更新采用乐观锁
#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn create(&self, job: &Job) -> PlatformResult<Job>;
    async fn get_by_id(&self, id: &str) -> PlatformResult<Option<Job>>;
    async fn exists(&self, id: &str) -> PlatformResult<bool>;
    /// 版本号与存储一致时写入并返回新版本，否则返回 OptimisticLock
    async fn update(&self, job: &Job) -> PlatformResult<Job>;
    /// 在单个事务内写入一批作业，跳过版本不一致的行，返回实际写入的 id
    async fn update_batch(&self, jobs: &[Job]) -> PlatformResult<Vec<String>>;
    /// 非终态且最后更新时间早于 `cutoff` 的作业
    async fn find_stale(&self, cutoff: DateTime<Utc>) -> PlatformResult<Vec<Job>>;
    /// 指定主机上的非终态作业数
    async fn count_active_on_host(&self, host: &str) -> PlatformResult<usize>;
    /// 各主机上的非终态作业数
    async fn active_counts_by_host(&self) -> PlatformResult<Vec<(String, usize)>>;
}
