//! 注册中心管理服务
//!
//! 集群、命令、应用的创建、重命名、改标签、改状态与删除都经过这里，
//! 保证系统标签与审计元数据只在一个地方维护。资源之间的关联通过
//! [`AssociationRepository::set_association`] 一个入口增删。

use std::sync::Arc;

use chrono::Utc;
use fedexec_core::{PlatformError, PlatformResult, ResourceKind};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::associations::{Association, AssociationKind, Side};
use crate::entities::{
    Application, ApplicationStatus, AuditMetadata, Cluster, ClusterStatus, Command, CommandStatus,
    TaggedResource,
};
use crate::repositories::{
    ApplicationRepository, AssociationRepository, ClusterRepository, CommandRepository,
    ResourceRepository,
};
use crate::tags::{reject_system_tags, TagSet};

async fn create_resource<T, R>(repo: &R, mut resource: T) -> PlatformResult<T>
where
    T: TaggedResource + Send + Sync,
    R: ResourceRepository<T> + ?Sized,
{
    reject_system_tags(resource.tags())?;
    if resource.id().trim().is_empty() {
        resource.assign_id(Uuid::new_v4().to_string());
    }

    if repo.get_by_id(resource.id()).await?.is_some() {
        return Err(PlatformError::Conflict(format!(
            "{} {} 已存在",
            T::KIND,
            resource.id()
        )));
    }

    resource.set_audit(AuditMetadata::on_create(Utc::now()));
    resource.normalize_tags()?;

    match repo.create(&resource).await {
        Ok(created) => {
            info!("创建{}: {} ({})", T::KIND, created.name(), created.id());
            Ok(created)
        }
        // 存在性检查之后被并发请求抢先插入，内容相同，按成功处理
        Err(PlatformError::Conflict(msg)) => {
            warn!("{} {} 已被并发创建: {}", T::KIND, resource.id(), msg);
            match repo.get_by_id(resource.id()).await? {
                Some(existing) => Ok(existing),
                None => Ok(resource),
            }
        }
        Err(e) => Err(e),
    }
}

async fn modify_resource<T, R, F>(repo: &R, id: &str, change: F) -> PlatformResult<T>
where
    T: TaggedResource + Send + Sync,
    R: ResourceRepository<T> + ?Sized,
    F: FnOnce(&mut T) -> PlatformResult<()> + Send,
{
    let mut resource = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| PlatformError::not_found(T::KIND, id))?;
    change(&mut resource)?;
    resource.normalize_tags()?;
    let audit = resource.audit().on_update(Utc::now());
    resource.set_audit(audit);
    repo.update(&resource).await?;
    debug!("更新{}: {}", T::KIND, id);
    Ok(resource)
}

async fn delete_resource<T, R>(repo: &R, id: &str) -> PlatformResult<()>
where
    T: TaggedResource + Send + Sync,
    R: ResourceRepository<T> + ?Sized,
{
    if repo.get_by_id(id).await?.is_none() {
        return Err(PlatformError::not_found(T::KIND, id));
    }
    repo.delete(id).await?;
    info!("删除{}: {}", T::KIND, id);
    Ok(())
}

fn rename<T: TaggedResource>(resource: &mut T, name: &str) -> PlatformResult<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PlatformError::precondition("名称不能为空"));
    }
    resource.assign_name(name.to_string());
    Ok(())
}

fn retag<T: TaggedResource>(resource: &mut T, tags: TagSet) -> PlatformResult<()> {
    reject_system_tags(&tags)?;
    resource.set_tags(tags);
    Ok(())
}

/// 注册中心管理服务
pub struct ResourceService {
    clusters: Arc<dyn ClusterRepository>,
    commands: Arc<dyn CommandRepository>,
    applications: Arc<dyn ApplicationRepository>,
    associations: Arc<dyn AssociationRepository>,
}

impl ResourceService {
    pub fn new(
        clusters: Arc<dyn ClusterRepository>,
        commands: Arc<dyn CommandRepository>,
        applications: Arc<dyn ApplicationRepository>,
        associations: Arc<dyn AssociationRepository>,
    ) -> Self {
        Self {
            clusters,
            commands,
            applications,
            associations,
        }
    }

    pub async fn create_cluster(&self, cluster: Cluster) -> PlatformResult<Cluster> {
        create_resource(self.clusters.as_ref(), cluster).await
    }

    pub async fn create_command(&self, command: Command) -> PlatformResult<Command> {
        create_resource(self.commands.as_ref(), command).await
    }

    pub async fn create_application(&self, application: Application) -> PlatformResult<Application> {
        create_resource(self.applications.as_ref(), application).await
    }

    pub async fn get_cluster(&self, id: &str) -> PlatformResult<Cluster> {
        self.clusters
            .get_by_id(id)
            .await?
            .ok_or_else(|| PlatformError::not_found(ResourceKind::Cluster, id))
    }

    pub async fn get_command(&self, id: &str) -> PlatformResult<Command> {
        self.commands
            .get_by_id(id)
            .await?
            .ok_or_else(|| PlatformError::not_found(ResourceKind::Command, id))
    }

    pub async fn get_application(&self, id: &str) -> PlatformResult<Application> {
        self.applications
            .get_by_id(id)
            .await?
            .ok_or_else(|| PlatformError::not_found(ResourceKind::Application, id))
    }

    pub async fn rename_cluster(&self, id: &str, name: &str) -> PlatformResult<Cluster> {
        modify_resource(self.clusters.as_ref(), id, |c: &mut Cluster| rename(c, name)).await
    }

    pub async fn rename_command(&self, id: &str, name: &str) -> PlatformResult<Command> {
        modify_resource(self.commands.as_ref(), id, |c: &mut Command| rename(c, name)).await
    }

    pub async fn rename_application(&self, id: &str, name: &str) -> PlatformResult<Application> {
        modify_resource(self.applications.as_ref(), id, |a: &mut Application| {
            rename(a, name)
        })
        .await
    }

    /// 替换用户标签，系统标签随后重新生成
    pub async fn retag_cluster(&self, id: &str, tags: TagSet) -> PlatformResult<Cluster> {
        modify_resource(self.clusters.as_ref(), id, |c: &mut Cluster| retag(c, tags)).await
    }

    pub async fn retag_command(&self, id: &str, tags: TagSet) -> PlatformResult<Command> {
        modify_resource(self.commands.as_ref(), id, |c: &mut Command| retag(c, tags)).await
    }

    pub async fn retag_application(&self, id: &str, tags: TagSet) -> PlatformResult<Application> {
        modify_resource(self.applications.as_ref(), id, |a: &mut Application| {
            retag(a, tags)
        })
        .await
    }

    pub async fn set_cluster_status(
        &self,
        id: &str,
        status: ClusterStatus,
    ) -> PlatformResult<Cluster> {
        modify_resource(self.clusters.as_ref(), id, |c: &mut Cluster| {
            c.status = status;
            Ok(())
        })
        .await
    }

    pub async fn set_command_status(
        &self,
        id: &str,
        status: CommandStatus,
    ) -> PlatformResult<Command> {
        modify_resource(self.commands.as_ref(), id, |c: &mut Command| {
            c.status = status;
            Ok(())
        })
        .await
    }

    pub async fn set_application_status(
        &self,
        id: &str,
        status: ApplicationStatus,
    ) -> PlatformResult<Application> {
        modify_resource(self.applications.as_ref(), id, |a: &mut Application| {
            a.status = status;
            Ok(())
        })
        .await
    }

    pub async fn delete_cluster(&self, id: &str) -> PlatformResult<()> {
        delete_resource::<Cluster, _>(self.clusters.as_ref(), id).await
    }

    pub async fn delete_command(&self, id: &str) -> PlatformResult<()> {
        delete_resource::<Command, _>(self.commands.as_ref(), id).await
    }

    pub async fn delete_application(&self, id: &str) -> PlatformResult<()> {
        delete_resource::<Application, _>(self.applications.as_ref(), id).await
    }

    /// 建立或移除集群与命令之间的关联
    pub async fn set_cluster_command_link(
        &self,
        cluster_id: &str,
        command_id: &str,
        present: bool,
    ) -> PlatformResult<bool> {
        self.get_cluster(cluster_id).await?;
        self.get_command(command_id).await?;
        self.set_link(Association::cluster_command(cluster_id, command_id), present)
            .await
    }

    /// 建立或移除命令与应用之间的关联
    pub async fn set_command_application_link(
        &self,
        command_id: &str,
        application_id: &str,
        present: bool,
    ) -> PlatformResult<bool> {
        self.get_command(command_id).await?;
        self.get_application(application_id).await?;
        self.set_link(
            Association::command_application(command_id, application_id),
            present,
        )
        .await
    }

    async fn set_link(&self, association: Association, present: bool) -> PlatformResult<bool> {
        let changed = self
            .associations
            .set_association(&association, present)
            .await?;
        debug!(
            "关联 {:?} {} -> {}: present={}, changed={}",
            association.kind, association.left, association.right, present, changed
        );
        Ok(changed)
    }

    pub async fn commands_of_cluster(&self, cluster_id: &str) -> PlatformResult<Vec<String>> {
        self.associations
            .linked_ids(AssociationKind::ClusterCommand, Side::Left, cluster_id)
            .await
    }

    pub async fn clusters_of_command(&self, command_id: &str) -> PlatformResult<Vec<String>> {
        self.associations
            .linked_ids(AssociationKind::ClusterCommand, Side::Right, command_id)
            .await
    }

    pub async fn applications_of_command(&self, command_id: &str) -> PlatformResult<Vec<String>> {
        self.associations
            .linked_ids(AssociationKind::CommandApplication, Side::Left, command_id)
            .await
    }
}
