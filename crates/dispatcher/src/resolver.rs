//! 条件解析
//!
//! 按优先级逐层尝试集群条件，第一层有结果就停止，后面的条件不再查询。
//! 没有匹配不是错误，调用方拿到空结果后自行决定如何处理。

use std::sync::Arc;

use fedexec_core::PlatformResult;
use fedexec_domain::entities::{Cluster, ClusterStatus, Command, CommandStatus, Job};
use fedexec_domain::repositories::{ClusterRepository, CommandRepository};
use fedexec_domain::tags::{ClusterCriteria, Criterion};
use tracing::{debug, instrument};

/// 一个候选集群及其上满足命令条件的可用命令
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterMatch {
    pub cluster: Cluster,
    pub commands: Vec<Command>,
}

/// 命中的条件层与该层的全部候选
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub criterion: Criterion,
    pub matches: Vec<ClusterMatch>,
}

pub struct CriteriaResolver {
    clusters: Arc<dyn ClusterRepository>,
    commands: Arc<dyn CommandRepository>,
}

impl CriteriaResolver {
    pub fn new(clusters: Arc<dyn ClusterRepository>, commands: Arc<dyn CommandRepository>) -> Self {
        Self { clusters, commands }
    }

    /// 返回首个非空层的全部 (集群, 命令) 候选；全部落空时返回空列表
    pub async fn resolve(
        &self,
        cluster_criteria: &ClusterCriteria,
        command_criterion: &Criterion,
    ) -> PlatformResult<Vec<ClusterMatch>> {
        Ok(self
            .resolve_tiers(cluster_criteria, command_criterion)
            .await?
            .map(|resolution| resolution.matches)
            .unwrap_or_default())
    }

    /// 与 [`CriteriaResolver::resolve`] 相同，并把命中的条件记录到作业上
    pub async fn resolve_for_job(
        &self,
        job: &mut Job,
        cluster_criteria: &ClusterCriteria,
        command_criterion: &Criterion,
    ) -> PlatformResult<Vec<ClusterMatch>> {
        match self.resolve_tiers(cluster_criteria, command_criterion).await? {
            Some(resolution) => {
                job.matched_criterion = Some(resolution.criterion);
                Ok(resolution.matches)
            }
            None => Ok(Vec::new()),
        }
    }

    #[instrument(skip(self), fields(tiers = cluster_criteria.len()))]
    pub async fn resolve_tiers(
        &self,
        cluster_criteria: &ClusterCriteria,
        command_criterion: &Criterion,
    ) -> PlatformResult<Option<Resolution>> {
        for (tier, criterion) in cluster_criteria.iter().enumerate() {
            let matches = self.match_tier(criterion, command_criterion).await?;
            if !matches.is_empty() {
                debug!(
                    "第 {} 层条件 {} 命中 {} 个集群",
                    tier,
                    criterion,
                    matches.len()
                );
                return Ok(Some(Resolution {
                    criterion: criterion.clone(),
                    matches,
                }));
            }
            debug!("第 {} 层条件 {} 没有可用集群", tier, criterion);
        }
        Ok(None)
    }

    async fn match_tier(
        &self,
        criterion: &Criterion,
        command_criterion: &Criterion,
    ) -> PlatformResult<Vec<ClusterMatch>> {
        let candidates = self
            .clusters
            .find_matching(criterion.tags(), ClusterStatus::Up)
            .await?;

        let mut matches = Vec::new();
        for cluster in candidates {
            let commands = self
                .commands
                .find_matching(command_criterion.tags(), CommandStatus::Active, &cluster.id)
                .await?;
            if !commands.is_empty() {
                matches.push(ClusterMatch { cluster, commands });
            }
        }
        Ok(matches)
    }
}
