use fedexec_core::config::ClusterSelection;
use rand::Rng;
use tracing::debug;

use crate::resolver::ClusterMatch;

/// 在同一层命中的候选集群中挑选一个
pub trait ClusterSelector: Send + Sync {
    fn select<'a>(&self, candidates: &'a [ClusterMatch]) -> Option<&'a ClusterMatch>;

    fn name(&self) -> &str;
}

/// 按注册中心返回顺序取第一个
#[derive(Debug, Default)]
pub struct FirstMatchSelector;

impl ClusterSelector for FirstMatchSelector {
    fn select<'a>(&self, candidates: &'a [ClusterMatch]) -> Option<&'a ClusterMatch> {
        candidates.first()
    }

    fn name(&self) -> &str {
        "First"
    }
}

/// 均匀随机选择
#[derive(Debug, Default)]
pub struct RandomSelector;

impl ClusterSelector for RandomSelector {
    fn select<'a>(&self, candidates: &'a [ClusterMatch]) -> Option<&'a ClusterMatch> {
        if candidates.is_empty() {
            return None;
        }
        let index = rand::rng().random_range(0..candidates.len());
        debug!("随机策略选择候选: {}/{}", index, candidates.len());
        candidates.get(index)
    }

    fn name(&self) -> &str {
        "Random"
    }
}

pub fn selector_for(selection: ClusterSelection) -> Box<dyn ClusterSelector> {
    match selection {
        ClusterSelection::First => Box::new(FirstMatchSelector),
        ClusterSelection::Random => Box::new(RandomSelector),
    }
}
