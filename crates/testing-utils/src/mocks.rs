//! Mock implementations for all repository and collaborator traits
//!
//! This module provides in-memory mock implementations that can be used
//! for unit testing without requiring actual database connections, child
//! processes or remote nodes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fedexec_core::{PlatformError, PlatformResult, ResourceKind};
use fedexec_domain::associations::{Association, AssociationKind, AssociationTable, Side};
use fedexec_domain::entities::{
    Application, Cluster, ClusterStatus, Command, CommandStatus, Job, JobRequest,
};
use fedexec_domain::ports::{
    ForwardTransport, JobCounter, LaunchContext, MetricsSink, NodeLocator, ProcessManager,
};
use fedexec_domain::repositories::{
    ApplicationRepository, AssociationRepository, ClusterRepository, CommandRepository,
    JobRepository, ResourceRepository,
};
use fedexec_domain::tags::TagSet;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct RegistryState {
    clusters: BTreeMap<String, Cluster>,
    commands: BTreeMap<String, Command>,
    applications: BTreeMap<String, Application>,
    associations: AssociationTable,
    cluster_queries: Vec<TagSet>,
}

/// In-memory resource registry implementing every registry repository trait
///
/// Resources are kept ordered by id, so "registry order" is deterministic.
#[derive(Debug, Clone, Default)]
pub struct MockRegistry {
    state: Arc<Mutex<RegistryState>>,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_cluster(&self, cluster: Cluster) {
        let mut state = self.state.lock().unwrap();
        state.clusters.insert(cluster.id.clone(), cluster);
    }

    pub fn add_command(&self, command: Command) {
        let mut state = self.state.lock().unwrap();
        state.commands.insert(command.id.clone(), command);
    }

    pub fn add_application(&self, application: Application) {
        let mut state = self.state.lock().unwrap();
        state.applications.insert(application.id.clone(), application);
    }

    pub fn link(&self, cluster_id: &str, command_id: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .associations
            .set(Association::cluster_command(cluster_id, command_id), true);
    }

    /// Tag sets passed to `ClusterRepository::find_matching`, in call order
    pub fn cluster_queries(&self) -> Vec<TagSet> {
        self.state.lock().unwrap().cluster_queries.clone()
    }

    pub fn cluster_count(&self) -> usize {
        self.state.lock().unwrap().clusters.len()
    }
}

macro_rules! impl_mock_resource_repository {
    ($ty:ty, $field:ident, $kind:expr, [$(($edge:expr, $side:expr)),+]) => {
        #[async_trait]
        impl ResourceRepository<$ty> for MockRegistry {
            async fn create(&self, resource: &$ty) -> PlatformResult<$ty> {
                let mut state = self.state.lock().unwrap();
                if state.$field.contains_key(&resource.id) {
                    return Err(PlatformError::Conflict(format!("{} 已存在", resource.id)));
                }
                state.$field.insert(resource.id.clone(), resource.clone());
                Ok(resource.clone())
            }

            async fn get_by_id(&self, id: &str) -> PlatformResult<Option<$ty>> {
                Ok(self.state.lock().unwrap().$field.get(id).cloned())
            }

            async fn update(&self, resource: &$ty) -> PlatformResult<()> {
                let mut state = self.state.lock().unwrap();
                if !state.$field.contains_key(&resource.id) {
                    return Err(PlatformError::not_found($kind, resource.id.clone()));
                }
                state.$field.insert(resource.id.clone(), resource.clone());
                Ok(())
            }

            async fn delete(&self, id: &str) -> PlatformResult<()> {
                let mut state = self.state.lock().unwrap();
                if state.$field.remove(id).is_none() {
                    return Err(PlatformError::not_found($kind, id));
                }
                $(state.associations.remove_all($edge, $side, id);)+
                Ok(())
            }
        }
    };
}

impl_mock_resource_repository!(
    Cluster,
    clusters,
    ResourceKind::Cluster,
    [(AssociationKind::ClusterCommand, Side::Left)]
);
impl_mock_resource_repository!(
    Command,
    commands,
    ResourceKind::Command,
    [
        (AssociationKind::ClusterCommand, Side::Right),
        (AssociationKind::CommandApplication, Side::Left)
    ]
);
impl_mock_resource_repository!(
    Application,
    applications,
    ResourceKind::Application,
    [(AssociationKind::CommandApplication, Side::Right)]
);

#[async_trait]
impl ClusterRepository for MockRegistry {
    async fn find_matching(
        &self,
        tags: &TagSet,
        status: ClusterStatus,
    ) -> PlatformResult<Vec<Cluster>> {
        let mut state = self.state.lock().unwrap();
        state.cluster_queries.push(tags.clone());
        Ok(state
            .clusters
            .values()
            .filter(|c| c.status == status && tags.is_subset(&c.tags))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CommandRepository for MockRegistry {
    async fn find_matching(
        &self,
        tags: &TagSet,
        status: CommandStatus,
        cluster_id: &str,
    ) -> PlatformResult<Vec<Command>> {
        let state = self.state.lock().unwrap();
        let linked = state
            .associations
            .linked(AssociationKind::ClusterCommand, Side::Left, cluster_id);
        Ok(linked
            .iter()
            .filter_map(|id| state.commands.get(id))
            .filter(|c| c.status == status && tags.is_subset(&c.tags))
            .cloned()
            .collect())
    }
}

impl ApplicationRepository for MockRegistry {}

#[async_trait]
impl AssociationRepository for MockRegistry {
    async fn set_association(
        &self,
        association: &Association,
        present: bool,
    ) -> PlatformResult<bool> {
        let mut state = self.state.lock().unwrap();
        Ok(state.associations.set(association.clone(), present))
    }

    async fn linked_ids(
        &self,
        kind: AssociationKind,
        known: Side,
        id: &str,
    ) -> PlatformResult<Vec<String>> {
        Ok(self.state.lock().unwrap().associations.linked(kind, known, id))
    }
}

/// Mock implementation of JobRepository with optimistic locking
#[derive(Debug, Clone, Default)]
pub struct MockJobRepository {
    jobs: Arc<Mutex<HashMap<String, Job>>>,
    /// Number of upcoming `update` calls that lose a simulated race
    conflicts: Arc<Mutex<usize>>,
    update_calls: Arc<Mutex<usize>>,
}

impl MockJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_jobs(jobs: Vec<Job>) -> Self {
        let repo = Self::new();
        for job in jobs {
            repo.insert(job);
        }
        repo
    }

    /// Store a job as-is, bypassing version checks
    pub fn insert(&self, job: Job) {
        self.jobs.lock().unwrap().insert(job.id.clone(), job);
    }

    pub fn get(&self, id: &str) -> Option<Job> {
        self.jobs.lock().unwrap().get(id).cloned()
    }

    pub fn count(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    /// The next `count` updates find the row changed underneath them
    pub fn fail_next_updates(&self, count: usize) {
        *self.conflicts.lock().unwrap() = count;
    }

    pub fn update_calls(&self) -> usize {
        *self.update_calls.lock().unwrap()
    }
}

#[async_trait]
impl JobRepository for MockJobRepository {
    async fn create(&self, job: &Job) -> PlatformResult<Job> {
        let mut jobs = self.jobs.lock().unwrap();
        if jobs.contains_key(&job.id) {
            return Err(PlatformError::Conflict(format!("作业 {} 已存在", job.id)));
        }
        jobs.insert(job.id.clone(), job.clone());
        Ok(job.clone())
    }

    async fn get_by_id(&self, id: &str) -> PlatformResult<Option<Job>> {
        Ok(self.jobs.lock().unwrap().get(id).cloned())
    }

    async fn exists(&self, id: &str) -> PlatformResult<bool> {
        Ok(self.jobs.lock().unwrap().contains_key(id))
    }

    async fn update(&self, job: &Job) -> PlatformResult<Job> {
        *self.update_calls.lock().unwrap() += 1;
        let mut jobs = self.jobs.lock().unwrap();
        let stored = jobs
            .get_mut(&job.id)
            .ok_or_else(|| PlatformError::not_found(ResourceKind::Job, job.id.clone()))?;

        let mut conflicts = self.conflicts.lock().unwrap();
        if *conflicts > 0 {
            *conflicts -= 1;
            stored.audit = stored.audit.on_update(Utc::now());
            return Err(PlatformError::OptimisticLock { id: job.id.clone() });
        }

        if stored.audit.version != job.audit.version {
            return Err(PlatformError::OptimisticLock { id: job.id.clone() });
        }
        let mut updated = job.clone();
        updated.audit = job.audit.on_update(Utc::now());
        *stored = updated.clone();
        Ok(updated)
    }

    async fn update_batch(&self, batch: &[Job]) -> PlatformResult<Vec<String>> {
        let mut jobs = self.jobs.lock().unwrap();
        let now = Utc::now();
        let mut written = Vec::new();
        for job in batch {
            if let Some(stored) = jobs.get_mut(&job.id) {
                if stored.audit.version == job.audit.version {
                    let mut updated = job.clone();
                    updated.audit = job.audit.on_update(now);
                    *stored = updated;
                    written.push(job.id.clone());
                }
            }
        }
        Ok(written)
    }

    async fn find_stale(&self, cutoff: DateTime<Utc>) -> PlatformResult<Vec<Job>> {
        let jobs = self.jobs.lock().unwrap();
        let mut stale: Vec<Job> = jobs
            .values()
            .filter(|j| !j.is_terminal() && j.last_updated() < cutoff)
            .cloned()
            .collect();
        stale.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(stale)
    }

    async fn count_active_on_host(&self, host: &str) -> PlatformResult<usize> {
        let jobs = self.jobs.lock().unwrap();
        Ok(jobs
            .values()
            .filter(|j| !j.is_terminal() && j.host_name == host)
            .count())
    }

    async fn active_counts_by_host(&self) -> PlatformResult<Vec<(String, usize)>> {
        let jobs = self.jobs.lock().unwrap();
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for job in jobs.values().filter(|j| !j.is_terminal()) {
            *counts.entry(job.host_name.clone()).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }
}

/// Mock process manager recording every launch and kill
#[derive(Debug, Clone)]
pub struct MockProcessManager {
    launched: Arc<Mutex<Vec<String>>>,
    killed: Arc<Mutex<Vec<String>>>,
    launch_error: Arc<Mutex<Option<String>>>,
    kill_error: Arc<Mutex<Option<String>>>,
    next_handle: Arc<Mutex<i64>>,
}

impl MockProcessManager {
    pub fn new() -> Self {
        Self {
            launched: Arc::new(Mutex::new(Vec::new())),
            killed: Arc::new(Mutex::new(Vec::new())),
            launch_error: Arc::new(Mutex::new(None)),
            kill_error: Arc::new(Mutex::new(None)),
            next_handle: Arc::new(Mutex::new(1000)),
        }
    }

    pub fn fail_launch(&self, message: &str) {
        *self.launch_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn fail_kill(&self, message: &str) {
        *self.kill_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn launched_jobs(&self) -> Vec<String> {
        self.launched.lock().unwrap().clone()
    }

    pub fn killed_jobs(&self) -> Vec<String> {
        self.killed.lock().unwrap().clone()
    }

    pub fn launch_count(&self) -> usize {
        self.launched.lock().unwrap().len()
    }

    pub fn kill_count(&self) -> usize {
        self.killed.lock().unwrap().len()
    }
}

impl Default for MockProcessManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessManager for MockProcessManager {
    async fn launch(&self, context: LaunchContext<'_>) -> PlatformResult<i64> {
        if let Some(message) = self.launch_error.lock().unwrap().clone() {
            return Err(PlatformError::Server(message));
        }
        self.launched.lock().unwrap().push(context.job.id.clone());
        let mut handle = self.next_handle.lock().unwrap();
        *handle += 1;
        Ok(*handle)
    }

    async fn kill(&self, job: &Job) -> PlatformResult<()> {
        if let Some(message) = self.kill_error.lock().unwrap().clone() {
            return Err(PlatformError::Server(message));
        }
        self.killed.lock().unwrap().push(job.id.clone());
        Ok(())
    }

    async fn running_jobs(&self) -> Vec<String> {
        let killed = self.killed.lock().unwrap().clone();
        self.launched
            .lock()
            .unwrap()
            .iter()
            .filter(|id| !killed.contains(id))
            .cloned()
            .collect()
    }
}

/// Mock forward transport standing in for remote nodes
#[derive(Debug, Clone, Default)]
pub struct MockForwardTransport {
    submitted: Arc<Mutex<Vec<(String, JobRequest)>>>,
    kills: Arc<Mutex<Vec<(String, String)>>>,
    remote_jobs: Arc<Mutex<HashMap<String, Job>>>,
    unreachable: Arc<Mutex<bool>>,
}

impl MockForwardTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// The job a remote node returns when asked to kill it
    pub fn with_remote_job(self, job: Job) -> Self {
        self.remote_jobs.lock().unwrap().insert(job.id.clone(), job);
        self
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        *self.unreachable.lock().unwrap() = unreachable;
    }

    pub fn submitted(&self) -> Vec<(String, JobRequest)> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn kills(&self) -> Vec<(String, String)> {
        self.kills.lock().unwrap().clone()
    }
}

#[async_trait]
impl ForwardTransport for MockForwardTransport {
    async fn submit(&self, host: &str, request: &JobRequest) -> PlatformResult<String> {
        if *self.unreachable.lock().unwrap() {
            return Err(PlatformError::Network(format!("无法连接 {host}")));
        }
        self.submitted
            .lock()
            .unwrap()
            .push((host.to_string(), request.clone()));
        Ok(request
            .id
            .clone()
            .unwrap_or_else(|| format!("remote-{}", self.submitted.lock().unwrap().len())))
    }

    async fn kill(&self, host: &str, job: &Job) -> PlatformResult<Job> {
        let job_id = job.id.as_str();
        if *self.unreachable.lock().unwrap() {
            return Err(PlatformError::Network(format!("无法连接 {host}")));
        }
        self.kills
            .lock()
            .unwrap()
            .push((host.to_string(), job_id.to_string()));
        self.remote_jobs
            .lock()
            .unwrap()
            .get(job_id)
            .cloned()
            .ok_or_else(|| PlatformError::not_found(ResourceKind::Job, job_id))
    }
}

/// Metrics sink that counts increments per counter
#[derive(Debug, Clone, Default)]
pub struct RecordingMetricsSink {
    counts: Arc<Mutex<HashMap<JobCounter, u64>>>,
}

impl RecordingMetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, counter: JobCounter) -> u64 {
        self.counts
            .lock()
            .unwrap()
            .get(&counter)
            .copied()
            .unwrap_or(0)
    }
}

impl MetricsSink for RecordingMetricsSink {
    fn increment(&self, counter: JobCounter) {
        *self.counts.lock().unwrap().entry(counter).or_default() += 1;
    }
}

/// Node locator with fixed values
#[derive(Debug, Clone)]
pub struct StaticNodeLocator {
    pub host: String,
    pub port: u16,
    pub archive_root: String,
    pub peers: Vec<String>,
}

impl StaticNodeLocator {
    pub fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
            port: 8080,
            archive_root: "file:///archive".to_string(),
            peers: Vec::new(),
        }
    }

    pub fn with_peers(mut self, peers: &[&str]) -> Self {
        self.peers = peers.iter().map(|p| p.to_string()).collect();
        self
    }
}

impl NodeLocator for StaticNodeLocator {
    fn host_name(&self) -> &str {
        &self.host
    }

    fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    fn archive_uri(&self, job_id: &str) -> String {
        format!("{}/{}", self.archive_root, job_id)
    }

    fn peer_hosts(&self) -> Vec<String> {
        self.peers.clone()
    }
}
