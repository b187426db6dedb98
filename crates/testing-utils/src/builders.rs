//! Test data builders for creating test entities
//!
//! This module provides builder patterns for creating test data with
//! sensible defaults and easy customization.

use chrono::{DateTime, Utc};
use fedexec_domain::entities::{
    Application, AuditMetadata, Cluster, ClusterStatus, Command, CommandStatus, Job, JobRequest,
    JobStatus, ResourceHints, TaggedResource,
};
use fedexec_domain::tags::{tag_set, ClusterCriteria, Criterion, TagSet};

fn tags(values: &[&str]) -> TagSet {
    tag_set(values.iter().copied()).unwrap()
}

/// Builder for creating test Cluster entities
///
/// `build` runs the system-tag normalizer, so the result carries
/// `id:` and `name:` tags like a registered cluster would.
pub struct ClusterBuilder {
    cluster: Cluster,
}

impl ClusterBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            cluster: Cluster {
                id: id.to_string(),
                name: format!("{id}-name"),
                user: "admin".to_string(),
                version: "1.0.0".to_string(),
                description: None,
                status: ClusterStatus::Up,
                tags: TagSet::new(),
                config_files: vec![],
                dependency_files: vec![],
                audit: AuditMetadata::on_create(Utc::now()),
            },
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.cluster.name = name.to_string();
        self
    }

    pub fn with_tags(mut self, values: &[&str]) -> Self {
        self.cluster.tags = tags(values);
        self
    }

    pub fn with_status(mut self, status: ClusterStatus) -> Self {
        self.cluster.status = status;
        self
    }

    pub fn build(mut self) -> Cluster {
        self.cluster.normalize_tags().unwrap();
        self.cluster
    }

    /// Build without system tags, as a client would submit it
    pub fn build_raw(self) -> Cluster {
        self.cluster
    }
}

/// Builder for creating test Command entities
pub struct CommandBuilder {
    command: Command,
}

impl CommandBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            command: Command {
                id: id.to_string(),
                name: format!("{id}-name"),
                user: "admin".to_string(),
                version: "1.0.0".to_string(),
                description: None,
                status: CommandStatus::Active,
                executable: "/bin/true".to_string(),
                check_delay_ms: 1000,
                tags: TagSet::new(),
                config_files: vec![],
                dependency_files: vec![],
                audit: AuditMetadata::on_create(Utc::now()),
            },
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.command.name = name.to_string();
        self
    }

    pub fn with_tags(mut self, values: &[&str]) -> Self {
        self.command.tags = tags(values);
        self
    }

    pub fn with_status(mut self, status: CommandStatus) -> Self {
        self.command.status = status;
        self
    }

    pub fn with_executable(mut self, executable: &str) -> Self {
        self.command.executable = executable.to_string();
        self
    }

    pub fn build(mut self) -> Command {
        self.command.normalize_tags().unwrap();
        self.command
    }

    pub fn build_raw(self) -> Command {
        self.command
    }
}

/// Builder for creating test Application entities
pub struct ApplicationBuilder {
    application: Application,
}

impl ApplicationBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            application: Application {
                id: id.to_string(),
                name: format!("{id}-name"),
                user: "admin".to_string(),
                version: "1.0.0".to_string(),
                status: CommandStatus::Active,
                tags: TagSet::new(),
                config_files: vec![],
                dependency_files: vec![],
                audit: AuditMetadata::on_create(Utc::now()),
            },
        }
    }

    pub fn with_tags(mut self, values: &[&str]) -> Self {
        self.application.tags = tags(values);
        self
    }

    pub fn build(mut self) -> Application {
        self.application.normalize_tags().unwrap();
        self.application
    }

    pub fn build_raw(self) -> Application {
        self.application
    }
}

/// Builder for creating test JobRequest values
pub struct JobRequestBuilder {
    request: JobRequest,
}

impl JobRequestBuilder {
    pub fn new() -> Self {
        Self {
            request: JobRequest {
                id: None,
                name: "test_job".to_string(),
                user: "tester".to_string(),
                version: "1".to_string(),
                description: None,
                command_args: vec![],
                cluster_criteria: ClusterCriteria::new(vec![Criterion::from_strs(["prod"]).unwrap()])
                    .unwrap(),
                command_criterion: Criterion::from_strs(["hive"]).unwrap(),
                tags: TagSet::new(),
                resources: ResourceHints::default(),
                disable_log_archival: false,
                forwarded: false,
            },
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.request.id = Some(id.to_string());
        self
    }

    /// Cluster criteria in priority order
    pub fn with_cluster_criteria(mut self, tiers: &[&[&str]]) -> Self {
        let criteria = tiers
            .iter()
            .map(|tier| Criterion::from_strs(tier.iter().copied()).unwrap())
            .collect();
        self.request.cluster_criteria = ClusterCriteria::new(criteria).unwrap();
        self
    }

    pub fn with_command_criterion(mut self, values: &[&str]) -> Self {
        self.request.command_criterion = Criterion::from_strs(values.iter().copied()).unwrap();
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.request.name = name.to_string();
        self
    }

    pub fn with_tags(mut self, values: &[&str]) -> Self {
        self.request.tags = tags(values);
        self
    }

    pub fn with_args(mut self, args: &[&str]) -> Self {
        self.request.command_args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn disable_log_archival(mut self) -> Self {
        self.request.disable_log_archival = true;
        self
    }

    pub fn forwarded(mut self) -> Self {
        self.request.forwarded = true;
        self
    }

    pub fn build(self) -> JobRequest {
        self.request
    }
}

impl Default for JobRequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating test Job entities
///
/// Defaults to a RUNNING job launched on `node-a` with handle 4242.
pub struct JobBuilder {
    job: Job,
}

impl JobBuilder {
    pub fn new(id: &str) -> Self {
        let now = Utc::now();
        let mut job =
            Job::from_request(id.to_string(), &JobRequestBuilder::new().build(), now).unwrap();
        job.status = JobStatus::Running;
        job.status_msg = "Job is running".to_string();
        job.process_handle = 4242;
        job.host_name = "node-a".to_string();
        job.kill_uri = format!("http://node-a:8080/api/v1/jobs/{id}");
        job.output_uri = format!("http://node-a:8080/api/v1/jobs/{id}/output");
        Self { job }
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.job.status = status;
        if status == JobStatus::Init {
            self.job.process_handle = -1;
        }
        if status.is_terminal() {
            self.job.finished = Some(self.job.audit.updated);
        }
        self
    }

    pub fn with_handle(mut self, handle: i64) -> Self {
        self.job.process_handle = handle;
        self
    }

    /// Place the job on `host`, rewriting its kill and output URIs
    pub fn on_host(mut self, host: &str) -> Self {
        self.job.host_name = host.to_string();
        self.job.kill_uri = format!("http://{host}:8080/api/v1/jobs/{}", self.job.id);
        self.job.output_uri = format!("http://{host}:8080/api/v1/jobs/{}/output", self.job.id);
        self
    }

    pub fn with_kill_uri(mut self, uri: &str) -> Self {
        self.job.kill_uri = uri.to_string();
        self
    }

    pub fn updated_at(mut self, at: DateTime<Utc>) -> Self {
        self.job.audit.updated = at;
        self
    }

    pub fn disable_log_archival(mut self) -> Self {
        self.job.disable_log_archival = true;
        self
    }

    pub fn build(self) -> Job {
        self.job
    }
}
