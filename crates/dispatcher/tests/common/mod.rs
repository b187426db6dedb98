#![allow(dead_code)]

use std::sync::Arc;

use fedexec_dispatcher::admission::{AdmissionLimits, ExecutionStrategy};
use fedexec_dispatcher::execution::{DispatcherComponents, ExecutionDispatcher};
use fedexec_dispatcher::selection::FirstMatchSelector;
use fedexec_testing_utils::{
    ClusterBuilder, CommandBuilder, MockForwardTransport, MockJobRepository, MockProcessManager,
    MockRegistry, RecordingMetricsSink, StaticNodeLocator,
};

pub const LOCAL_HOST: &str = "node-a";

pub struct Harness {
    pub registry: MockRegistry,
    pub jobs: MockJobRepository,
    pub process_manager: MockProcessManager,
    pub transport: MockForwardTransport,
    pub metrics: RecordingMetricsSink,
    pub dispatcher: ExecutionDispatcher,
}

pub fn limits(max: usize, forward: usize, idle: usize, delta: usize) -> AdmissionLimits {
    AdmissionLimits {
        max_running_jobs: max,
        job_forward_threshold: forward,
        idle_host_threshold: idle,
        idle_host_threshold_delta: delta,
    }
}

/// 集群 A {prod, hadoop} 上有命令 C1 {hive}
pub fn hadoop_registry() -> MockRegistry {
    let registry = MockRegistry::new();
    registry.add_cluster(ClusterBuilder::new("A").with_tags(&["prod", "hadoop"]).build());
    registry.add_command(CommandBuilder::new("C1").with_tags(&["hive"]).build());
    registry.link("A", "C1");
    registry
}

pub struct HarnessBuilder {
    strategy: ExecutionStrategy,
    peers: Vec<&'static str>,
    transport: MockForwardTransport,
    jobs: MockJobRepository,
    heartbeat_max_attempts: u32,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            strategy: ExecutionStrategy::LocalAdmissionControl(limits(10, 8, 2, 2)),
            peers: vec![],
            transport: MockForwardTransport::new(),
            jobs: MockJobRepository::new(),
            heartbeat_max_attempts: 3,
        }
    }

    pub fn strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn peers(mut self, peers: &[&'static str]) -> Self {
        self.peers = peers.to_vec();
        self
    }

    pub fn transport(mut self, transport: MockForwardTransport) -> Self {
        self.transport = transport;
        self
    }

    pub fn jobs(mut self, jobs: MockJobRepository) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn heartbeat_max_attempts(mut self, attempts: u32) -> Self {
        self.heartbeat_max_attempts = attempts;
        self
    }

    pub fn build(self) -> Harness {
        let registry = hadoop_registry();
        let process_manager = MockProcessManager::new();
        let metrics = RecordingMetricsSink::new();
        let components = DispatcherComponents {
            clusters: Arc::new(registry.clone()),
            commands: Arc::new(registry.clone()),
            jobs: Arc::new(self.jobs.clone()),
            process_manager: Arc::new(process_manager.clone()),
            transport: Arc::new(self.transport.clone()),
            locator: Arc::new(StaticNodeLocator::new(LOCAL_HOST).with_peers(&self.peers)),
            metrics: Arc::new(metrics.clone()),
        };
        let dispatcher = ExecutionDispatcher::with_parts(
            components,
            self.strategy,
            Box::new(FirstMatchSelector),
            self.heartbeat_max_attempts,
        );
        Harness {
            registry,
            jobs: self.jobs,
            process_manager,
            transport: self.transport,
            metrics,
            dispatcher,
        }
    }
}

pub fn harness() -> Harness {
    HarnessBuilder::new().build()
}
