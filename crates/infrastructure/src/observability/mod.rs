//! Observability module
//!
//! 作业计数器通过 `metrics` 门面上报，由 Prometheus 导出器对外暴露。

pub mod metrics_collector;

pub use metrics_collector::{install_prometheus_recorder, MetricsCollector};
