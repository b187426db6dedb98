use serde::{Deserialize, Serialize};

use crate::config::{ConfigResult, ConfigValidator, ValidationUtils};

/// 本节点在集群中的身份与对外地址
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// 对外可达的主机名，留空时自动探测
    pub hostname: String,
    pub port: u16,
    pub bind_address: String,
    /// 作业输出归档根路径
    pub archive_root: String,
    /// 本地作业工作目录的根路径，每个作业一个子目录
    pub work_root: String,
    /// 集群中其他节点的主机名，用于空闲节点查找
    pub peers: Vec<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            hostname: String::new(),
            port: 8080,
            bind_address: "0.0.0.0".to_string(),
            archive_root: "file:///var/lib/fedexec/archive".to_string(),
            work_root: "/var/lib/fedexec/jobs".to_string(),
            peers: Vec::new(),
        }
    }
}

impl ConfigValidator for NodeConfig {
    fn validate(&self) -> ConfigResult<()> {
        ValidationUtils::validate_port(self.port)?;
        ValidationUtils::validate_not_empty(&self.bind_address, "node.bind_address")?;
        ValidationUtils::validate_not_empty(&self.archive_root, "node.archive_root")?;
        ValidationUtils::validate_not_empty(&self.work_root, "node.work_root")?;
        for peer in &self.peers {
            ValidationUtils::validate_not_empty(peer, "node.peers")?;
        }
        Ok(())
    }
}
