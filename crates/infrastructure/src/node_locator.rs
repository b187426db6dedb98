use fedexec_core::config::NodeConfig;
use fedexec_core::{PlatformError, PlatformResult};
use fedexec_domain::ports::NodeLocator;
use tracing::info;

/// 由节点配置与系统主机名确定的本节点位置
#[derive(Debug, Clone)]
pub struct SystemNodeLocator {
    host_name: String,
    port: u16,
    archive_root: String,
    peers: Vec<String>,
}

impl SystemNodeLocator {
    pub fn from_config(config: &NodeConfig) -> PlatformResult<Self> {
        let host_name = if config.hostname.trim().is_empty() {
            hostname::get()
                .map_err(|e| PlatformError::Configuration(format!("获取主机名失败: {e}")))?
                .to_string_lossy()
                .into_owned()
        } else {
            config.hostname.trim().to_string()
        };

        let peers = config
            .peers
            .iter()
            .map(|peer| peer.trim().to_string())
            .filter(|peer| !peer.is_empty() && *peer != host_name)
            .collect();

        info!("本节点主机名: {}，端口 {}", host_name, config.port);
        Ok(Self {
            host_name,
            port: config.port,
            archive_root: config.archive_root.trim_end_matches('/').to_string(),
            peers,
        })
    }
}

impl NodeLocator for SystemNodeLocator {
    fn host_name(&self) -> &str {
        &self.host_name
    }

    fn base_url(&self) -> String {
        format!("http://{}:{}", self.host_name, self.port)
    }

    fn archive_uri(&self, job_id: &str) -> String {
        format!("{}/{}", self.archive_root, job_id)
    }

    fn peer_hosts(&self) -> Vec<String> {
        self.peers.clone()
    }
}
