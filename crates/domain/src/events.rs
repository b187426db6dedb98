//! 节点内部事件

use serde::{Deserialize, Serialize};

/// 作业进程退出通知，由进程管理器发出，节点据此落终态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobExit {
    pub job_id: String,
    pub exit_code: i32,
}
