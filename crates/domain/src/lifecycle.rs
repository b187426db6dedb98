//! 作业生命周期状态机
//!
//! ```text
//! INIT ──▶ RUNNING ──▶ SUCCEEDED | FAILED | KILLED
//!   └──────────────▶ FAILED | KILLED
//! ```
//!
//! 终态之间不允许互相转换；重复进入同一终态只会刷新 `finished` 与
//! `status_msg`，这样一次迟到的 kill 确认依然能够覆盖先前记录的消息。

use chrono::{DateTime, Utc};
use fedexec_core::{PlatformError, PlatformResult};

use crate::entities::{Job, JobStatus};

pub const SUCCESS_EXIT_CODE: i32 = 0;
pub const JOB_KILLED_EXIT_CODE: i32 = 211;
pub const ZOMBIE_EXIT_CODE: i32 = 212;

pub const JOB_KILLED_MESSAGE: &str = "Job killed on user request";
pub const JOB_SUCCEEDED_MESSAGE: &str = "Job finished successfully";
pub const JOB_RUNNING_MESSAGE: &str = "Job is running";
pub const ZOMBIE_MESSAGE: &str = "Job has been marked as a zombie";

/// 已知的进程退出码
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    JobInterrupted,
    Success,
    CommandRunError,
    ClusterConfFilesCopyFailure,
    CommandConfFilesCopyFailure,
    ApplicationConfFilesCopyFailure,
    JobDependenciesCopyFailure,
    EnvVariablesSourceAndSetupFailure,
    JobKilled,
    ZombieJob,
}

impl ProcessStatus {
    const ALL: [ProcessStatus; 10] = [
        ProcessStatus::JobInterrupted,
        ProcessStatus::Success,
        ProcessStatus::CommandRunError,
        ProcessStatus::ClusterConfFilesCopyFailure,
        ProcessStatus::CommandConfFilesCopyFailure,
        ProcessStatus::ApplicationConfFilesCopyFailure,
        ProcessStatus::JobDependenciesCopyFailure,
        ProcessStatus::EnvVariablesSourceAndSetupFailure,
        ProcessStatus::JobKilled,
        ProcessStatus::ZombieJob,
    ];

    pub fn code(&self) -> i32 {
        match self {
            ProcessStatus::JobInterrupted => -1,
            ProcessStatus::Success => SUCCESS_EXIT_CODE,
            ProcessStatus::CommandRunError => 201,
            ProcessStatus::ClusterConfFilesCopyFailure => 202,
            ProcessStatus::CommandConfFilesCopyFailure => 203,
            ProcessStatus::ApplicationConfFilesCopyFailure => 204,
            ProcessStatus::JobDependenciesCopyFailure => 205,
            ProcessStatus::EnvVariablesSourceAndSetupFailure => 206,
            ProcessStatus::JobKilled => JOB_KILLED_EXIT_CODE,
            ProcessStatus::ZombieJob => ZOMBIE_EXIT_CODE,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ProcessStatus::JobInterrupted => "Job execution interrupted",
            ProcessStatus::Success => JOB_SUCCEEDED_MESSAGE,
            ProcessStatus::CommandRunError => "Command failed with non-zero exit code",
            ProcessStatus::ClusterConfFilesCopyFailure => "Failed copying cluster configuration files",
            ProcessStatus::CommandConfFilesCopyFailure => "Failed copying command configuration files",
            ProcessStatus::ApplicationConfFilesCopyFailure => {
                "Failed copying application configuration files"
            }
            ProcessStatus::JobDependenciesCopyFailure => "Failed copying job dependency files",
            ProcessStatus::EnvVariablesSourceAndSetupFailure => {
                "Failed sourcing environment setup files"
            }
            ProcessStatus::JobKilled => JOB_KILLED_MESSAGE,
            ProcessStatus::ZombieJob => ZOMBIE_MESSAGE,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|status| status.code() == code)
    }
}

/// 将退出码翻译为终态与消息
///
/// kill 码必须先于成功/失败分支判断：kill 路径与自然退出路径几乎同时触发时，
/// 只要观察到 kill 码，结果就是 KILLED。
pub fn finalize(exit_code: i32) -> (JobStatus, String) {
    if exit_code == JOB_KILLED_EXIT_CODE {
        return (JobStatus::Killed, JOB_KILLED_MESSAGE.to_string());
    }
    if exit_code == SUCCESS_EXIT_CODE {
        return (JobStatus::Succeeded, JOB_SUCCEEDED_MESSAGE.to_string());
    }
    let message = match ProcessStatus::from_code(exit_code) {
        Some(status) => status.message().to_string(),
        None => format!("Job failed with unknown exit code {exit_code}"),
    };
    (JobStatus::Failed, message)
}

/// 状态转换是否合法
pub fn can_transition(from: JobStatus, to: JobStatus) -> bool {
    use JobStatus::*;
    match (from, to) {
        (Init, Init | Running | Failed | Killed) => true,
        (Running, Running | Succeeded | Failed | Killed) => true,
        (current, next) if current.is_terminal() => current == next,
        _ => false,
    }
}

impl Job {
    /// 首次进入 INIT 时记录开始时间
    pub fn mark_initialized(&mut self, now: DateTime<Utc>) {
        if self.status == JobStatus::Init && self.started.is_none() {
            self.started = Some(now);
        }
    }

    pub fn set_status(
        &mut self,
        status: JobStatus,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> PlatformResult<()> {
        if !can_transition(self.status, status) {
            return Err(PlatformError::precondition(format!(
                "作业 {} 不能从 {} 转换到 {}",
                self.id, self.status, status
            )));
        }

        // 离开 INIT 时保证 started 已经记录
        if self.started.is_none() {
            self.started = Some(now);
        }

        self.status = status;
        self.status_msg = message.into();
        if status.is_terminal() {
            self.finished = Some(now);
        }
        Ok(())
    }

    /// 按退出码落终态并记录退出码
    pub fn apply_exit_code(&mut self, exit_code: i32, now: DateTime<Utc>) -> PlatformResult<()> {
        let (status, message) = finalize(exit_code);
        self.set_status(status, message, now)?;
        self.exit_code = Some(exit_code);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{JobRequest, ResourceHints};
    use crate::tags::{ClusterCriteria, Criterion, TagSet};
    use chrono::Duration;

    fn new_job(now: DateTime<Utc>) -> Job {
        let request = JobRequest {
            id: None,
            name: "report".to_string(),
            user: "bob".to_string(),
            version: "1".to_string(),
            description: None,
            command_args: vec![],
            cluster_criteria: ClusterCriteria::new(vec![Criterion::from_strs(["prod"]).unwrap()])
                .unwrap(),
            command_criterion: Criterion::from_strs(["spark"]).unwrap(),
            tags: TagSet::new(),
            resources: ResourceHints::default(),
            disable_log_archival: false,
            forwarded: false,
        };
        Job::from_request("job-1".to_string(), &request, now).unwrap()
    }

    #[test]
    fn test_finalize_translation() {
        assert_eq!(
            finalize(0),
            (JobStatus::Succeeded, "Job finished successfully".to_string())
        );
        assert_eq!(
            finalize(JOB_KILLED_EXIT_CODE),
            (JobStatus::Killed, "Job killed on user request".to_string())
        );
        assert_eq!(
            finalize(42),
            (JobStatus::Failed, "Job failed with unknown exit code 42".to_string())
        );
        assert_eq!(
            finalize(201),
            (JobStatus::Failed, "Command failed with non-zero exit code".to_string())
        );
        assert_eq!(finalize(ZOMBIE_EXIT_CODE).0, JobStatus::Failed);
    }

    #[test]
    fn test_process_status_codes_are_unique() {
        for status in ProcessStatus::ALL {
            assert_eq!(ProcessStatus::from_code(status.code()), Some(status));
        }
    }

    #[test]
    fn test_running_keeps_finished_unset() {
        let now = Utc::now();
        let mut job = new_job(now);
        job.set_status(JobStatus::Running, JOB_RUNNING_MESSAGE, now + Duration::seconds(1))
            .unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.started, Some(now));
        assert!(job.finished.is_none());
        assert_eq!(job.status_msg, JOB_RUNNING_MESSAGE);
    }

    #[test]
    fn test_terminal_sets_finished() {
        let now = Utc::now();
        let mut job = new_job(now);
        job.set_status(JobStatus::Running, JOB_RUNNING_MESSAGE, now).unwrap();
        let end = now + Duration::minutes(3);
        job.apply_exit_code(0, end).unwrap();
        assert_eq!(job.status, JobStatus::Succeeded);
        assert_eq!(job.finished, Some(end));
        assert_eq!(job.exit_code, Some(0));
    }

    #[test]
    fn test_init_can_fail_or_be_killed_but_not_succeed() {
        let now = Utc::now();
        assert!(new_job(now).set_status(JobStatus::Failed, "boom", now).is_ok());
        assert!(new_job(now).set_status(JobStatus::Killed, "kill", now).is_ok());
        assert!(new_job(now).set_status(JobStatus::Succeeded, "done", now).is_err());
    }

    #[test]
    fn test_terminal_states_are_final() {
        let now = Utc::now();
        for terminal in JobStatus::TERMINAL {
            for next in [
                JobStatus::Init,
                JobStatus::Running,
                JobStatus::Succeeded,
                JobStatus::Failed,
                JobStatus::Killed,
            ] {
                let mut job = new_job(now);
                job.set_status(JobStatus::Running, JOB_RUNNING_MESSAGE, now).unwrap();
                job.set_status(terminal, "end", now).unwrap();
                let result = job.set_status(next, "again", now);
                if next == terminal {
                    assert!(result.is_ok());
                } else {
                    assert!(result.is_err());
                    assert_eq!(job.status, terminal);
                }
            }
        }
    }

    #[test]
    fn test_repeated_kill_overwrites_message_and_finished() {
        let now = Utc::now();
        let mut job = new_job(now);
        job.set_status(JobStatus::Running, JOB_RUNNING_MESSAGE, now).unwrap();
        job.apply_exit_code(JOB_KILLED_EXIT_CODE, now).unwrap();
        let later = now + Duration::seconds(2);
        job.set_status(JobStatus::Killed, JOB_KILLED_MESSAGE, later).unwrap();
        assert_eq!(job.status, JobStatus::Killed);
        assert_eq!(job.finished, Some(later));
    }

    #[test]
    fn test_running_cannot_return_to_init() {
        let now = Utc::now();
        let mut job = new_job(now);
        job.set_status(JobStatus::Running, JOB_RUNNING_MESSAGE, now).unwrap();
        assert!(job.set_status(JobStatus::Init, "", now).is_err());
    }
}
