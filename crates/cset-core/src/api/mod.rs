//! Remote changeset service contract.
//!
//! | Operation | Method | Path |
//! |---|---|---|
//! | Validate / Execute | POST | `/api/v1/change-set/change-set/{validate,execute}_{yaml,json}/` |
//! | Poll | GET | `/api/v1/task-status/{task_id}/` |
//!
//! Submissions accept an optional `?environment=<id-or-name>` selector. Every
//! request carries `Authorization: Api-Key <key>`.

pub mod http;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ChangesetFormat, OperationKind};

pub use http::HttpApi;
pub use types::{RemoteTaskState, SubmitEnvelope, TaskStatusResponse};

const CHANGESET_PREFIX: &str = "/api/v1/change-set/change-set";
/// Status endpoint prefix; the task id is appended as one escaped segment.
pub const TASK_STATUS_PREFIX: &str = "/api/v1/task-status";

/// One changeset submission.
#[derive(Debug, Clone)]
pub struct SubmitRequest<'a> {
    pub kind: OperationKind,
    pub format: ChangesetFormat,
    pub body: String,
    pub environment: Option<&'a str>,
}

impl SubmitRequest<'_> {
    pub fn path(&self) -> String {
        submit_path(self.kind, self.format)
    }
}

/// Submission endpoint path for an operation and dialect.
pub fn submit_path(kind: OperationKind, format: ChangesetFormat) -> String {
    format!("{}/{}_{}/", CHANGESET_PREFIX, kind.verb(), format.as_str())
}

/// Transport to the changeset service.
///
/// Implementations report network faults as [`DeployError::Transport`],
/// non-success statuses as [`DeployError::Http`] and unreadable bodies as
/// [`DeployError::Protocol`].
///
/// [`DeployError::Transport`]: crate::error::DeployError::Transport
/// [`DeployError::Http`]: crate::error::DeployError::Http
/// [`DeployError::Protocol`]: crate::error::DeployError::Protocol
#[async_trait]
pub trait RemoteApi: Send + Sync {
    async fn submit(&self, request: SubmitRequest<'_>) -> Result<SubmitEnvelope>;

    async fn task_status(&self, task_id: &str) -> Result<TaskStatusResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_paths_cover_both_dialects() {
        assert_eq!(
            submit_path(OperationKind::Validate, ChangesetFormat::Yaml),
            "/api/v1/change-set/change-set/validate_yaml/"
        );
        assert_eq!(
            submit_path(OperationKind::Validate, ChangesetFormat::Json),
            "/api/v1/change-set/change-set/validate_json/"
        );
        assert_eq!(
            submit_path(OperationKind::Execute, ChangesetFormat::Yaml),
            "/api/v1/change-set/change-set/execute_yaml/"
        );
        assert_eq!(
            submit_path(OperationKind::Execute, ChangesetFormat::Json),
            "/api/v1/change-set/change-set/execute_json/"
        );
    }
}
