//! Validate and execute a single changeset file.

use std::time::Duration;

use serde_json::{Map, Value, json};

use crate::api::{RemoteApi, SubmitRequest};
use crate::error::{DeployError, Result};
use crate::options::ExecutionOptions;
use crate::payload::prepare_payload;
use crate::poller::{POLL_INTERVAL, TaskPoller};
use crate::types::{ChangesetFile, FileResult, FileStatus, OperationKind, TaskHandle, TaskOutcome};

/// Generic message for a changeset the service judged invalid. Per-field
/// details are only logged.
pub const VALIDATION_FAILED: &str = "Changeset validation failed";

/// Submits one file and drives its task to completion.
pub struct ChangesetOperation<'a> {
    kind: OperationKind,
    api: &'a dyn RemoteApi,
    options: &'a ExecutionOptions,
    poll_interval: Duration,
}

impl<'a> ChangesetOperation<'a> {
    pub fn new(kind: OperationKind, api: &'a dyn RemoteApi, options: &'a ExecutionOptions) -> Self {
        Self {
            kind,
            api,
            options,
            poll_interval: POLL_INTERVAL,
        }
    }

    pub fn validate(api: &'a dyn RemoteApi, options: &'a ExecutionOptions) -> Self {
        Self::new(OperationKind::Validate, api, options)
    }

    pub fn execute(api: &'a dyn RemoteApi, options: &'a ExecutionOptions) -> Self {
        Self::new(OperationKind::Execute, api, options)
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Submit `file` and map the task's terminal state to a result.
    ///
    /// Transport, HTTP and envelope faults are returned as errors; remote
    /// verdicts (failure, revoked, timeout, invalid) come back as results.
    pub async fn run(&self, file: &ChangesetFile) -> Result<FileResult> {
        let name = file.file_name();
        let content = std::fs::read_to_string(file.path())
            .map_err(|e| DeployError::io(file.path().display(), e))?;
        let body = prepare_payload(&content, file.format(), self.options.variables.as_ref())?;

        let envelope = self
            .api
            .submit(SubmitRequest {
                kind: self.kind,
                format: file.format(),
                body,
                environment: self.options.environment.as_deref(),
            })
            .await?;
        let task_id = envelope.task_id()?;

        tracing::info!(file = %name, task_id = %task_id, "{} submitted", self.kind.label());

        if self.kind == OperationKind::Execute && !self.options.wait {
            return Ok(FileResult {
                file: name,
                status: FileStatus::Submitted,
                result: json!({ "task_id": task_id }),
                error: None,
            });
        }

        let handle = TaskHandle::new(task_id, self.kind.label());
        let outcome = TaskPoller::new(self.api)
            .with_interval(self.poll_interval)
            .poll(&handle, self.options.timeout)
            .await?;

        Ok(self.map_outcome(name, outcome))
    }

    fn map_outcome(&self, file: String, outcome: TaskOutcome) -> FileResult {
        let label = self.kind.label();
        match outcome {
            TaskOutcome::Timeout => FileResult {
                file,
                status: FileStatus::Timeout,
                result: empty(),
                error: Some(format!(
                    "{} did not complete within {} seconds",
                    label,
                    self.options.timeout_seconds()
                )),
            },
            TaskOutcome::Failure { error } => FileResult {
                file,
                status: FileStatus::Failure,
                result: empty(),
                error: Some(format!("{} failed: {}", label, error)),
            },
            TaskOutcome::Revoked => FileResult {
                file,
                status: FileStatus::Revoked,
                result: empty(),
                error: Some(format!("{} task was cancelled", label)),
            },
            TaskOutcome::Success { result } => match self.kind {
                OperationKind::Validate if !is_valid(&result) => {
                    report_validation_errors(&file, &result);
                    FileResult {
                        file,
                        status: FileStatus::Failure,
                        result,
                        error: Some(VALIDATION_FAILED.to_string()),
                    }
                }
                OperationKind::Validate | OperationKind::Execute => {
                    FileResult::success(file, result)
                }
            },
        }
    }
}

/// Only an explicit `is_valid: true` counts as a pass.
fn is_valid(result: &Value) -> bool {
    result
        .get("is_valid")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn report_validation_errors(file: &str, result: &Value) {
    match result.get("errors") {
        Some(Value::Array(errors)) if !errors.is_empty() => {
            for error in errors {
                tracing::error!(file = %file, "Validation error: {}", render(error));
            }
        }
        Some(Value::Object(fields)) if !fields.is_empty() => {
            for (field, error) in fields {
                tracing::error!(file = %file, field = %field, "Validation error: {}", render(error));
            }
        }
        _ => tracing::error!(file = %file, "Validation failed without error details"),
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn empty() -> Value {
    Value::Object(Map::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn is_valid_requires_explicit_true() {
        assert!(is_valid(&json!({"is_valid": true})));
        assert!(!is_valid(&json!({"is_valid": false})));
        assert!(!is_valid(&json!({})));
        assert!(!is_valid(&json!({"is_valid": "yes"})));
    }

    #[test]
    fn render_unquotes_strings() {
        assert_eq!(render(&json!("bad field")), "bad field");
        assert_eq!(render(&json!({"a": 1})), r#"{"a":1}"#);
    }
}
