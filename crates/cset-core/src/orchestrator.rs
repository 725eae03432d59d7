//! Multi-file sequencing and result aggregation.
//!
//! Files are processed strictly one at a time: the target service serializes
//! mutations per environment and must never see overlapping submissions.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::api::RemoteApi;
use crate::error::{DeployError, Result};
use crate::operation::ChangesetOperation;
use crate::options::{ExecutionOptions, ExecutionStrategy};
use crate::poller::POLL_INTERVAL;
use crate::types::{ChangesetFile, FileResult, FileStatus, OperationKind, worst_status};

/// Outcome of a whole run, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub results: Vec<FileResult>,
}

impl RunReport {
    pub fn new(results: Vec<FileResult>) -> Self {
        Self { results }
    }

    /// Worst per-file status; `SUCCESS` for an empty run.
    pub fn status(&self) -> FileStatus {
        worst_status(&self.results)
    }

    pub fn is_failed(&self) -> bool {
        self.status().is_failure()
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileResult> {
        self.results.iter().filter(|r| r.status.is_failure())
    }

    /// Raise the run-level error if any file failed.
    ///
    /// A single failing file is reported with its own error text; several are
    /// summarized by count.
    pub fn ensure_success(&self) -> Result<()> {
        let status = self.status();
        if !status.is_failure() {
            return Ok(());
        }

        let failures: Vec<&FileResult> = self.failures().collect();
        let message = match failures.as_slice() {
            [only] => only
                .error
                .clone()
                .unwrap_or_else(|| format!("{} finished with status {}", only.file, only.status)),
            many => format!(
                "{} of {} changeset files failed",
                many.len(),
                self.results.len()
            ),
        };
        Err(DeployError::RunFailed { status, message })
    }
}

/// Append a result and decide whether to stop.
///
/// Stopping depends only on the latest result and the fail-fast flag.
pub fn record(
    mut results: Vec<FileResult>,
    result: FileResult,
    fail_fast: bool,
) -> (Vec<FileResult>, bool) {
    let stop = fail_fast && result.status.is_failure();
    results.push(result);
    (results, stop)
}

/// A validation that blocked execution counts as a failure, whatever its
/// terminal state. The original error text is kept.
fn blocking_failure(mut result: FileResult) -> FileResult {
    if matches!(result.status, FileStatus::Timeout | FileStatus::Revoked) {
        if result.error.is_none() {
            result.error = Some(format!("Validation ended with status {}", result.status));
        }
        result.status = FileStatus::Failure;
    }
    result
}

/// Sequences changeset operations over a resolved file list.
pub struct Orchestrator {
    api: Arc<dyn RemoteApi>,
    options: ExecutionOptions,
    poll_interval: Duration,
}

impl Orchestrator {
    pub fn new(api: Arc<dyn RemoteApi>, options: ExecutionOptions) -> Self {
        Self {
            api,
            options,
            poll_interval: POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Process `files` under the configured strategy.
    pub async fn run(&self, files: &[ChangesetFile]) -> RunReport {
        tracing::info!(
            files = files.len(),
            strategy = %self.options.strategy,
            fail_fast = self.options.fail_fast,
            validate_only = self.options.validate_only,
            "Starting changeset run"
        );

        let results = match self.options.strategy {
            ExecutionStrategy::PerFile => self.run_per_file(files).await,
            ExecutionStrategy::ValidateFirst => self.run_validate_first(files).await,
        };

        let report = RunReport::new(results);
        tracing::info!(status = %report.status(), files = report.results.len(), "Run finished");
        report
    }

    async fn run_per_file(&self, files: &[ChangesetFile]) -> Vec<FileResult> {
        let mut results = Vec::with_capacity(files.len());
        for file in files {
            let result = self.process_file(file).await;
            let (next, stop) = record(results, result, self.options.fail_fast);
            results = next;
            if stop {
                tracing::warn!(file = %file.file_name(), "Stopping after failure (fail-fast)");
                break;
            }
        }
        results
    }

    /// Validate (if enabled), stop on a failed validation, then execute.
    async fn process_file(&self, file: &ChangesetFile) -> FileResult {
        if self.options.validate_only {
            return self.attempt(OperationKind::Validate, file).await;
        }
        if self.options.validate {
            let validation = self.attempt(OperationKind::Validate, file).await;
            if validation.status != FileStatus::Success {
                return validation;
            }
        }
        self.attempt(OperationKind::Execute, file).await
    }

    async fn run_validate_first(&self, files: &[ChangesetFile]) -> Vec<FileResult> {
        let validation = self.run_phase(OperationKind::Validate, files).await;
        if self.options.validate_only {
            return validation;
        }

        let invalid = validation
            .iter()
            .filter(|r| r.status != FileStatus::Success)
            .count();
        if invalid > 0 {
            tracing::error!(
                invalid,
                validated = validation.len(),
                "Validation failed; no changeset will be executed"
            );
            return validation.into_iter().map(blocking_failure).collect();
        }

        self.run_phase(OperationKind::Execute, files).await
    }

    async fn run_phase(&self, kind: OperationKind, files: &[ChangesetFile]) -> Vec<FileResult> {
        tracing::info!(phase = %kind, files = files.len(), "Starting phase");
        let mut results = Vec::with_capacity(files.len());
        for file in files {
            let result = self.attempt(kind, file).await;
            let (next, stop) = record(results, result, self.options.fail_fast);
            results = next;
            if stop {
                tracing::warn!(
                    phase = %kind,
                    file = %file.file_name(),
                    "Stopping phase after failure (fail-fast)"
                );
                break;
            }
        }
        results
    }

    /// Run one operation, folding any error into a failed result.
    async fn attempt(&self, kind: OperationKind, file: &ChangesetFile) -> FileResult {
        tracing::info!(file = %file.file_name(), format = %file.format(), "{} started", kind.label());

        let operation = ChangesetOperation::new(kind, self.api.as_ref(), &self.options)
            .with_poll_interval(self.poll_interval);

        match operation.run(file).await {
            Ok(result) => {
                if result.status == FileStatus::Success {
                    tracing::info!(file = %result.file, "{} succeeded", kind.label());
                } else {
                    tracing::error!(
                        file = %result.file,
                        status = %result.status,
                        error = result.error.as_deref().unwrap_or(""),
                        "{} did not succeed",
                        kind.label()
                    );
                }
                result
            }
            Err(e) => {
                tracing::error!(file = %file.file_name(), error = %e, "{} failed", kind.label());
                FileResult::failure(file.file_name(), e.to_string())
            }
        }
    }
}
