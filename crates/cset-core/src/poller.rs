//! Remote task polling.
//!
//! A task starts out polling and ends in exactly one of success, failure,
//! revoked or timeout. Each tick sleeps one interval, charges it against the
//! budget, then asks for the task status. Network faults are logged and the
//! loop carries on; a non-success status response aborts the operation.

use std::time::Duration;

use crate::api::{RemoteApi, RemoteTaskState};
use crate::error::Result;
use crate::types::{TaskHandle, TaskOutcome};

/// Fixed interval between status checks.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Drives a single remote task to a terminal outcome.
pub struct TaskPoller<'a> {
    api: &'a dyn RemoteApi,
    interval: Duration,
}

impl<'a> TaskPoller<'a> {
    pub fn new(api: &'a dyn RemoteApi) -> Self {
        Self {
            api,
            interval: POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Poll until the task reaches a terminal state or `timeout` is used up.
    ///
    /// Only interval sleeps count toward the budget; time spent waiting on a
    /// response does not.
    pub async fn poll(&self, handle: &TaskHandle, timeout: Duration) -> Result<TaskOutcome> {
        let mut elapsed = Duration::ZERO;
        let mut attempts = 0u32;

        while elapsed < timeout {
            tokio::time::sleep(self.interval).await;
            elapsed += self.interval;
            attempts += 1;

            let response = match self.api.task_status(&handle.task_id).await {
                Ok(response) => response,
                Err(e) if e.is_transient() => {
                    tracing::warn!(
                        task_id = %handle.task_id,
                        label = %handle.label,
                        attempt = attempts,
                        error = %e,
                        "Transient error while polling task status, retrying"
                    );
                    continue;
                }
                Err(e) => return Err(e),
            };

            match response.state() {
                RemoteTaskState::Success => {
                    tracing::info!(
                        task_id = %handle.task_id,
                        label = %handle.label,
                        attempts,
                        "Task succeeded"
                    );
                    return Ok(TaskOutcome::Success {
                        result: response.result_or_empty(),
                    });
                }
                RemoteTaskState::Failure => {
                    return Ok(TaskOutcome::Failure {
                        error: response.error_message(),
                    });
                }
                RemoteTaskState::Revoked => return Ok(TaskOutcome::Revoked),
                RemoteTaskState::InProgress(state) => {
                    tracing::debug!(
                        task_id = %handle.task_id,
                        label = %handle.label,
                        state = %state,
                        elapsed_secs = elapsed.as_secs(),
                        "Task still running"
                    );
                }
            }
        }

        tracing::warn!(
            task_id = %handle.task_id,
            label = %handle.label,
            timeout_secs = timeout.as_secs(),
            "Task did not finish before timeout"
        );
        Ok(TaskOutcome::Timeout)
    }
}
