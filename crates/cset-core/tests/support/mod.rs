//! Scripted in-memory changeset service for integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use cset_core::api::{RemoteApi, SubmitEnvelope, SubmitRequest, TaskStatusResponse};
use cset_core::error::{DeployError, Result};
use cset_core::options::ExecutionOptions;
use cset_core::types::{ChangesetFormat, OperationKind};
use serde_json::{Value, json};

/// One reply of the status endpoint.
#[derive(Debug, Clone)]
pub enum Step {
    Status(TaskStatusResponse),
    Transport,
    Http(u16),
}

impl Step {
    pub fn pending() -> Self {
        Step::Status(TaskStatusResponse::new("PENDING"))
    }

    pub fn started() -> Self {
        Step::Status(TaskStatusResponse::new("STARTED"))
    }

    pub fn success(result: Value) -> Self {
        Step::Status(TaskStatusResponse::new("SUCCESS").with_result(result))
    }

    pub fn valid() -> Self {
        Step::success(json!({"is_valid": true}))
    }

    pub fn invalid(errors: Value) -> Self {
        Step::success(json!({"is_valid": false, "errors": errors}))
    }

    pub fn failure(error: &str) -> Self {
        Step::Status(TaskStatusResponse::new("FAILURE").with_error(error))
    }

    pub fn revoked() -> Self {
        Step::Status(TaskStatusResponse::new("REVOKED"))
    }
}

/// What the service does with one matching submission.
#[derive(Debug, Clone)]
pub enum Script {
    /// Accept and answer polls in order; the last step repeats.
    Task(Vec<Step>),
    /// Reject the submission with this status.
    Reject(u16),
    /// Accept but answer with an envelope lacking the task id.
    NoTaskId,
}

#[derive(Debug, Clone)]
pub struct Submission {
    pub kind: OperationKind,
    pub format: ChangesetFormat,
    pub body: String,
    pub environment: Option<String>,
    pub task_id: Option<String>,
}

struct Rule {
    kind: OperationKind,
    marker: String,
    script: Script,
}

#[derive(Default)]
struct State {
    submissions: Vec<Submission>,
    tasks: HashMap<String, VecDeque<Step>>,
    polls: HashMap<String, usize>,
}

/// Fake [`RemoteApi`] whose answers are picked by operation kind and a
/// marker substring of the submitted body. Unmatched submissions succeed on
/// the first poll.
#[derive(Default)]
pub struct ScriptedApi {
    rules: Vec<Rule>,
    state: Mutex<State>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, kind: OperationKind, marker: &str, script: Script) -> Self {
        self.rules.push(Rule {
            kind,
            marker: marker.to_string(),
            script,
        });
        self
    }

    /// Script every submission of `kind`.
    pub fn on_any(self, kind: OperationKind, script: Script) -> Self {
        self.on(kind, "", script)
    }

    /// Register a bare task that can be polled without a submission.
    pub fn with_task(self, task_id: &str, steps: Vec<Step>) -> Self {
        self.state
            .lock()
            .unwrap()
            .tasks
            .insert(task_id.to_string(), steps.into());
        self
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.state.lock().unwrap().submissions.clone()
    }

    pub fn submitted(&self, kind: OperationKind) -> usize {
        self.submissions().iter().filter(|s| s.kind == kind).count()
    }

    pub fn polls(&self, task_id: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .polls
            .get(task_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_polls(&self) -> usize {
        self.state.lock().unwrap().polls.values().sum()
    }

    fn script_for(&self, kind: OperationKind, body: &str) -> Script {
        self.rules
            .iter()
            .find(|rule| rule.kind == kind && body.contains(&rule.marker))
            .map(|rule| rule.script.clone())
            .unwrap_or_else(|| match kind {
                OperationKind::Validate => Script::Task(vec![Step::valid()]),
                OperationKind::Execute => Script::Task(vec![Step::success(json!({}))]),
            })
    }
}

fn fault(step: &Step) -> Option<DeployError> {
    match step {
        Step::Status(_) => None,
        Step::Transport => Some(DeployError::Transport("connection reset".to_string())),
        Step::Http(status) => Some(DeployError::Http {
            status: *status,
            body: "scripted failure".to_string(),
        }),
    }
}

#[async_trait]
impl RemoteApi for ScriptedApi {
    async fn submit(&self, request: SubmitRequest<'_>) -> Result<SubmitEnvelope> {
        let script = self.script_for(request.kind, &request.body);
        let mut state = self.state.lock().unwrap();

        let task_id = match &script {
            Script::Task(_) => Some(format!(
                "{}-{}",
                request.kind.verb(),
                state.submissions.len() + 1
            )),
            Script::Reject(_) | Script::NoTaskId => None,
        };

        state.submissions.push(Submission {
            kind: request.kind,
            format: request.format,
            body: request.body,
            environment: request.environment.map(String::from),
            task_id: task_id.clone(),
        });

        match script {
            Script::Task(steps) => {
                let task_id = task_id.unwrap_or_default();
                state.tasks.insert(task_id.clone(), steps.into());
                Ok(SubmitEnvelope::with_task_id(task_id))
            }
            Script::Reject(status) => Err(DeployError::Http {
                status,
                body: "Forbidden".to_string(),
            }),
            Script::NoTaskId => Ok(SubmitEnvelope::default()),
        }
    }

    async fn task_status(&self, task_id: &str) -> Result<TaskStatusResponse> {
        let mut state = self.state.lock().unwrap();
        *state.polls.entry(task_id.to_string()).or_insert(0) += 1;

        let steps = state
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| DeployError::Http {
                status: 404,
                body: format!("unknown task {task_id}"),
            })?;

        let step = if steps.len() > 1 {
            steps.pop_front().unwrap()
        } else {
            steps.front().cloned().unwrap_or_else(Step::pending)
        };

        match fault(&step) {
            Some(error) => Err(error),
            None => match step {
                Step::Status(response) => Ok(response),
                _ => unreachable!(),
            },
        }
    }
}

/// Options pointed at a dummy service.
pub fn options() -> ExecutionOptions {
    ExecutionOptions::new("test-key", "https://deploy.example.com").unwrap()
}

/// Write a changeset file into `dir`.
pub fn write_changeset(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}
