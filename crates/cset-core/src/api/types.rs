//! Response envelopes of the changeset service.
//!
//! Every nested field is optional on the wire; accessors match on absence
//! explicitly instead of assuming shape.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{DeployError, Result};

/// Body of a submission response: `{"data": {"attributes": {"task_id": ...}}}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitEnvelope {
    #[serde(default)]
    pub data: Option<EnvelopeData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvelopeData {
    #[serde(default)]
    pub attributes: Option<EnvelopeAttributes>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvelopeAttributes {
    /// Kept raw; services disagree on string versus numeric ids.
    #[serde(default)]
    pub task_id: Option<Value>,
}

impl SubmitEnvelope {
    pub fn with_task_id(task_id: impl Into<String>) -> Self {
        Self {
            data: Some(EnvelopeData {
                attributes: Some(EnvelopeAttributes {
                    task_id: Some(Value::String(task_id.into())),
                }),
            }),
        }
    }

    /// Extract the task id, failing on any missing level or an empty id.
    /// Numeric ids are accepted and rendered as text.
    pub fn task_id(&self) -> Result<String> {
        let data = match &self.data {
            Some(data) => data,
            None => return Err(missing("data")),
        };
        let attributes = match &data.attributes {
            Some(attributes) => attributes,
            None => return Err(missing("data.attributes")),
        };
        match &attributes.task_id {
            Some(Value::String(id)) if !id.trim().is_empty() => Ok(id.trim().to_string()),
            Some(Value::String(_)) => Err(DeployError::Protocol(
                "Submission response contained an empty task id".to_string(),
            )),
            Some(Value::Number(id)) => Ok(id.to_string()),
            Some(Value::Null) | None => Err(missing("data.attributes.task_id")),
            Some(other) => Err(DeployError::Protocol(format!(
                "Submission response task id must be a string or number, found {}",
                other
            ))),
        }
    }
}

fn missing(field: &str) -> DeployError {
    DeployError::Protocol(format!("Submission response is missing '{}'", field))
}

/// Body of a task status response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskStatusResponse {
    pub status: String,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

/// Remote task state as reported by the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteTaskState {
    Success,
    Failure,
    Revoked,
    /// `PENDING`, `STARTED`, `RETRY` and anything else not yet terminal.
    InProgress(String),
}

impl TaskStatusResponse {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            result: None,
            error: None,
        }
    }

    pub fn with_result(mut self, result: Value) -> Self {
        self.result = Some(result);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(Value::String(error.into()));
        self
    }

    pub fn state(&self) -> RemoteTaskState {
        match self.status.trim().to_ascii_uppercase().as_str() {
            "SUCCESS" => RemoteTaskState::Success,
            "FAILURE" => RemoteTaskState::Failure,
            "REVOKED" => RemoteTaskState::Revoked,
            other => RemoteTaskState::InProgress(other.to_string()),
        }
    }

    /// Task result, or an empty object when absent.
    pub fn result_or_empty(&self) -> Value {
        match &self.result {
            Some(Value::Null) | None => Value::Object(Map::new()),
            Some(result) => result.clone(),
        }
    }

    /// Error text, or `"Unknown error"` when absent.
    pub fn error_message(&self) -> String {
        match &self.error {
            Some(Value::String(message)) if !message.is_empty() => message.clone(),
            Some(Value::Null) | None => "Unknown error".to_string(),
            Some(Value::String(_)) => "Unknown error".to_string(),
            Some(other) => other.to_string(),
        }
    }
}
