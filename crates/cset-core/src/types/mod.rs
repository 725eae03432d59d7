//! Shared core types used across resolution, submission and aggregation.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Document dialect of a changeset file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangesetFormat {
    /// Block-structured dialect.
    Yaml,
    /// Nested-object dialect.
    Json,
}

impl ChangesetFormat {
    /// `.json` selects JSON; every other extension, known or not, is YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ChangesetFormat::Json,
            _ => ChangesetFormat::Yaml,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangesetFormat::Yaml => "yaml",
            ChangesetFormat::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ChangesetFormat::Yaml => "application/x-yaml",
            ChangesetFormat::Json => "application/json",
        }
    }
}

impl fmt::Display for ChangesetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote operation applied to a changeset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Validate,
    Execute,
}

impl OperationKind {
    /// Name used in task diagnostics and timeout/cancel messages.
    pub fn label(&self) -> &'static str {
        match self {
            OperationKind::Validate => "Validation",
            OperationKind::Execute => "Execution",
        }
    }

    /// Path segment verb of the submission endpoint.
    pub fn verb(&self) -> &'static str {
        match self {
            OperationKind::Validate => "validate",
            OperationKind::Execute => "execute",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A resolved changeset file. Immutable after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangesetFile {
    path: PathBuf,
    format: ChangesetFormat,
}

impl ChangesetFile {
    /// The path is expected to be absolute already.
    pub fn new(path: PathBuf) -> Self {
        let format = ChangesetFormat::from_path(&path);
        Self { path, format }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> ChangesetFormat {
        self.format
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Per-file status, declared best to worst so `Ord` follows severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileStatus {
    Success,
    Submitted,
    Revoked,
    Timeout,
    Failure,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Success => "SUCCESS",
            FileStatus::Submitted => "SUBMITTED",
            FileStatus::Revoked => "REVOKED",
            FileStatus::Timeout => "TIMEOUT",
            FileStatus::Failure => "FAILURE",
        }
    }

    /// Statuses that fail a run.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            FileStatus::Failure | FileStatus::Timeout | FileStatus::Revoked
        )
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Worst status across results; an empty list is a success.
pub fn worst_status(results: &[FileResult]) -> FileStatus {
    results
        .iter()
        .map(|r| r.status)
        .max()
        .unwrap_or(FileStatus::Success)
}

/// Outcome of processing one file, in run output order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileResult {
    /// Basename of the changeset file
    pub file: String,
    pub status: FileStatus,
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Option<String>,
}

impl FileResult {
    pub fn success(file: impl Into<String>, result: Value) -> Self {
        Self {
            file: file.into(),
            status: FileStatus::Success,
            result,
            error: None,
        }
    }

    pub fn failure(file: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            status: FileStatus::Failure,
            result: Value::Object(Map::new()),
            error: Some(error.into()),
        }
    }
}

/// A remote task to drive to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskHandle {
    pub task_id: String,
    /// Human-readable operation name, diagnostics only
    pub label: String,
}

impl TaskHandle {
    pub fn new(task_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            label: label.into(),
        }
    }
}

/// Terminal state reached by the poller.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    Success { result: Value },
    Failure { error: String },
    Revoked,
    Timeout,
}
