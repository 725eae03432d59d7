//! Error taxonomy for changeset deployment.
//!
//! Configuration and pre-flight faults surface before any file is processed.
//! Everything raised while a single file is in flight is caught by the
//! orchestrator and recorded as a failed [`FileResult`](crate::types::FileResult).

use crate::types::FileStatus;

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Bad or missing operator input.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pattern matched nothing, or a literal path does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network-level fault (connection refused, reset, timeout).
    #[error("Request failed: {0}")]
    Transport(String),

    /// The remote service answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The response envelope did not have the expected shape.
    #[error("Unexpected response: {0}")]
    Protocol(String),

    /// Changeset content could not be parsed or re-serialized.
    #[error("Invalid changeset document: {0}")]
    Document(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Aggregate failure of a whole run.
    #[error("{message}")]
    RunFailed { status: FileStatus, message: String },
}

impl DeployError {
    /// Only network faults are worth retrying; a non-success status or a
    /// malformed body will not fix itself on the next tick.
    pub fn is_transient(&self) -> bool {
        matches!(self, DeployError::Transport(_))
    }

    pub(crate) fn io(path: impl std::fmt::Display, source: std::io::Error) -> Self {
        DeployError::Io {
            path: path.to_string(),
            source,
        }
    }
}

pub type Result<T, E = DeployError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_errors_are_transient() {
        assert!(DeployError::Transport("connection reset".into()).is_transient());
        assert!(
            !DeployError::Http {
                status: 500,
                body: "boom".into()
            }
            .is_transient()
        );
        assert!(!DeployError::Protocol("missing task id".into()).is_transient());
    }

    #[test]
    fn http_error_embeds_status_and_body() {
        let err = DeployError::Http {
            status: 403,
            body: "Forbidden".into(),
        };
        assert_eq!(err.to_string(), "HTTP 403: Forbidden");
    }
}
