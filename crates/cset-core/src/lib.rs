//! Cset Core Library
//!
//! Validates and executes declarative changeset files against a remote
//! changeset service, one file at a time, with task polling, variable
//! injection and run-level result aggregation.

pub mod api;
pub mod config;
pub mod error;
pub mod files;
pub mod operation;
pub mod options;
pub mod orchestrator;
pub mod payload;
pub mod poller;
pub mod types;
pub mod variables;

/// Re-exports of commonly used types
pub mod prelude {
    // Errors
    pub use crate::error::{DeployError, Result};

    // Configuration
    pub use crate::config::DeployConfig;
    pub use crate::options::{ExecutionOptions, ExecutionStrategy};

    // Files and documents
    pub use crate::files::FileResolver;
    pub use crate::payload::{DocumentCodec, prepare_payload};
    pub use crate::variables::VariableSet;

    // Remote service
    pub use crate::api::{HttpApi, RemoteApi, SubmitRequest};
    pub use crate::operation::ChangesetOperation;
    pub use crate::orchestrator::{Orchestrator, RunReport};
    pub use crate::poller::TaskPoller;

    // Types
    pub use crate::types::{
        ChangesetFile, ChangesetFormat, FileResult, FileStatus, OperationKind, TaskHandle,
        TaskOutcome,
    };
}
