//! Per-run execution options.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{DeployError, Result};
use crate::variables::VariableSet;

/// Default budget for each remote operation.
pub const DEFAULT_TIMEOUT_MINUTES: u64 = 10;

/// How multiple files are sequenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStrategy {
    /// Validate then execute each file before moving to the next.
    #[default]
    PerFile,
    /// Validate every file, then execute every file only if all passed.
    ValidateFirst,
}

impl ExecutionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStrategy::PerFile => "per_file",
            ExecutionStrategy::ValidateFirst => "validate_first",
        }
    }
}

impl fmt::Display for ExecutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionStrategy {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "per_file" => Ok(ExecutionStrategy::PerFile),
            "validate_first" => Ok(ExecutionStrategy::ValidateFirst),
            _ => Err(DeployError::Config(format!(
                "Unknown execution strategy: {}. Use 'per_file' or 'validate_first'",
                s
            ))),
        }
    }
}

/// Options shared by every operation in a run. Built once, then read-only.
#[derive(Clone)]
pub struct ExecutionOptions {
    pub api_key: String,
    pub base_url: Url,
    /// Target environment id or name
    pub environment: Option<String>,
    /// Validate before executing (per_file strategy)
    pub validate: bool,
    /// Only validate, never execute
    pub validate_only: bool,
    /// Poll execution tasks to completion; otherwise report SUBMITTED
    pub wait: bool,
    /// Budget for each validate/execute operation
    pub timeout: Duration,
    pub strategy: ExecutionStrategy,
    pub fail_fast: bool,
    pub variables: Option<VariableSet>,
}

impl ExecutionOptions {
    /// Create options with defaults, validating the credential and address.
    pub fn new(api_key: impl Into<String>, base_url: &str) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(DeployError::Config("API key must not be empty".to_string()));
        }

        Ok(Self {
            api_key,
            base_url: parse_base_url(base_url)?,
            environment: None,
            validate: true,
            validate_only: false,
            wait: true,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_MINUTES * 60),
            strategy: ExecutionStrategy::PerFile,
            fail_fast: true,
            variables: None,
        })
    }

    /// Set the target environment selector; blank clears it.
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        let environment = environment.into();
        self.environment = if environment.trim().is_empty() {
            None
        } else {
            Some(environment.trim().to_string())
        };
        self
    }

    pub fn with_validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    pub fn with_validate_only(mut self, validate_only: bool) -> Self {
        self.validate_only = validate_only;
        self
    }

    pub fn with_wait(mut self, wait: bool) -> Self {
        self.wait = wait;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the budget in minutes; values too large to express in seconds
    /// are rejected.
    pub fn with_timeout_minutes(self, minutes: u64) -> Result<Self> {
        let seconds = minutes.checked_mul(60).ok_or_else(|| {
            DeployError::Config(format!("Timeout of {} minutes is out of range", minutes))
        })?;
        Ok(self.with_timeout(Duration::from_secs(seconds)))
    }

    pub fn with_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn with_variables(mut self, variables: Option<VariableSet>) -> Self {
        self.variables = variables;
        self
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout.as_secs()
    }

    /// Reject combinations that cannot run.
    pub fn validate_options(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(DeployError::Config(
                "Poll timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for ExecutionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionOptions")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url.as_str())
            .field("environment", &self.environment)
            .field("validate", &self.validate)
            .field("validate_only", &self.validate_only)
            .field("wait", &self.wait)
            .field("timeout", &self.timeout)
            .field("strategy", &self.strategy)
            .field("fail_fast", &self.fail_fast)
            .field("variables", &self.variables.as_ref().map(VariableSet::len))
            .finish()
    }
}

/// Parse and check a base address; only http(s) is accepted.
pub fn parse_base_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(DeployError::Config("Base URL must not be empty".to_string()));
    }
    let url = Url::parse(raw)
        .map_err(|e| DeployError::Config(format!("Invalid base URL '{}': {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(DeployError::Config(format!(
                "Invalid base URL '{}': unsupported scheme '{}'",
                raw, other
            )));
        }
    }
    if url.host_str().is_none() {
        return Err(DeployError::Config(format!(
            "Invalid base URL '{}': missing host",
            raw
        )));
    }
    Ok(url)
}
