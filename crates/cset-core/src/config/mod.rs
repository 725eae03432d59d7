//! Operator configuration.
//!
//! Layers, lowest precedence first:
//! - Global: `<config_dir>/cset/cset.toml`
//! - Project: `./cset.toml` (or an explicit `--config` file)
//! - Overrides: environment variables and command-line flags
//!
//! A later layer replaces a field only when it sets it.

pub mod parser;
pub mod paths;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DeployError, Result};
use crate::options::{DEFAULT_TIMEOUT_MINUTES, ExecutionOptions, ExecutionStrategy};
use crate::variables::VariableSet;

pub use parser::{parse_config_file, parse_config_str};
pub use paths::{CONFIG_FILE_NAME, global_config_path, project_config_path};

/// One configuration layer. Every field is optional so layers can be merged.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeployConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub environment: Option<String>,
    /// Changeset path or glob
    pub pattern: Option<String>,
    pub validate: Option<bool>,
    pub validate_only: Option<bool>,
    pub wait: Option<bool>,
    pub timeout_minutes: Option<u64>,
    pub strategy: Option<ExecutionStrategy>,
    pub fail_fast: Option<bool>,
    /// Raw KEY=VALUE block
    pub variables: Option<String>,
}

impl fmt::Debug for DeployConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("environment", &self.environment)
            .field("pattern", &self.pattern)
            .field("validate", &self.validate)
            .field("validate_only", &self.validate_only)
            .field("wait", &self.wait)
            .field("timeout_minutes", &self.timeout_minutes)
            .field("strategy", &self.strategy)
            .field("fail_fast", &self.fail_fast)
            .field("variables", &self.variables.as_ref().map(|v| v.lines().count()))
            .finish()
    }
}

impl DeployConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overlay `layer` on top of this config.
    pub fn merge(&mut self, layer: DeployConfig) {
        if layer.api_key.is_some() {
            self.api_key = layer.api_key;
        }
        if layer.base_url.is_some() {
            self.base_url = layer.base_url;
        }
        if layer.environment.is_some() {
            self.environment = layer.environment;
        }
        if layer.pattern.is_some() {
            self.pattern = layer.pattern;
        }
        if layer.validate.is_some() {
            self.validate = layer.validate;
        }
        if layer.validate_only.is_some() {
            self.validate_only = layer.validate_only;
        }
        if layer.wait.is_some() {
            self.wait = layer.wait;
        }
        if layer.timeout_minutes.is_some() {
            self.timeout_minutes = layer.timeout_minutes;
        }
        if layer.strategy.is_some() {
            self.strategy = layer.strategy;
        }
        if layer.fail_fast.is_some() {
            self.fail_fast = layer.fail_fast;
        }
        if layer.variables.is_some() {
            self.variables = layer.variables;
        }
    }

    /// Build the immutable run options, applying defaults.
    pub fn to_options(&self) -> Result<ExecutionOptions> {
        let api_key = self.api_key.as_deref().unwrap_or_default();
        if api_key.trim().is_empty() {
            return Err(DeployError::Config(
                "Missing API key (set CSET_API_KEY or pass --api-key)".to_string(),
            ));
        }
        let base_url = self.base_url.as_deref().unwrap_or_default();
        if base_url.trim().is_empty() {
            return Err(DeployError::Config(
                "Missing base URL (set CSET_BASE_URL or base_url in cset.toml)".to_string(),
            ));
        }

        let timeout_minutes = self.timeout_minutes.unwrap_or(DEFAULT_TIMEOUT_MINUTES);
        if timeout_minutes == 0 {
            return Err(DeployError::Config(
                "timeout_minutes must be greater than zero".to_string(),
            ));
        }

        let variables = match self.variables.as_deref() {
            Some(raw) => VariableSet::parse(raw)?,
            None => None,
        };

        let options = ExecutionOptions::new(api_key.trim(), base_url)?
            .with_environment(self.environment.clone().unwrap_or_default())
            .with_validate(self.validate.unwrap_or(true))
            .with_validate_only(self.validate_only.unwrap_or(false))
            .with_wait(self.wait.unwrap_or(true))
            .with_timeout_minutes(timeout_minutes)?
            .with_strategy(self.strategy.unwrap_or_default())
            .with_fail_fast(self.fail_fast.unwrap_or(true))
            .with_variables(variables);
        options.validate_options()?;
        Ok(options)
    }

    /// The file pattern, or a config error when none was given.
    pub fn require_pattern(&self) -> Result<&str> {
        match self.pattern.as_deref().map(str::trim) {
            Some(pattern) if !pattern.is_empty() => Ok(pattern),
            _ => Err(DeployError::Config(
                "File pattern must not be empty".to_string(),
            )),
        }
    }
}

/// Load and merge the global and project layers.
///
/// Missing files are skipped, unless `project` was named explicitly.
pub fn load_layered(
    global: Option<&Path>,
    project: &Path,
    project_required: bool,
) -> Result<DeployConfig> {
    let mut config = DeployConfig::new();

    if let Some(global) = global
        && global.is_file()
    {
        tracing::debug!(path = %global.display(), "Loading global config");
        config.merge(parse_config_file(global)?);
    }

    if project.is_file() {
        tracing::debug!(path = %project.display(), "Loading project config");
        config.merge(parse_config_file(project)?);
    } else if project_required {
        return Err(DeployError::NotFound(format!(
            "Config file does not exist: {}",
            project.display()
        )));
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn base() -> DeployConfig {
        DeployConfig {
            api_key: Some("key".to_string()),
            base_url: Some("https://deploy.example.com".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn merge_overrides_only_set_fields() {
        let mut config = DeployConfig {
            environment: Some("staging".to_string()),
            fail_fast: Some(false),
            ..base()
        };
        config.merge(DeployConfig {
            environment: Some("prod".to_string()),
            ..Default::default()
        });

        assert_eq!(config.environment.as_deref(), Some("prod"));
        assert_eq!(config.fail_fast, Some(false));
        assert_eq!(config.api_key.as_deref(), Some("key"));
    }

    #[test]
    fn to_options_applies_defaults() {
        let options = base().to_options().unwrap();
        assert!(options.validate);
        assert!(options.fail_fast);
        assert!(options.wait);
        assert_eq!(options.timeout, Duration::from_secs(600));
        assert_eq!(options.strategy, ExecutionStrategy::PerFile);
        assert!(options.variables.is_none());
    }

    #[test]
    fn to_options_converts_minutes_and_variables() {
        let options = DeployConfig {
            timeout_minutes: Some(2),
            variables: Some("A=1\nB=2".to_string()),
            strategy: Some(ExecutionStrategy::ValidateFirst),
            ..base()
        }
        .to_options()
        .unwrap();

        assert_eq!(options.timeout_seconds(), 120);
        assert_eq!(options.variables.unwrap().len(), 2);
        assert_eq!(options.strategy, ExecutionStrategy::ValidateFirst);
    }

    #[test]
    fn missing_credentials_are_config_errors() {
        let no_key = DeployConfig {
            api_key: None,
            ..base()
        };
        assert!(matches!(no_key.to_options(), Err(DeployError::Config(_))));

        let no_url = DeployConfig {
            base_url: None,
            ..base()
        };
        assert!(matches!(no_url.to_options(), Err(DeployError::Config(_))));
    }

    #[test]
    fn zero_timeout_is_config_error() {
        let config = DeployConfig {
            timeout_minutes: Some(0),
            ..base()
        };
        assert!(matches!(config.to_options(), Err(DeployError::Config(_))));
    }

    #[test]
    fn overflowing_timeout_is_config_error() {
        let config = DeployConfig {
            timeout_minutes: Some(u64::MAX),
            ..base()
        };
        assert!(matches!(config.to_options(), Err(DeployError::Config(_))));
    }

    #[test]
    fn malformed_variables_are_config_errors() {
        let config = DeployConfig {
            variables: Some("NO_EQUALS".to_string()),
            ..base()
        };
        assert!(matches!(config.to_options(), Err(DeployError::Config(_))));
    }

    #[test]
    fn blank_pattern_is_rejected() {
        let config = DeployConfig {
            pattern: Some("  ".to_string()),
            ..base()
        };
        assert!(config.require_pattern().is_err());
    }

    #[test]
    fn debug_hides_api_key() {
        assert!(!format!("{:?}", base()).contains("\"key\""));
    }
}
