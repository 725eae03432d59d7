//! TOML parser with helpful error messages

use std::path::Path;

use super::DeployConfig;
use crate::error::{DeployError, Result};

/// Parse a cset.toml file.
pub fn parse_config_file(path: &Path) -> Result<DeployConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DeployError::io(path.display(), e))?;

    parse_config_str(&content).map_err(|e| match e {
        DeployError::Config(msg) => {
            DeployError::Config(format!("Failed to parse {}: {}", path.display(), msg))
        }
        other => other,
    })
}

/// Parse cset.toml content from a string.
pub fn parse_config_str(content: &str) -> Result<DeployConfig> {
    toml::from_str(content).map_err(|e| enhance_toml_error(e, content))
}

/// Attach the offending lines to a TOML error.
fn enhance_toml_error(error: toml::de::Error, content: &str) -> DeployError {
    let message = error.message().to_string();
    match error.span() {
        Some(span) => {
            let before = content.get(..span.start).unwrap_or(content);
            let line_num = before.matches('\n').count() + 1;
            let context = get_line_context(content, line_num);
            DeployError::Config(format!(
                "TOML error at line {}:\n{}\n\n{}",
                line_num, context, message
            ))
        }
        None => DeployError::Config(format!("TOML error: {}", message)),
    }
}

/// Lines around `line_num`, with the offending one marked.
fn get_line_context(content: &str, line_num: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = line_num.saturating_sub(2);
    let end = (line_num + 1).min(lines.len());

    lines[start.min(end)..end]
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let num = start + i + 1;
            let marker = if num == line_num { ">>>" } else { "   " };
            format!("{} {:4} | {}", marker, num, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ExecutionStrategy;

    #[test]
    fn parses_full_config() {
        let config = parse_config_str(
            r#"
base_url = "https://deploy.example.com"
environment = "staging"
pattern = "changesets/*.yaml"
validate = true
validate_only = false
wait = true
timeout_minutes = 15
strategy = "validate_first"
fail_fast = false
variables = """
DB_HOST=db.internal
"""
"#,
        )
        .unwrap();

        assert_eq!(config.base_url.as_deref(), Some("https://deploy.example.com"));
        assert_eq!(config.environment.as_deref(), Some("staging"));
        assert_eq!(config.timeout_minutes, Some(15));
        assert_eq!(config.strategy, Some(ExecutionStrategy::ValidateFirst));
        assert_eq!(config.fail_fast, Some(false));
        assert!(config.variables.unwrap().contains("DB_HOST"));
    }

    #[test]
    fn unknown_key_is_rejected_with_context() {
        let err = parse_config_str("base_url = \"https://x\"\nfailfast = true\n").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("failfast"), "{msg}");
        assert!(msg.contains("line 2"), "{msg}");
    }

    #[test]
    fn bad_strategy_is_rejected() {
        assert!(parse_config_str("strategy = \"parallel\"\n").is_err());
    }

    #[test]
    fn line_context_marks_offending_line() {
        let context = get_line_context("a = 1\nb = \nc = 3\n", 2);
        assert!(context.contains(">>>    2 | b = "));
        assert!(context.contains("1 | a = 1"));
        assert!(!context.contains(">>>    1"));
    }
}
