//! Changeset file resolution.
//!
//! Expands a literal path or glob into an ordered list of changeset files.
//! Glob matches are ordered by basename so operators control execution order
//! with numeric filename prefixes (`01-schema.yaml`, `02-data.yaml`, ...).

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use crate::error::{DeployError, Result};
use crate::types::ChangesetFile;

const GLOB_METACHARACTERS: &[char] = &['*', '?', '[', ']', '{', '}'];

/// Resolves file patterns relative to a base directory.
#[derive(Debug, Clone)]
pub struct FileResolver {
    base_dir: PathBuf,
}

impl FileResolver {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Resolver rooted at the process working directory.
    pub fn from_current_dir() -> Result<Self> {
        let cwd = std::env::current_dir().map_err(|e| DeployError::io(".", e))?;
        Ok(Self::new(cwd))
    }

    /// Resolve a path or glob into changeset files in processing order.
    pub fn resolve(&self, pattern: &str) -> Result<Vec<ChangesetFile>> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(DeployError::Config(
                "File pattern must not be empty".to_string(),
            ));
        }

        if is_glob(pattern) {
            self.resolve_glob(pattern)
        } else {
            self.resolve_literal(pattern)
        }
    }

    fn resolve_literal(&self, pattern: &str) -> Result<Vec<ChangesetFile>> {
        let path = self.absolute(Path::new(pattern));
        if !path.exists() {
            return Err(DeployError::NotFound(format!(
                "Changeset file does not exist: {}",
                path.display()
            )));
        }
        if path.is_dir() {
            return Err(DeployError::Config(format!(
                "{} is a directory; use a glob such as '{}/*.yaml' to select files",
                path.display(),
                pattern.trim_end_matches('/')
            )));
        }
        Ok(vec![ChangesetFile::new(path)])
    }

    fn resolve_glob(&self, pattern: &str) -> Result<Vec<ChangesetFile>> {
        let mut seen = HashSet::new();
        let mut matches = Vec::new();

        for expanded in expand_braces(pattern) {
            let full = self.glob_pattern(&expanded);
            let paths = glob::glob(&full).map_err(|e| {
                DeployError::Config(format!("Invalid file pattern '{}': {}", pattern, e))
            })?;

            for entry in paths {
                let path = match entry {
                    Ok(path) => path,
                    Err(e) => {
                        tracing::warn!(error = %e, "Skipping unreadable glob match");
                        continue;
                    }
                };
                if !path.is_file() {
                    continue;
                }
                let path = normalize_path(&path);
                if seen.insert(path.clone()) {
                    matches.push(path);
                }
            }
        }

        if matches.is_empty() {
            return Err(DeployError::NotFound(format!(
                "No changeset files match pattern: {}",
                pattern
            )));
        }

        let mut files: Vec<ChangesetFile> = matches.into_iter().map(ChangesetFile::new).collect();
        files.sort_by(|a, b| {
            a.file_name()
                .cmp(&b.file_name())
                .then_with(|| a.path().cmp(b.path()))
        });
        Ok(files)
    }

    /// Anchor a relative pattern at the base directory. The base directory
    /// itself is escaped so its name can't be read as a pattern.
    fn glob_pattern(&self, pattern: &str) -> String {
        if Path::new(pattern).is_absolute() {
            return pattern.to_string();
        }
        let base = glob::Pattern::escape(&self.base_dir.to_string_lossy());
        let relative = pattern.strip_prefix("./").unwrap_or(pattern);
        format!("{}/{}", base.trim_end_matches('/'), relative)
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            normalize_path(path)
        } else {
            normalize_path(&self.base_dir.join(path))
        }
    }
}

pub fn is_glob(pattern: &str) -> bool {
    pattern.contains(GLOB_METACHARACTERS)
}

/// Expand `{a,b}` alternation groups, which the glob matcher does not
/// understand itself. Unbalanced braces are left untouched.
pub fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(open) = pattern.find('{') else {
        return vec![pattern.to_string()];
    };

    let mut depth = 0usize;
    let mut close = None;
    let mut commas = Vec::new();
    for (offset, c) in pattern[open..].char_indices() {
        let idx = open + offset;
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(idx);
                    break;
                }
            }
            ',' if depth == 1 => commas.push(idx),
            _ => {}
        }
    }

    let Some(close) = close else {
        return vec![pattern.to_string()];
    };

    let prefix = &pattern[..open];
    let suffix = &pattern[close + 1..];

    let mut bounds = Vec::with_capacity(commas.len() + 2);
    bounds.push(open);
    bounds.extend(commas);
    bounds.push(close);

    let mut expanded = Vec::new();
    for pair in bounds.windows(2) {
        let alternative = &pattern[pair[0] + 1..pair[1]];
        expanded.extend(expand_braces(&format!("{prefix}{alternative}{suffix}")));
    }
    expanded
}

/// Make a path absolute and drop `.`/`..` components lexically.
fn normalize_path(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
