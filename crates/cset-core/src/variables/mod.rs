//! Operator-supplied override variables.
//!
//! Variables arrive as a block of `KEY=VALUE` lines:
//!
//! ```text
//! # database
//! DB_HOST = db.internal
//! DB_URL=postgres://user:pw@host/db?sslmode=require
//! ```

use indexmap::IndexMap;

use crate::error::{DeployError, Result};

/// Ordered name -> raw value mapping. Read-only once parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableSet {
    entries: IndexMap<String, String>,
}

impl VariableSet {
    /// Parse a raw `KEY=VALUE` block.
    ///
    /// Returns `Ok(None)` for empty or whitespace-only input. Blank lines and
    /// `#` comments are skipped; a repeated key keeps its first position and
    /// takes the last value.
    pub fn parse(raw: &str) -> Result<Option<Self>> {
        if raw.trim().is_empty() {
            return Ok(None);
        }

        let mut entries = IndexMap::new();
        for (idx, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(DeployError::Config(format!(
                    "Invalid variable on line {}: '{}' (expected KEY=VALUE)",
                    idx + 1,
                    line
                )));
            };
            let key = key.trim();
            if key.is_empty() {
                return Err(DeployError::Config(format!(
                    "Invalid variable on line {}: '{}' (missing name)",
                    idx + 1,
                    line
                )));
            }
            entries.insert(key.to_string(), value.trim().to_string());
        }

        Ok(Some(Self { entries }))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate in input order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for VariableSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut entries = IndexMap::new();
        for (key, value) in iter {
            entries.insert(key.into(), value.into());
        }
        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_none() {
        assert_eq!(VariableSet::parse("").unwrap(), None);
        assert_eq!(VariableSet::parse("  \n\t\n").unwrap(), None);
    }

    #[test]
    fn comments_only_yields_empty_set() {
        let vars = VariableSet::parse("# nothing here\n\n").unwrap().unwrap();
        assert!(vars.is_empty());
    }

    #[test]
    fn parses_trimmed_pairs_in_order() {
        let vars = VariableSet::parse("  B = two \nA=one\n# skip\n\nC=")
            .unwrap()
            .unwrap();
        let pairs: Vec<_> = vars.iter().collect();
        assert_eq!(pairs, vec![("B", "two"), ("A", "one"), ("C", "")]);
    }

    #[test]
    fn value_keeps_additional_equals_signs() {
        let vars = VariableSet::parse("URL = postgres://h/db?a=1&b=2")
            .unwrap()
            .unwrap();
        assert_eq!(vars.get("URL"), Some("postgres://h/db?a=1&b=2"));
    }

    #[test]
    fn duplicate_key_last_value_wins() {
        let vars = VariableSet::parse("A=1\nB=2\nA=3").unwrap().unwrap();
        assert_eq!(vars.len(), 2);
        assert_eq!(vars.get("A"), Some("3"));
        assert_eq!(vars.names().collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[test]
    fn line_without_equals_is_config_error() {
        let err = VariableSet::parse("A=1\nNOT_A_PAIR").unwrap_err();
        match err {
            DeployError::Config(msg) => {
                assert!(msg.contains("line 2"), "{msg}");
                assert!(msg.contains("NOT_A_PAIR"), "{msg}");
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }
}
