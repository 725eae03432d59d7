//! Block-structured dialect codec.
//!
//! Works on `serde_yaml::Value` throughout so non-string keys, tags and
//! special floats outside the `variables` sequence survive re-serialization.

use serde_yaml::{Mapping, Sequence, Value};

use super::{DocumentCodec, VARIABLES_KEY, VariableCollection, VariableEntry};
use crate::error::{DeployError, Result};
use crate::types::ChangesetFormat;
use crate::variables::VariableSet;

/// YAML changeset codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct YamlCodec;

impl YamlCodec {
    pub fn parse(&self, content: &str) -> Result<Mapping> {
        let value: Value = serde_yaml::from_str(content)
            .map_err(|e| DeployError::Document(format!("Failed to parse YAML changeset: {}", e)))?;
        match value {
            Value::Mapping(map) => Ok(map),
            Value::Null => Ok(Mapping::new()),
            _ => Err(DeployError::Document(
                "Expected YAML mapping at changeset root".to_string(),
            )),
        }
    }

    pub fn render(&self, document: &Mapping) -> Result<String> {
        serde_yaml::to_string(document).map_err(|e| {
            DeployError::Document(format!("Failed to serialize YAML changeset: {}", e))
        })
    }

    pub fn inject(&self, document: &mut Mapping, variables: &VariableSet) -> Result<()> {
        if variables.is_empty() {
            return Ok(());
        }
        let mut collection = YamlVariables::from_document(document)?;
        super::inject(&mut collection, variables)
    }
}

impl DocumentCodec for YamlCodec {
    fn merge_variables(&self, content: &str, variables: &VariableSet) -> Result<String> {
        let mut document = self.parse(content)?;
        self.inject(&mut document, variables)?;
        self.render(&document)
    }

    fn format(&self) -> ChangesetFormat {
        ChangesetFormat::Yaml
    }
}

/// The `variables` sequence of a YAML document.
pub struct YamlVariables<'a> {
    entries: &'a mut Sequence,
}

impl<'a> YamlVariables<'a> {
    /// Borrow the collection, creating an empty one if absent or null.
    pub fn from_document(document: &'a mut Mapping) -> Result<Self> {
        let present = document
            .get(VARIABLES_KEY)
            .is_some_and(|value| !value.is_null());
        if !present {
            document.insert(
                Value::String(VARIABLES_KEY.to_string()),
                Value::Sequence(Sequence::new()),
            );
        }
        match document.get_mut(VARIABLES_KEY) {
            Some(Value::Sequence(entries)) => Ok(Self { entries }),
            Some(other) => Err(DeployError::Document(format!(
                "'{}' must be a list, found {}",
                VARIABLES_KEY,
                value_kind(other)
            ))),
            None => Err(DeployError::Document(format!(
                "'{}' could not be created",
                VARIABLES_KEY
            ))),
        }
    }
}

impl VariableCollection for YamlVariables<'_> {
    fn any_masked(&self, name: &str) -> bool {
        self.entries
            .iter()
            .filter(|entry| entry_name(entry) == Some(name))
            .any(|entry| entry.get("maskValue").and_then(Value::as_bool) == Some(true))
    }

    fn remove(&mut self, name: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| entry_name(entry) != Some(name));
        before - self.entries.len()
    }

    fn append(&mut self, entry: VariableEntry) -> Result<()> {
        let value = serde_yaml::to_value(entry)
            .map_err(|e| DeployError::Document(format!("Failed to encode variable: {}", e)))?;
        self.entries.push(value);
        Ok(())
    }
}

fn entry_name(entry: &Value) -> Option<&str> {
    entry.get("name").and_then(Value::as_str)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
