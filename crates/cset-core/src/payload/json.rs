//! Nested-object dialect codec.

use serde_json::{Map, Value};

use super::{DocumentCodec, VARIABLES_KEY, VariableCollection, VariableEntry};
use crate::error::{DeployError, Result};
use crate::types::ChangesetFormat;
use crate::variables::VariableSet;

/// JSON changeset codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl JsonCodec {
    pub fn parse(&self, content: &str) -> Result<Map<String, Value>> {
        let value: Value = serde_json::from_str(content)
            .map_err(|e| DeployError::Document(format!("Failed to parse JSON changeset: {}", e)))?;
        match value {
            Value::Object(map) => Ok(map),
            _ => Err(DeployError::Document(
                "Expected JSON object at changeset root".to_string(),
            )),
        }
    }

    pub fn render(&self, document: &Map<String, Value>) -> Result<String> {
        serde_json::to_string(document).map_err(|e| {
            DeployError::Document(format!("Failed to serialize JSON changeset: {}", e))
        })
    }

    /// Merge into a parsed document. The collection is only created when
    /// there is something to add.
    pub fn inject(&self, document: &mut Map<String, Value>, variables: &VariableSet) -> Result<()> {
        if variables.is_empty() {
            return Ok(());
        }
        let mut collection = JsonVariables::from_document(document)?;
        super::inject(&mut collection, variables)
    }
}

impl DocumentCodec for JsonCodec {
    fn merge_variables(&self, content: &str, variables: &VariableSet) -> Result<String> {
        let mut document = self.parse(content)?;
        self.inject(&mut document, variables)?;
        self.render(&document)
    }

    fn format(&self) -> ChangesetFormat {
        ChangesetFormat::Json
    }
}

/// The `variables` array of a JSON document.
pub struct JsonVariables<'a> {
    entries: &'a mut Vec<Value>,
}

impl<'a> JsonVariables<'a> {
    /// Borrow the collection, creating an empty one if absent or null.
    pub fn from_document(document: &'a mut Map<String, Value>) -> Result<Self> {
        let slot = document
            .entry(VARIABLES_KEY)
            .or_insert_with(|| Value::Array(Vec::new()));
        if slot.is_null() {
            *slot = Value::Array(Vec::new());
        }
        match slot {
            Value::Array(entries) => Ok(Self { entries }),
            other => Err(DeployError::Document(format!(
                "'{}' must be a list, found {}",
                VARIABLES_KEY,
                value_kind(other)
            ))),
        }
    }
}

impl VariableCollection for JsonVariables<'_> {
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
        let value = serde_json::to_value(entry)
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
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}
