//! Changeset payload preparation and variable injection.
//!
//! The merge runs once, against the [`VariableCollection`] capability. Each
//! dialect adapter keeps its own value model so that everything outside the
//! `variables` sequence is printed back as it was parsed.

mod json;
mod yaml;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::types::ChangesetFormat;
use crate::variables::VariableSet;

pub use json::{JsonCodec, JsonVariables};
pub use yaml::{YamlCodec, YamlVariables};

/// Top-level key holding the document's variable entries.
pub const VARIABLES_KEY: &str = "variables";

/// Parse/print adapter for one document dialect.
pub trait DocumentCodec: Send + Sync {
    /// Parse `content`, merge `variables` into it and print it back.
    fn merge_variables(&self, content: &str, variables: &VariableSet) -> Result<String>;

    fn format(&self) -> ChangesetFormat;
}

/// Codec for the given dialect.
pub fn codec_for_format(format: ChangesetFormat) -> Box<dyn DocumentCodec> {
    match format {
        ChangesetFormat::Json => Box::new(JsonCodec),
        ChangesetFormat::Yaml => Box::new(YamlCodec),
    }
}

/// A variable entry as written into a changeset document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableEntry {
    pub name: String,
    pub value: String,
    #[serde(rename = "maskValue")]
    pub mask_value: bool,
    /// Scope id; `None` is global scope.
    pub environment: Option<Value>,
}

impl VariableEntry {
    /// A global-scope entry.
    pub fn global(name: impl Into<String>, value: impl Into<String>, mask_value: bool) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            mask_value,
            environment: None,
        }
    }
}

/// Name-keyed access to a document's variable entries.
pub trait VariableCollection {
    /// Whether any entry with this name has `maskValue: true`.
    fn any_masked(&self, name: &str) -> bool;

    /// Remove every entry with this name, returning how many were dropped.
    fn remove(&mut self, name: &str) -> usize;

    fn append(&mut self, entry: VariableEntry) -> Result<()>;
}

/// Merge `variables` into `collection`.
///
/// For every variable, in input order, all existing entries of that name are
/// replaced by one global-scope entry. The new entry is masked if any of the
/// entries it replaces was masked.
pub fn inject(collection: &mut dyn VariableCollection, variables: &VariableSet) -> Result<()> {
    for (name, value) in variables.iter() {
        let mask_value = collection.any_masked(name);
        let replaced = collection.remove(name);
        tracing::debug!(variable = name, replaced, masked = mask_value, "Injecting variable");
        collection.append(VariableEntry::global(name, value, mask_value))?;
    }
    Ok(())
}

/// Build the request body for a changeset file.
///
/// Without variables the block-structured dialect is sent verbatim; the
/// nested-object dialect is always parsed and re-serialized.
pub fn prepare_payload(
    content: &str,
    format: ChangesetFormat,
    variables: Option<&VariableSet>,
) -> Result<String> {
    let variables = variables.filter(|vars| !vars.is_empty());
    if format == ChangesetFormat::Yaml && variables.is_none() {
        return Ok(content.to_string());
    }

    let none = VariableSet::default();
    codec_for_format(format).merge_variables(content, variables.unwrap_or(&none))
}
