use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::path::Path;

use crate::error::{QueryError, Result};
use crate::params::QueryParams;

// ---------------------------------------------------------------------------
// BatchFile
// ---------------------------------------------------------------------------

/// A list of query items read from disk.
///
/// ```yaml
/// continueOnFail: true
/// defaults:
///   model: opus
///   outputFormat: text
/// items:
///   - prompt: Summarise README.md
///   - prompt: List open TODOs
///     maxTurns: 5
/// ```
///
/// Keys in `defaults` apply to every item unless the item sets them itself.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFile {
    #[serde(default)]
    pub defaults: Mapping,
    #[serde(default)]
    pub items: Vec<Value>,
    #[serde(default)]
    pub continue_on_fail: bool,
}

impl BatchFile {
    /// Read a batch file. `.json` files are parsed as JSON, anything else as
    /// YAML.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Ok(serde_json::from_str(&data)?)
        } else {
            Self::parse(&data)
        }
    }

    pub fn parse(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Every item with `defaults` merged underneath it.
    pub fn items(&self) -> Result<Vec<QueryParams>> {
        if self.items.is_empty() {
            return Err(QueryError::EmptyBatch);
        }

        self.items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let Value::Mapping(fields) = item else {
                    return Err(QueryError::InvalidItem { index });
                };
                let mut merged = self.defaults.clone();
                for (key, value) in fields {
                    merged.insert(key.clone(), value.clone());
                }
                Ok(serde_yaml::from_value(Value::Mapping(merged))?)
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
