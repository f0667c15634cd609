//! Hierarchical key-value mapping backed by YAML.

use crate::error::{CliError, Result};
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::path::Path;

/// A parsed configuration file.
///
/// Keys are strings; values are nested mappings or scalars. Nested values are
/// addressed with dotted paths such as `auth.login`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ConfigData {
    values: Mapping,
}

impl ConfigData {
    /// Load a config mapping from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::ConfigInvalid(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content).map_err(|e| match e {
            CliError::ConfigInvalid(msg) => {
                CliError::ConfigInvalid(format!("{} ({})", msg, path.display()))
            }
            other => other,
        })
    }

    /// Parse a config mapping from a YAML string.
    ///
    /// An empty document is an empty mapping.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(yaml)
            .map_err(|e| CliError::ConfigInvalid(format!("failed to parse config YAML: {}", e)))?;

        match value {
            Value::Null => Ok(Self::default()),
            Value::Mapping(values) => Ok(Self { values }),
            _ => Err(CliError::ConfigInvalid(
                "config YAML must be a mapping at the top level".to_string(),
            )),
        }
    }

    /// Whether the mapping has no keys.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of top-level keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Top-level lookup.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Dotted-path lookup (`auth.login`).
    pub fn find(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.values.get(segments.next()?)?;
        for segment in segments {
            current = current.get(segment)?;
        }
        Some(current)
    }

    /// Scalar at a dotted path rendered as a string.
    pub fn find_str(&self, path: &str) -> Option<String> {
        self.find(path).and_then(scalar_to_string)
    }

    /// Unsigned integer at a dotted path. Numeric strings are accepted.
    pub fn find_u64(&self, path: &str) -> Option<u64> {
        match self.find(path)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Boolean at a dotted path. Accepts `true/false`, `yes/no`, `1/0`.
    pub fn find_bool(&self, path: &str) -> Option<bool> {
        match self.find(path)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_i64().map(|n| n != 0),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Some(true),
                "false" | "no" | "off" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Copy of the mapping with the scalars at `paths` replaced by `***`.
    ///
    /// Paths that do not resolve are left untouched.
    pub fn masked(&self, paths: &[&str]) -> Self {
        let mut values = self.values.clone();
        for path in paths {
            let mut segments: Vec<&str> = path.split('.').collect();
            let Some(last) = segments.pop() else {
                continue;
            };

            let mut target: Option<&mut Mapping> = Some(&mut values);
            for segment in segments {
                target = target
                    .and_then(|m| m.get_mut(segment))
                    .and_then(Value::as_mapping_mut);
            }

            if let Some(slot) = target.and_then(|m| m.get_mut(last))
                && !slot.is_mapping()
                && !slot.is_null()
            {
                *slot = Value::String("***".to_string());
            }
        }
        Self { values }
    }

    /// Serialize the mapping to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(&self.values).map_err(|e| {
            CliError::ConfigInvalid(format!("failed to serialize config to YAML: {}", e))
        })
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
