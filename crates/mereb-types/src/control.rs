//! Docker control backend payloads.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single `.env` value. Comma-separated values travel as lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Single(String),
    List(Vec<String>),
}

impl EnvValue {
    /// Parses an edited value the way the env editor does: any comma turns it
    /// into a list, split on every comma.
    pub fn parse(raw: &str) -> Self {
        if raw.contains(',') {
            EnvValue::List(raw.split(',').map(str::to_string).collect())
        } else {
            EnvValue::Single(raw.to_string())
        }
    }
}

impl fmt::Display for EnvValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvValue::Single(value) => f.write_str(value),
            EnvValue::List(values) => f.write_str(&values.join(",")),
        }
    }
}

/// Contents of the services env file, keyed by variable name.
///
/// Keys are kept sorted, matching the order the control backend returns them
/// in, so a fetch-edit-push cycle never reorders the file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVars {
    #[serde(rename = "env_vars")]
    pub vars: BTreeMap<String, EnvValue>,
}

impl EnvVars {
    pub fn get(&self, key: &str) -> Option<&EnvValue> {
        self.vars.get(key)
    }

    /// Sets `key` from a raw edited value, replacing any previous value.
    pub fn set(&mut self, key: &str, raw: &str) {
        self.vars.insert(key.to_string(), EnvValue::parse(raw));
    }

    /// Adds a new variable. Both key and value must be non-empty.
    ///
    /// Returns false (and leaves the map untouched) otherwise.
    pub fn insert_new(&mut self, key: &str, raw: &str) -> bool {
        if key.is_empty() || raw.is_empty() {
            return false;
        }
        self.set(key, raw);
        true
    }

    pub fn remove(&mut self, key: &str) -> Option<EnvValue> {
        self.vars.remove(key)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &EnvValue)> {
        self.vars.iter()
    }
}

/// Body of both compose-file calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeFile {
    pub docker_compose: String,
}

/// `{message}` answer of the control backend's write calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Error body used by the control backend (`error`) and the Java services
/// (`message`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    /// Best human-readable text carried by the body, if any.
    pub fn text(&self) -> Option<&str> {
        self.error
            .as_deref()
            .or(self.message.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}
