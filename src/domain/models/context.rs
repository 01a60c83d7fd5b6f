//! Rule evaluation context.
//!
//! A context is a flat mapping from string keys to scalar values that an
//! agent builds from its domain data before asking the rules engine for a
//! decision. Lookups never assume a key exists: every accessor takes the
//! caller's default, which rule authors choose so that a missing value
//! leaves the rule untriggered.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::errors::ConditionError;

/// Key/value input to rule conditions and action handlers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context(Map<String, Value>);

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Numeric lookup. Absent or null keys yield `default`.
    pub fn number(&self, key: &str, default: f64) -> Result<f64, ConditionError> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(Value::Number(n)) => n.as_f64().ok_or_else(|| {
                ConditionError::Failed(format!("context key '{key}' is not representable as f64"))
            }),
            Some(other) => Err(mismatch(key, "number", other)),
        }
    }

    /// Boolean lookup. Absent or null keys yield `default`.
    pub fn flag(&self, key: &str, default: bool) -> Result<bool, ConditionError> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(mismatch(key, "bool", other)),
        }
    }

    /// String lookup. Absent or null keys yield `default`.
    pub fn text<'a>(&'a self, key: &str, default: &'a str) -> Result<&'a str, ConditionError> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(Value::String(s)) => Ok(s.as_str()),
            Some(other) => Err(mismatch(key, "string", other)),
        }
    }

    /// Copy of this context with `overlay` applied on top (overlay wins).
    #[must_use]
    pub fn merged(&self, overlay: &Self) -> Self {
        let mut out = self.0.clone();
        for (k, v) in &overlay.0 {
            out.insert(k.clone(), v.clone());
        }
        Self(out)
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

fn mismatch(key: &str, expected: &'static str, found: &Value) -> ConditionError {
    ConditionError::TypeMismatch {
        key: key.to_string(),
        expected,
        found: value_kind(found),
    }
}

/// Short JSON type name for diagnostics.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl From<Map<String, Value>> for Context {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
