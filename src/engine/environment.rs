//! The shared variable environment threaded through a recipe run
//!
//! Values are JSON-shaped so recipes, user preferences, CLI overrides and
//! script steps can all exchange them without lossy conversions.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Per-recipe work directory, written by the engine before the first step.
pub const RECIPE_CACHE_DIR: &str = "RECIPE_CACHE_DIR";
/// Optional override of the base cache directory.
pub const CACHE_DIR: &str = "CACHE_DIR";
/// Path of the recipe file being run.
pub const RECIPE_PATH: &str = "RECIPE_PATH";
/// Directory containing the recipe; searched for colocated script steps.
pub const RECIPE_DIR: &str = "RECIPE_DIR";
/// Explicit recipe identifier.
pub const IDENTIFIER: &str = "IDENTIFIER";
/// Early-exit sentinel, checked after every step.
pub const STOP_PROCESSING_RECIPE: &str = "stop_processing_recipe";

/// A mapping of variable name to value.
///
/// Keys are kept ordered so snapshots and reports are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Environment(BTreeMap<String, Value>);

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Get a value only if it is a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Insert or overwrite a variable, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Merge every entry of `other` into `self`, overwriting collisions.
    pub fn extend(&mut self, other: &Environment) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub(crate) fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copy out the subset of `keys` that are present.
    pub fn snapshot<'k>(&self, keys: impl IntoIterator<Item = &'k str>) -> Environment {
        keys.into_iter()
            .filter_map(|k| self.0.get(k).map(|v| (k.to_owned(), v.clone())))
            .collect()
    }

    /// Whether the early-exit sentinel is set to a truthy value.
    pub fn stop_requested(&self) -> bool {
        self.get(STOP_PROCESSING_RECIPE).is_some_and(is_truthy)
    }
}

impl FromIterator<(String, Value)> for Environment {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> From<[(K, V); N]> for Environment {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect()
    }
}

impl IntoIterator for Environment {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Truthiness of an environment value.
///
/// `null`, `false`, zero, and empty strings/arrays/maps are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Short name of a value's shape, used in error messages.
pub fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "dictionary",
    }
}

/// Replace `%NAME%` tokens in every string inside `value`.
///
/// Only names made of ASCII alphanumerics and `_` are considered, and only
/// scalar environment values are substituted. Anything else is left as is.
pub fn substitute(value: &Value, env: &Environment) -> Value {
    match value {
        Value::String(s) => Value::String(substitute_str(s, env)),
        Value::Array(items) => Value::Array(items.iter().map(|v| substitute(v, env)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), substitute(v, env)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn substitute_str(text: &str, env: &Environment) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let replacement = after.find('%').and_then(|end| {
            let name = &after[..end];
            let value = scalar_text(env.get(name)?)?;
            is_variable_name(name).then_some((value, end))
        });
        match replacement {
            Some((value, end)) => {
                out.push_str(&value);
                rest = &after[end + 1..];
            }
            None => {
                out.push('%');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

fn is_variable_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
