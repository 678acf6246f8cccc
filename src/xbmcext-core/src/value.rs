//! Typed parameter values.
//!
//! Query strings arrive as text. Before a handler sees them every value is
//! run through [`cast`], which turns numbers, the `True`/`False` literals and
//! JSON documents into their typed form and leaves everything else as a
//! string. [`Params`] is the merged view handed to route handlers.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// Decode a raw query value.
///
/// Precedence is fixed: finite number first (integral values become
/// integers), then the `True`/`False` literals, then JSON, then the raw text.
pub fn cast(raw: &str) -> Value {
    if let Some(number) = cast_number(raw) {
        return Value::Number(number);
    }

    match raw {
        "True" => return Value::Bool(true),
        "False" => return Value::Bool(false),
        _ => {}
    }

    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn cast_number(raw: &str) -> Option<Number> {
    let parsed: f64 = raw.trim().parse().ok()?;
    if !parsed.is_finite() {
        return None;
    }

    // i64::MAX is not representable as f64; the upper bound is exclusive.
    if parsed.fract() == 0.0 && parsed >= i64::MIN as f64 && parsed < i64::MAX as f64 {
        return Some(Number::from(parsed as i64));
    }

    Number::from_f64(parsed)
}

/// Render a value the way it is written into a query string.
///
/// Strings are emitted verbatim and booleans as `True`/`False`, so feeding
/// the text back through [`cast`] yields an equivalent value. Lists and
/// objects are written as JSON rather than as repeated keys.
pub fn to_query_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(number) => number.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Errors raised when a handler reads a parameter.
#[derive(Debug, Error)]
pub enum ParamError {
    #[error("missing parameter `{name}`")]
    Missing { name: String },
    #[error("parameter `{name}` has an unexpected type: {source}")]
    Invalid {
        name: String,
        source: serde_json::Error,
    },
}

/// Named, typed arguments passed to a route handler.
///
/// Path captures and query values share one namespace. Keys are kept in
/// sorted order, which also fixes the order of generated query strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params {
    map: BTreeMap<String, Value>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy when constructing links.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.map.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.map.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.map.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    /// Deserialize a parameter into any serde type.
    pub fn require<T: DeserializeOwned>(&self, name: &str) -> Result<T, ParamError> {
        let value = self.get(name).ok_or_else(|| ParamError::Missing {
            name: name.to_string(),
        })?;
        T::deserialize(value).map_err(|source| ParamError::Invalid {
            name: name.to_string(),
            source,
        })
    }

    /// Merge `other` into `self`; values from `other` win on collisions.
    pub fn extend(&mut self, other: Params) {
        self.map.extend(other.map);
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.map.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}
