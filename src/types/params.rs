//! Request parameter tree.
//!
//! Every signed call carries an arbitrary nested set of parameters. They are
//! modelled as an explicit sum type so that canonicalization can match on
//! every case exhaustively.

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// Top-level request parameters.
///
/// `BTreeMap` keeps keys unique and iterates them in byte-wise lexicographic
/// order, which is exactly the canonical key order.
pub type Params = BTreeMap<String, ParamValue>;

/// A numeric parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// Non-negative integer
    UInt(u64),
    /// Signed integer
    Int(i64),
    /// Floating point value; must be finite to be signed
    Float(f64),
}

impl Number {
    /// Whether the value can be rendered as canonical text.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Float(f) => f.is_finite(),
            _ => true,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UInt(n) => write!(f, "{n}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
        }
    }
}

/// One node of a parameter tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ParamValue {
    /// Explicit `null`
    #[default]
    Null,
    /// `true` / `false`
    Bool(bool),
    /// Integer or float
    Number(Number),
    /// UTF-8 text
    String(String),
    /// Ordered sequence
    Array(Vec<ParamValue>),
    /// Mapping with unique string keys
    Object(Params),
}

impl ParamValue {
    /// Returns the string slice if this is a `String`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as `u64` if it is a non-negative integer.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Number(Number::UInt(n)) => Some(*n),
            Self::Number(Number::Int(n)) => u64::try_from(*n).ok(),
            _ => None,
        }
    }

    /// Returns the nested mapping if this is an `Object`.
    #[must_use]
    pub fn as_object(&self) -> Option<&Params> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// `true` for `Null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Look up a key when this is an `Object`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.as_object().and_then(|map| map.get(key))
    }
}

impl Serialize for ParamValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(Number::UInt(n)) => serializer.serialize_u64(*n),
            Self::Number(Number::Int(n)) => serializer.serialize_i64(*n),
            Self::Number(Number::Float(n)) => serializer.serialize_f64(*n),
            Self::String(s) => serializer.serialize_str(s),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Object(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    out.serialize_entry(key, value)?;
                }
                out.end()
            }
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<u64> for ParamValue {
    fn from(value: u64) -> Self {
        Self::Number(Number::UInt(value))
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        Self::Number(Number::UInt(u64::from(value)))
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Number(Number::Int(value))
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        Self::Number(Number::Int(i64::from(value)))
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Number(Number::Float(value))
    }
}

impl From<Number> for ParamValue {
    fn from(value: Number) -> Self {
        Self::Number(value)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(values: Vec<T>) -> Self {
        Self::Array(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<Params> for ParamValue {
    fn from(map: Params) -> Self {
        Self::Object(map)
    }
}

impl From<serde_json::Number> for Number {
    fn from(n: serde_json::Number) -> Self {
        if let Some(u) = n.as_u64() {
            Self::UInt(u)
        } else if let Some(i) = n.as_i64() {
            Self::Int(i)
        } else {
            // serde_json numbers are always finite; without arbitrary_precision
            // as_f64 is infallible for the remaining case
            Self::Float(n.as_f64().unwrap_or(f64::NAN))
        }
    }
}

impl From<serde_json::Value> for ParamValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n.into()),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => Self::Object(
                map.into_iter()
                    .map(|(key, value)| (key, value.into()))
                    .collect(),
            ),
        }
    }
}

/// Build [`Params`] from a JSON object; any other JSON value yields `None`.
#[must_use]
pub fn params_from_json(value: serde_json::Value) -> Option<Params> {
    match ParamValue::from(value) {
        ParamValue::Object(map) => Some(map),
        _ => None,
    }
}
