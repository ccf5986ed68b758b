//! Serialized `field -> value` maps that filters stamp onto new tasks.
//!
//! Format: `key|<type><value>|` repeated, where type is `i` (integer) or
//! `s` (string). A literal `|` inside a key or value is written as `!PIPE!`.
//! String values equal to a placeholder token come back as placeholders.

use chrono::TimeZone;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::placeholder::Placeholder;

const SEPARATOR: char = '|';
const SEPARATOR_ESCAPE: &str = "!PIPE!";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Int(i64),
    Text(String),
    Placeholder(Placeholder),
}

impl FieldValue {
    /// Millisecond value, resolving placeholders against `now`
    pub fn as_millis<Tz: TimeZone>(&self, now: i64, tz: &Tz) -> Option<i64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            FieldValue::Placeholder(p) => Some(p.resolve(now, tz)),
            FieldValue::Text(s) => s.trim().parse().ok(),
        }
    }

    /// String form of a textual value. Placeholders give back their token
    /// unresolved, so a text that happens to read `NOW()` survives.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Placeholder(p) => Some(p.token()),
            FieldValue::Int(_) => None,
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<Placeholder> for FieldValue {
    fn from(value: Placeholder) -> Self {
        FieldValue::Placeholder(value)
    }
}

pub type ValueMap = BTreeMap<String, FieldValue>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValuesError {
    #[error("Value missing for key '{0}'")]
    MissingValue(String),
    #[error("Unknown value type '{kind}' for key '{key}'")]
    UnknownType { key: String, kind: char },
    #[error("Invalid integer '{value}' for key '{key}'")]
    InvalidInteger { key: String, value: String },
}

fn escape(s: &str) -> String {
    s.replace(SEPARATOR, SEPARATOR_ESCAPE)
}

fn unescape(s: &str) -> String {
    s.replace(SEPARATOR_ESCAPE, "|")
}

pub fn serialize_map(map: &ValueMap) -> String {
    let mut out = String::new();
    for (key, value) in map {
        out.push_str(&escape(key));
        out.push(SEPARATOR);
        match value {
            FieldValue::Int(v) => {
                out.push('i');
                out.push_str(&v.to_string());
            }
            FieldValue::Text(s) => {
                out.push('s');
                out.push_str(&escape(s));
            }
            FieldValue::Placeholder(p) => {
                out.push('s');
                out.push_str(p.token());
            }
        }
        out.push(SEPARATOR);
    }
    out
}

pub fn deserialize_map(serialized: &str) -> Result<ValueMap, ValuesError> {
    let mut map = ValueMap::new();
    let mut parts = serialized.split(SEPARATOR);
    while let Some(raw_key) = parts.next() {
        if raw_key.is_empty() {
            // Trailing separator
            continue;
        }
        let key = unescape(raw_key);
        let raw_value = parts
            .next()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ValuesError::MissingValue(key.clone()))?;
        let mut chars = raw_value.chars();
        let kind = chars.next().ok_or_else(|| ValuesError::MissingValue(key.clone()))?;
        let body = chars.as_str();
        let value = match kind {
            'i' => body
                .parse::<i64>()
                .map(FieldValue::Int)
                .map_err(|_| ValuesError::InvalidInteger {
                    key: key.clone(),
                    value: body.to_string(),
                })?,
            's' => {
                let text = unescape(body);
                match Placeholder::from_token(&text) {
                    Some(p) => FieldValue::Placeholder(p),
                    None => FieldValue::Text(text),
                }
            }
            other => return Err(ValuesError::UnknownType { key, kind: other }),
        };
        map.insert(key, value);
    }
    Ok(map)
}
