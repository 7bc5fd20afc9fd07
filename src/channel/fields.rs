//! Lenient field access for inbound message payloads.
//!
//! Host payloads are loosely typed. A missing or wrongly typed field must not
//! invalidate the whole message, so every accessor falls back to a zero value
//! (`0`, `0.0`, `false`, `""`, `None`) instead of failing.

use serde_json::{Map, Value};

/// Read-only view over a message's `data` value.
#[derive(Debug, Clone, Copy)]
pub struct Fields<'a> {
    data: &'a Value,
}

impl<'a> Fields<'a> {
    /// Wraps a payload value.
    #[must_use]
    pub fn new(data: &'a Value) -> Self {
        Self { data }
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.data.get(key)
    }

    /// Returns the payload itself as text.
    ///
    /// Strings are returned as-is; an object falls back to its `message` or
    /// `text` field. Anything else yields `""`.
    #[must_use]
    pub fn text(&self) -> String {
        match self.data {
            Value::String(s) => s.clone(),
            Value::Object(_) => {
                let message = self.string("message");
                if message.is_empty() {
                    self.string("text")
                } else {
                    message
                }
            }
            _ => String::new(),
        }
    }

    /// Returns a string field, or `""`.
    #[must_use]
    pub fn string(&self, key: &str) -> String {
        self.opt_string(key).unwrap_or_default()
    }

    /// Returns a non-empty string field.
    ///
    /// Numbers are accepted and rendered as text, since correlation ids are
    /// sometimes numeric.
    #[must_use]
    pub fn opt_string(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Returns an unsigned integer field, or `0`.
    ///
    /// Negative and non-finite numbers yield `0`; fractional values are truncated.
    #[must_use]
    pub fn u64(&self, key: &str) -> u64 {
        match self.get(key) {
            Some(Value::Number(n)) => n.as_u64().unwrap_or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f > 0.0)
                    .map_or(0, |f| f as u64)
            }),
            _ => 0,
        }
    }

    /// Returns a float field, or `0.0`.
    #[must_use]
    pub fn f64(&self, key: &str) -> f64 {
        self.get(key)
            .and_then(Value::as_f64)
            .filter(|f| f.is_finite())
            .unwrap_or(0.0)
    }

    /// Returns a boolean field, or `false`.
    #[must_use]
    pub fn bool(&self, key: &str) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Returns a boolean field, or `default` when absent or not a boolean.
    #[must_use]
    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or(default)
    }

    /// Returns a nested object field.
    #[must_use]
    pub fn object(&self, key: &str) -> Option<Fields<'a>> {
        self.get(key).filter(|v| v.is_object()).map(Fields::new)
    }

    /// Returns the payload as a JSON object map, or an empty map.
    #[must_use]
    pub fn to_map(&self) -> Map<String, Value> {
        self.data.as_object().cloned().unwrap_or_default()
    }
}
