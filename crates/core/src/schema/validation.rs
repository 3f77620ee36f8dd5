//! Field-level validation over untyped JSON objects
//!
//! [`ObjectValidator`] walks one object and records at most one message per
//! field: the first constraint that field violated. Later violations on the
//! same field are dropped so callers can map errors straight onto form
//! fields.

use chrono::{DateTime, Utc};
use serde::{ser::SerializeMap, Serialize, Serializer};
use serde_json::{Map, Value};

/// Ordered set of `field -> message` pairs, first violation per field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: Vec<(String, String)>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Record a violation unless the field already has one
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        let field = field.into();
        if self.get(&field).is_none() {
            self.fields.push((field, message.into()));
        }
    }

    /// Merge another set, prefixing each field (used for array elements)
    pub fn extend_prefixed(&mut self, prefix: &str, other: ValidationErrors) {
        for (field, message) in other.fields {
            self.add(format!("{}.{}", prefix, field), message);
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, m)| m.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(f, m)| (f.as_str(), m.as_str()))
    }

    /// `Ok(())` when empty, otherwise `Err(self)`
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|(field, message)| format!("{}: {}", field, message))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

impl Serialize for ValidationErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, message) in &self.fields {
            map.serialize_entry(field, message)?;
        }
        map.end()
    }
}

/// Cursor over one JSON object that accumulates [`ValidationErrors`]
pub struct ObjectValidator<'a> {
    object: Option<&'a Map<String, Value>>,
    errors: ValidationErrors,
}

impl<'a> ObjectValidator<'a> {
    pub fn new(value: &'a Value) -> Self {
        let mut errors = ValidationErrors::new();
        let object = value.as_object();
        if object.is_none() {
            errors.add("_root", "Expected an object.");
        }
        Self { object, errors }
    }

    fn field(&self, name: &str) -> Option<&'a Value> {
        self.object
            .and_then(|o| o.get(name))
            .filter(|v| !v.is_null())
    }

    /// Required string with a minimum length in characters
    pub fn string(&mut self, name: &str, min_len: usize, message: &str) -> Option<String> {
        match self.field(name) {
            None => {
                self.errors.add(name, message);
                None
            }
            Some(Value::String(s)) => {
                if s.chars().count() < min_len {
                    self.errors.add(name, message);
                    None
                } else {
                    Some(s.clone())
                }
            }
            Some(_) => {
                self.errors.add(name, format!("{} must be a string.", name));
                None
            }
        }
    }

    /// Optional string; blank strings normalize to `None`
    pub fn optional_string(&mut self, name: &str) -> Option<String> {
        match self.field(name) {
            None => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                self.errors.add(name, format!("{} must be a string.", name));
                None
            }
        }
    }

    pub fn optional_bool(&mut self, name: &str) -> Option<bool> {
        match self.field(name) {
            None => None,
            Some(Value::Bool(b)) => Some(*b),
            Some(_) => {
                self.errors.add(name, format!("{} must be a boolean.", name));
                None
            }
        }
    }

    /// Optional server timestamp; must be RFC 3339 when present
    pub fn optional_timestamp(&mut self, name: &str) -> Option<DateTime<Utc>> {
        match self.field(name) {
            None => None,
            Some(Value::String(s)) => match DateTime::parse_from_rfc3339(s) {
                Ok(ts) => Some(ts.with_timezone(&Utc)),
                Err(_) => {
                    self.errors.add(name, format!("{} must be a timestamp.", name));
                    None
                }
            },
            Some(_) => {
                self.errors.add(name, format!("{} must be a timestamp.", name));
                None
            }
        }
    }

    /// Nested object, validated by `f` with errors prefixed by `name`
    pub fn nested<T>(
        &mut self,
        name: &str,
        f: impl FnOnce(&Value) -> Result<T, ValidationErrors>,
    ) -> Option<T> {
        match self.field(name) {
            None => {
                self.errors.add(name, format!("{} is required.", name));
                None
            }
            Some(value) => match f(value) {
                Ok(v) => Some(v),
                Err(errors) => {
                    self.errors.extend_prefixed(name, errors);
                    None
                }
            },
        }
    }

    /// Record a rule checked outside this validator
    pub fn fail(&mut self, name: &str, message: &str) {
        self.errors.add(name, message);
    }

    /// Finish validation; `build` only runs when no field failed
    pub fn finish<T>(self, build: impl FnOnce() -> Option<T>) -> Result<T, ValidationErrors> {
        self.errors.into_result()?;
        build().ok_or_else(|| ValidationErrors::single("_root", "Invalid object."))
    }
}
