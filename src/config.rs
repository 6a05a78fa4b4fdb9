//! Defines the loosely structured documents used for SMURF overlay records, include files and
//! conversion requests.
//!
//! A [ConfigMap] keeps its entries in document order. Values are a small tagged union
//! ([ConfigValue]) and the typed accessors never coerce between variants, with the single
//! exception that integers are accepted where a floating point number is expected. A value of
//! the wrong type is reported as [Error::FieldType] so that callers can decide whether to reject
//! the record or only ignore the field.

extern crate nalgebra as na;

use std::{fmt::Display, fs, path::Path};

use na::{Quaternion, UnitQuaternion, Vector3};
use serde_yaml::Value;

use crate::Error;

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;

/// Defines a single value in a configuration document.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigValue {
    /// An explicitly empty value.
    Null,
    /// A boolean value.
    Bool(bool),
    /// A signed integer value.
    Integer(i64),
    /// A floating point value.
    Float(f64),
    /// A string value.
    String(String),
    /// An ordered list of values.
    Sequence(Vec<ConfigValue>),
    /// A nested map.
    Map(ConfigMap),
}

impl ConfigValue {
    /// Returns the boolean stored in the value, if the value is a [ConfigValue::Bool].
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the number stored in the value, if the value is a [ConfigValue::Float] or a
    /// [ConfigValue::Integer].
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConfigValue::Float(f) => Some(*f),
            ConfigValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Returns the integer stored in the value, if the value is a [ConfigValue::Integer].
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the nested map, if the value is a [ConfigValue::Map].
    pub fn as_map(&self) -> Option<&ConfigMap> {
        match self {
            ConfigValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Returns the list of values, if the value is a [ConfigValue::Sequence].
    pub fn as_sequence(&self) -> Option<&[ConfigValue]> {
        match self {
            ConfigValue::Sequence(s) => Some(s.as_slice()),
            _ => None,
        }
    }

    /// Returns the string, if the value is a [ConfigValue::String].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Returns the name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ConfigValue::Null => "null",
            ConfigValue::Bool(_) => "a boolean",
            ConfigValue::Integer(_) => "an integer",
            ConfigValue::Float(_) => "a number",
            ConfigValue::String(_) => "a string",
            ConfigValue::Sequence(_) => "a sequence",
            ConfigValue::Map(_) => "a map",
        }
    }

    fn from_yaml(value: Value) -> ConfigValue {
        match value {
            Value::Null => ConfigValue::Null,
            Value::Bool(b) => ConfigValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => ConfigValue::Integer(i),
                None => ConfigValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => ConfigValue::String(s),
            Value::Sequence(items) => {
                ConfigValue::Sequence(items.into_iter().map(ConfigValue::from_yaml).collect())
            }
            Value::Mapping(mapping) => {
                let mut map = ConfigMap::new();
                for (key, value) in mapping {
                    map.insert(yaml_key_to_string(&key), ConfigValue::from_yaml(value));
                }
                ConfigValue::Map(map)
            }
            Value::Tagged(tagged) => ConfigValue::from_yaml(tagged.value),
        }
    }
}

impl Display for ConfigValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigValue::Null => write!(f, "null"),
            ConfigValue::Bool(b) => write!(f, "{}", b),
            ConfigValue::Integer(i) => write!(f, "{}", i),
            ConfigValue::Float(v) => write!(f, "{}", v),
            ConfigValue::String(s) => write!(f, "{}", s),
            ConfigValue::Sequence(items) => {
                write!(f, "[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            ConfigValue::Map(map) => write!(f, "{{{} entries}}", map.len()),
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        ConfigValue::Float(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Integer(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::String(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::String(value)
    }
}

impl From<ConfigMap> for ConfigValue {
    fn from(value: ConfigMap) -> Self {
        ConfigValue::Map(value)
    }
}

fn yaml_key_to_string(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        other => format!("{:?}", other),
    }
}

/// Defines a map of named configuration values that keeps the document order of its keys.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConfigMap {
    entries: Vec<(String, ConfigValue)>,
}

impl ConfigMap {
    /// Merges the entries of `other` into the current map.
    ///
    /// Keys that only exist in `other` are added at the end. When both maps hold a nested map
    /// under the same key the nested maps are merged recursively, when both hold a sequence the
    /// items of `other` are appended. Otherwise the value from `other` replaces the current one.
    ///
    /// ## Parameters
    ///
    /// * 'other' - The map whose entries should be merged into the current map.
    pub fn append(&mut self, other: &ConfigMap) {
        for (key, value) in other.iter() {
            let merged = match (self.get_mut(key), value) {
                (Some(ConfigValue::Map(existing)), ConfigValue::Map(incoming)) => {
                    existing.append(incoming);
                    true
                }
                (Some(ConfigValue::Sequence(existing)), ConfigValue::Sequence(incoming)) => {
                    existing.extend(incoming.iter().cloned());
                    true
                }
                _ => false,
            };

            if !merged {
                self.insert(key, value.clone());
            }
        }
    }

    /// Returns a value indicating whether the map holds the given key.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Reads a YAML document from the given file. The top level of the document must be a map.
    ///
    /// ## Errors
    ///
    /// * [Error::UnreadableDocument] - Returned when the file cannot be read.
    /// * [Error::InvalidDocument] - Returned when the file is not valid YAML or its top level is
    ///   not a map.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| Error::UnreadableDocument {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Self::from_yaml_str(&text).map_err(|e| match e {
            Error::InvalidDocument { reason } => Error::InvalidDocument {
                reason: format!("{}: {}", path.display(), reason),
            },
            other => other,
        })
    }

    /// Parses a YAML document. An empty document results in an empty map.
    ///
    /// ## Errors
    ///
    /// * [Error::InvalidDocument] - Returned when the text is not valid YAML or its top level is
    ///   not a map.
    pub fn from_yaml_str(text: &str) -> Result<Self, Error> {
        let value: Value = serde_yaml::from_str(text).map_err(|e| Error::InvalidDocument {
            reason: e.to_string(),
        })?;

        match ConfigValue::from_yaml(value) {
            ConfigValue::Map(map) => Ok(map),
            ConfigValue::Null => Ok(ConfigMap::new()),
            other => Err(Error::InvalidDocument {
                reason: format!("expected a map at the top level, found {}", other.type_name()),
            }),
        }
    }

    /// Returns the value stored under the given key.
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Returns the boolean stored under `field`.
    ///
    /// ## Parameters
    ///
    /// * 'record' - The name of the record the map belongs to. Used for error reporting.
    /// * 'field' - The key of the value.
    ///
    /// ## Errors
    ///
    /// * [Error::FieldType] - Returned when the value is present but is not a boolean.
    pub fn get_bool(&self, record: &str, field: &str) -> Result<Option<bool>, Error> {
        self.typed(record, field, "a boolean", ConfigValue::as_bool)
    }

    /// Returns the number stored under `field`. Integers are accepted.
    ///
    /// ## Errors
    ///
    /// * [Error::FieldType] - Returned when the value is present but is not a number.
    pub fn get_f64(&self, record: &str, field: &str) -> Result<Option<f64>, Error> {
        self.typed(record, field, "a number", ConfigValue::as_f64)
    }

    /// Returns the nested map stored under `field`.
    ///
    /// ## Errors
    ///
    /// * [Error::FieldType] - Returned when the value is present but is not a map.
    pub fn get_map(&self, record: &str, field: &str) -> Result<Option<&ConfigMap>, Error> {
        match self.get(field) {
            None => Ok(None),
            Some(ConfigValue::Map(m)) => Ok(Some(m)),
            Some(_) => Err(field_type_error(record, field, "a map")),
        }
    }

    /// Returns a mutable reference to the value stored under the given key.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut ConfigValue> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Returns the unit quaternion stored under `field`.
    ///
    /// The quaternion is either a map with the keys `w`, `x`, `y` and `z` or a sequence of four
    /// numbers in the order `w, x, y, z`. The result is normalized.
    ///
    /// ## Errors
    ///
    /// * [Error::FieldType] - Returned when the value is present but is not a quaternion.
    pub fn get_quaternion(
        &self,
        record: &str,
        field: &str,
    ) -> Result<Option<UnitQuaternion<f64>>, Error> {
        let value = match self.get(field) {
            None => return Ok(None),
            Some(v) => v,
        };

        let components = match value {
            ConfigValue::Map(m) => ["w", "x", "y", "z"]
                .iter()
                .map(|k| m.get(k).and_then(ConfigValue::as_f64))
                .collect::<Option<Vec<f64>>>(),
            ConfigValue::Sequence(items) if items.len() == 4 => {
                items.iter().map(ConfigValue::as_f64).collect()
            }
            _ => None,
        };

        match components {
            Some(c) if c.iter().any(|v| *v != 0.0) => Ok(Some(UnitQuaternion::from_quaternion(
                Quaternion::new(c[0], c[1], c[2], c[3]),
            ))),
            _ => Err(field_type_error(record, field, "a quaternion {w, x, y, z}")),
        }
    }

    /// Returns the string stored under `field`.
    ///
    /// ## Errors
    ///
    /// * [Error::FieldType] - Returned when the value is present but is not a string.
    pub fn get_str(&self, record: &str, field: &str) -> Result<Option<&str>, Error> {
        match self.get(field) {
            None => Ok(None),
            Some(ConfigValue::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(field_type_error(record, field, "a string")),
        }
    }

    /// Returns the list of strings stored under `field`. A single string is treated as a list
    /// with one entry.
    ///
    /// ## Errors
    ///
    /// * [Error::FieldType] - Returned when the value is present but is not a string or a list
    ///   of strings.
    pub fn get_string_list(&self, record: &str, field: &str) -> Result<Option<Vec<String>>, Error> {
        match self.get(field) {
            None => Ok(None),
            Some(ConfigValue::String(s)) => Ok(Some(vec![s.clone()])),
            Some(ConfigValue::Sequence(items)) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<Vec<String>>>()
                .map(Some)
                .ok_or_else(|| field_type_error(record, field, "a list of strings")),
            Some(_) => Err(field_type_error(record, field, "a list of strings")),
        }
    }

    /// Returns the non-negative integer stored under `field`.
    ///
    /// ## Errors
    ///
    /// * [Error::FieldType] - Returned when the value is present but is not a non-negative
    ///   integer.
    pub fn get_u64(&self, record: &str, field: &str) -> Result<Option<u64>, Error> {
        self.typed(record, field, "a non-negative integer", |v| {
            v.as_i64().and_then(|i| u64::try_from(i).ok())
        })
    }

    /// Returns the vector stored under `field`.
    ///
    /// The vector is either a map with the keys `x`, `y` and `z` or a sequence of three numbers.
    ///
    /// ## Errors
    ///
    /// * [Error::FieldType] - Returned when the value is present but is not a vector.
    pub fn get_vector3(&self, record: &str, field: &str) -> Result<Option<Vector3<f64>>, Error> {
        self.typed(record, field, "a vector {x, y, z}", |value| {
            let components: Option<Vec<f64>> = match value {
                ConfigValue::Map(m) => ["x", "y", "z"]
                    .iter()
                    .map(|k| m.get(k).and_then(ConfigValue::as_f64))
                    .collect(),
                ConfigValue::Sequence(items) if items.len() == 3 => {
                    items.iter().map(ConfigValue::as_f64).collect()
                }
                _ => None,
            };

            components.map(|c| Vector3::new(c[0], c[1], c[2]))
        })
    }

    /// Inserts the value under the given key. An existing value is replaced in place and
    /// returned, a new key is added at the end.
    pub fn insert<K: Into<String>>(&mut self, key: K, value: ConfigValue) -> Option<ConfigValue> {
        let key = key.into();
        match self.get_mut(&key) {
            Some(existing) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Returns a value indicating whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns an iterator over the entries in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of entries in the map.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns the `name` entry of the map, if it is a string.
    pub fn name(&self) -> Option<&str> {
        self.get("name").and_then(ConfigValue::as_str)
    }

    /// Creates a new, empty map.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Removes the given key from the map and returns its value.
    pub fn remove(&mut self, key: &str) -> Option<ConfigValue> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// Returns the string stored under `field`.
    ///
    /// ## Errors
    ///
    /// * [Error::MissingField] - Returned when there is no value stored under `field`.
    /// * [Error::FieldType] - Returned when the value is not a string.
    pub fn require_str(&self, record: &str, field: &str) -> Result<&str, Error> {
        self.get_str(record, field)?
            .ok_or_else(|| Error::MissingField {
                record: record.to_string(),
                field: field.to_string(),
            })
    }

    fn typed<T, F>(
        &self,
        record: &str,
        field: &str,
        expected: &str,
        convert: F,
    ) -> Result<Option<T>, Error>
    where
        F: Fn(&ConfigValue) -> Option<T>,
    {
        match self.get(field) {
            None => Ok(None),
            Some(value) => convert(value)
                .map(Some)
                .ok_or_else(|| field_type_error(record, field, expected)),
        }
    }
}

impl<K: Into<String>> FromIterator<(K, ConfigValue)> for ConfigMap {
    fn from_iter<T: IntoIterator<Item = (K, ConfigValue)>>(iter: T) -> Self {
        let mut map = ConfigMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

/// Creates a [ConfigValue::Map] holding a vector as `{x, y, z}`.
pub fn vector3_value(vector: &Vector3<f64>) -> ConfigValue {
    ConfigValue::Map(ConfigMap::from_iter([
        ("x", ConfigValue::Float(vector.x)),
        ("y", ConfigValue::Float(vector.y)),
        ("z", ConfigValue::Float(vector.z)),
    ]))
}

fn field_type_error(record: &str, field: &str, expected: &str) -> Error {
    Error::FieldType {
        record: record.to_string(),
        field: field.to_string(),
        expected: expected.to_string(),
    }
}
