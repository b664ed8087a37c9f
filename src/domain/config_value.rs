// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration values and insertion-ordered property maps.
//!
//! Documents are parsed into trees of [`ConfigValue`]. Maps keep their
//! insertion order so that responses list keys in the order they were
//! authored.

use crate::domain::errors::{ConfigError, Result};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::fmt;

/// A configuration value: a scalar, a list, or a nested map.
///
/// # Examples
///
/// ```
/// use cfgserver::domain::ConfigValue;
///
/// let value = ConfigValue::from("42");
/// assert_eq!(value.as_i64("server.port").unwrap(), 42);
///
/// let value = ConfigValue::Integer(8080);
/// assert_eq!(value.to_string(), "8080");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigValue {
    /// An explicit null
    Null,
    /// A boolean
    Bool(bool),
    /// A signed integer
    Integer(i64),
    /// A floating point number
    Float(f64),
    /// A string, possibly containing placeholders
    String(String),
    /// An ordered list of values
    List(Vec<ConfigValue>),
    /// A nested map
    Map(PropertyMap),
}

impl ConfigValue {
    /// Returns `true` for lists and maps.
    pub fn is_structured(&self) -> bool {
        matches!(self, ConfigValue::List(_) | ConfigValue::Map(_))
    }

    /// Returns the string slice if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Converts the value to a boolean.
    ///
    /// Strings are recognised case-insensitively:
    /// - `true`: "true", "yes", "1", "on"
    /// - `false`: "false", "no", "0", "off"
    pub fn as_bool(&self, key: &str) -> Result<bool> {
        match self {
            ConfigValue::Bool(b) => Ok(*b),
            ConfigValue::Integer(i) => Ok(*i != 0),
            other => {
                let text = other.to_string();
                match text.to_lowercase().as_str() {
                    "true" | "yes" | "1" | "on" => Ok(true),
                    "false" | "no" | "0" | "off" => Ok(false),
                    _ => text
                        .parse::<bool>()
                        .map_err(|e| ConfigError::from_parse_bool_error(key.to_string(), e)),
                }
            }
        }
    }

    /// Converts the value to an `i64`.
    pub fn as_i64(&self, key: &str) -> Result<i64> {
        match self {
            ConfigValue::Integer(i) => Ok(*i),
            other => other
                .to_string()
                .parse::<i64>()
                .map_err(|e| ConfigError::from_parse_int_error(key.to_string(), e)),
        }
    }

    /// Converts the value to an `f64`.
    pub fn as_f64(&self, key: &str) -> Result<f64> {
        match self {
            ConfigValue::Float(f) => Ok(*f),
            ConfigValue::Integer(i) => Ok(*i as f64),
            other => other
                .to_string()
                .parse::<f64>()
                .map_err(|e| ConfigError::from_parse_float_error(key.to_string(), e)),
        }
    }

    /// Converts a YAML value into a configuration value.
    ///
    /// Non-string mapping keys are stringified; tagged values keep their inner
    /// value.
    pub fn from_yaml(value: serde_yaml::Value) -> Self {
        match value {
            serde_yaml::Value::Null => ConfigValue::Null,
            serde_yaml::Value::Bool(b) => ConfigValue::Bool(b),
            serde_yaml::Value::Number(n) => match n.as_i64() {
                Some(i) => ConfigValue::Integer(i),
                None => ConfigValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_yaml::Value::String(s) => ConfigValue::String(s),
            serde_yaml::Value::Sequence(seq) => {
                ConfigValue::List(seq.into_iter().map(Self::from_yaml).collect())
            }
            serde_yaml::Value::Mapping(map) => {
                let mut properties = PropertyMap::new();
                for (key, val) in map {
                    let key = match key {
                        serde_yaml::Value::String(s) => s,
                        other => Self::from_yaml(other).to_string(),
                    };
                    properties.insert(key, Self::from_yaml(val));
                }
                ConfigValue::Map(properties)
            }
            serde_yaml::Value::Tagged(tagged) => Self::from_yaml(tagged.value),
        }
    }

    /// Converts a JSON value into a configuration value.
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => ConfigValue::Null,
            serde_json::Value::Bool(b) => ConfigValue::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => ConfigValue::Integer(i),
                None => ConfigValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => ConfigValue::String(s),
            serde_json::Value::Array(items) => {
                ConfigValue::List(items.into_iter().map(Self::from_json).collect())
            }
            serde_json::Value::Object(map) => {
                let mut properties = PropertyMap::new();
                for (key, val) in map {
                    properties.insert(key, Self::from_json(val));
                }
                ConfigValue::Map(properties)
            }
        }
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::String(s)
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::String(s.to_string())
    }
}

impl From<i64> for ConfigValue {
    fn from(i: i64) -> Self {
        ConfigValue::Integer(i)
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        ConfigValue::Bool(b)
    }
}

impl From<PropertyMap> for ConfigValue {
    fn from(map: PropertyMap) -> Self {
        ConfigValue::Map(map)
    }
}

/// Scalars render as their plain text; `Null` renders empty. Structured
/// values render as inline JSON.
impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Null => Ok(()),
            ConfigValue::Bool(b) => write!(f, "{}", b),
            ConfigValue::Integer(i) => write!(f, "{}", i),
            ConfigValue::Float(x) => write!(f, "{}", x),
            ConfigValue::String(s) => f.write_str(s),
            structured => {
                let json = serde_json::to_string(structured).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

impl Serialize for ConfigValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            ConfigValue::Null => serializer.serialize_unit(),
            ConfigValue::Bool(b) => serializer.serialize_bool(*b),
            ConfigValue::Integer(i) => serializer.serialize_i64(*i),
            ConfigValue::Float(x) => serializer.serialize_f64(*x),
            ConfigValue::String(s) => serializer.serialize_str(s),
            ConfigValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            ConfigValue::Map(map) => map.serialize(serializer),
        }
    }
}

/// An insertion-ordered map from string keys to configuration values.
///
/// Inserting an existing key replaces its value in place, keeping the
/// original position.
///
/// # Examples
///
/// ```
/// use cfgserver::domain::{ConfigValue, PropertyMap};
///
/// let mut map = PropertyMap::new();
/// map.insert("b", ConfigValue::from("1"));
/// map.insert("a", ConfigValue::from("2"));
/// map.insert("b", ConfigValue::from("3"));
///
/// let keys: Vec<&str> = map.keys().collect();
/// assert_eq!(keys, vec!["b", "a"]);
/// assert_eq!(map.get("b"), Some(&ConfigValue::from("3")));
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertyMap {
    entries: Vec<(String, ConfigValue)>,
}

impl PropertyMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up a value by key.
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Looks up a value by key for modification.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut ConfigValue> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Returns `true` if the key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Inserts a value, returning the previous value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: ConfigValue) -> Option<ConfigValue> {
        let key = key.into();
        match self.get_mut(&key) {
            Some(existing) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Iterates over the keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Iterates over the entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Flattens nested maps and lists into dotted keys.
    ///
    /// Map children are joined with `.` and list elements use `[i]`. Empty
    /// maps and lists become an empty string so the key is still visible.
    ///
    /// ```
    /// use cfgserver::domain::{ConfigValue, PropertyMap};
    ///
    /// let mut db = PropertyMap::new();
    /// db.insert("hosts", ConfigValue::List(vec!["a".into(), "b".into()]));
    /// let mut root = PropertyMap::new();
    /// root.insert("db", ConfigValue::Map(db));
    ///
    /// let flat: Vec<String> = root.flatten().into_iter().map(|(k, _)| k).collect();
    /// assert_eq!(flat, vec!["db.hosts[0]", "db.hosts[1]"]);
    /// ```
    pub fn flatten(&self) -> Vec<(String, ConfigValue)> {
        let mut result = Vec::new();
        for (key, value) in &self.entries {
            flatten_into(key, value, &mut result);
        }
        result
    }
}

fn flatten_into(prefix: &str, value: &ConfigValue, result: &mut Vec<(String, ConfigValue)>) {
    match value {
        ConfigValue::Map(map) if !map.is_empty() => {
            for (key, child) in map.iter() {
                let child_prefix = if prefix.is_empty() {
                    key.to_string()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_into(&child_prefix, child, result);
            }
        }
        ConfigValue::List(items) if !items.is_empty() => {
            for (i, child) in items.iter().enumerate() {
                flatten_into(&format!("{}[{}]", prefix, i), child, result);
            }
        }
        ConfigValue::Map(_) | ConfigValue::List(_) => {
            result.push((prefix.to_string(), ConfigValue::String(String::new())));
        }
        scalar => result.push((prefix.to_string(), scalar.clone())),
    }
}

/// Largest list index accepted when rebuilding trees from dotted keys.
const MAX_LIST_INDEX: usize = 65_535;

/// One step of a dotted property key such as `routes[0].path`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PropertyKey {
    /// A map key
    Name(String),
    /// A list position
    Index(usize),
}

impl PropertyKey {
    /// Splits a flattened key into its path.
    ///
    /// A segment whose brackets do not hold a valid index is kept whole as a
    /// name.
    ///
    /// ```
    /// use cfgserver::domain::PropertyKey;
    ///
    /// assert_eq!(
    ///     PropertyKey::parse("routes[1].path"),
    ///     vec![
    ///         PropertyKey::Name("routes".to_string()),
    ///         PropertyKey::Index(1),
    ///         PropertyKey::Name("path".to_string()),
    ///     ]
    /// );
    /// ```
    pub fn parse(key: &str) -> Vec<PropertyKey> {
        let mut path = Vec::new();
        for segment in key.split('.') {
            match parse_segment(segment) {
                Some(parts) => path.extend(parts),
                None => path.push(PropertyKey::Name(segment.to_string())),
            }
        }
        path
    }
}

fn parse_segment(segment: &str) -> Option<Vec<PropertyKey>> {
    let Some(open) = segment.find('[') else {
        return Some(vec![PropertyKey::Name(segment.to_string())]);
    };
    let (name, mut rest) = segment.split_at(open);
    if name.is_empty() {
        return None;
    }
    let mut parts = vec![PropertyKey::Name(name.to_string())];
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[')?;
        let close = inner.find(']')?;
        let index: usize = inner[..close].parse().ok()?;
        if index > MAX_LIST_INDEX {
            return None;
        }
        parts.push(PropertyKey::Index(index));
        rest = &inner[close + 1..];
    }
    Some(parts)
}

impl FromIterator<(String, ConfigValue)> for PropertyMap {
    fn from_iter<I: IntoIterator<Item = (String, ConfigValue)>>(iter: I) -> Self {
        let mut map = PropertyMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl IntoIterator for PropertyMap {
    type Item = (String, ConfigValue);
    type IntoIter = std::vec::IntoIter<(String, ConfigValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for PropertyMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
