// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration documents and the views derived from them.
//!
//! A [`ConfigDocument`] is what a store hands back for one set of
//! coordinates. The resolver folds documents into a [`MergedConfig`], and
//! the expander turns that into a [`ResolvedConfig`]. The router wraps the
//! result with request metadata in an [`Environment`].

use crate::domain::config_value::{ConfigValue, PropertyKey, PropertyMap};
use crate::domain::coordinates::Coordinates;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// A parsed configuration document. Immutable once fetched.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfigDocument {
    coordinates: Coordinates,
    name: String,
    version: String,
    properties: PropertyMap,
}

impl ConfigDocument {
    /// Creates a document.
    ///
    /// # Arguments
    ///
    /// * `coordinates` - What the document was fetched for
    /// * `name` - Origin name, e.g. `file:main:billing-prod.yml`
    /// * `version` - The store reference actually read
    /// * `properties` - The document's key-value tree
    pub fn new(
        coordinates: Coordinates,
        name: impl Into<String>,
        version: impl Into<String>,
        properties: PropertyMap,
    ) -> Self {
        Self {
            coordinates,
            name: name.into(),
            version: version.into(),
            properties,
        }
    }

    /// The coordinates this document was fetched for.
    pub fn coordinates(&self) -> &Coordinates {
        &self.coordinates
    }

    /// The origin name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The store reference the document was read from.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The document's properties.
    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }
}

/// One contributing document, flattened to dotted keys.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PropertySource {
    /// Origin name of the document
    pub name: String,
    /// Flattened key-value pairs in document order
    #[serde(serialize_with = "serialize_pairs")]
    pub source: Vec<(String, ConfigValue)>,
}

impl PropertySource {
    /// Flattens a document into a property source.
    pub fn from_document(document: &ConfigDocument) -> Self {
        Self {
            name: document.name().to_string(),
            source: document.properties().flatten(),
        }
    }
}

/// Documents folded by precedence; the front-most value wins.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MergedConfig {
    /// The merged key-value tree
    pub properties: PropertyMap,
    /// Contributing documents in precedence order
    pub sources: Vec<PropertySource>,
}

impl MergedConfig {
    /// Returns `true` when no document contributed anything.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.sources.is_empty()
    }
}

/// A merged configuration with all placeholders expanded.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolvedConfig {
    /// Expanded flat properties in merged order
    pub properties: Vec<(String, ConfigValue)>,
    /// Property sources with expanded values, in precedence order
    pub sources: Vec<PropertySource>,
}

impl ResolvedConfig {
    /// Looks up an expanded value by its dotted key.
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Returns `true` when there are no properties.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Rebuilds a nested tree from the flat dotted keys.
    ///
    /// `a.b[1]` becomes map `a`, child list `b`, element 1. A key that does
    /// not fit the tree built so far (a leaf that is also a parent, or a
    /// list index past the end) is kept whole as a top-level key.
    ///
    /// ```
    /// use cfgserver::domain::{ConfigValue, ResolvedConfig};
    ///
    /// let resolved = ResolvedConfig {
    ///     properties: vec![
    ///         ("db.hosts[0]".to_string(), ConfigValue::from("a")),
    ///         ("db.port".to_string(), ConfigValue::Integer(5432)),
    ///     ],
    ///     sources: vec![],
    /// };
    /// let json = serde_json::to_string(&resolved.to_tree()).unwrap();
    /// assert_eq!(json, r#"{"db":{"hosts":["a"],"port":5432}}"#);
    /// ```
    pub fn to_tree(&self) -> PropertyMap {
        let mut root = PropertyMap::new();
        for (key, value) in &self.properties {
            insert_property(&mut root, key, value.clone());
        }
        root
    }
}

/// Inserts `value` at the dotted `key`, nesting maps and lists.
///
/// Nothing already in `root` is lost. When the key collides with the tree
/// (`logging.level` is a leaf and `logging.level.root` arrives, or the
/// reverse) or names a list slot past the end, the key is stored whole at
/// the top level instead. A later duplicate of a leaf replaces it.
pub(crate) fn insert_property(root: &mut PropertyMap, key: &str, value: ConfigValue) {
    let path = PropertyKey::parse(key);
    let Some((PropertyKey::Name(head), rest)) = path.split_first() else {
        root.insert(key, value);
        return;
    };

    let fits_tree = match root.get(head) {
        Some(child) => fits(child, rest),
        None => fits(&ConfigValue::Null, rest),
    };
    if fits_tree {
        if !root.contains_key(head) {
            root.insert(head.clone(), ConfigValue::Null);
        }
        if let Some(child) = root.get_mut(head) {
            insert_path(child, rest, value);
        }
        return;
    }

    if !rest.is_empty() {
        root.insert(key, value);
        return;
    }

    // A top-level leaf displacing a subtree: the subtree's entries stay as
    // whole keys.
    if let Some(displaced) = root.insert(head.clone(), value) {
        let mut holder = PropertyMap::new();
        holder.insert(head.clone(), displaced);
        for (flat_key, flat_value) in holder.flatten() {
            if flat_key != *head {
                root.insert(flat_key, flat_value);
            }
        }
    }
}

/// Whether `path` can be written under `node` without replacing a leaf or a
/// subtree and without skipping list slots.
fn fits(node: &ConfigValue, path: &[PropertyKey]) -> bool {
    let Some((head, rest)) = path.split_first() else {
        return !node.is_structured();
    };
    match (head, node) {
        (PropertyKey::Name(name), ConfigValue::Map(map)) => match map.get(name) {
            Some(child) => fits(child, rest),
            None => fits(&ConfigValue::Null, rest),
        },
        (PropertyKey::Name(_), ConfigValue::Null) => fits(&ConfigValue::Null, rest),
        (PropertyKey::Index(index), ConfigValue::List(items)) => match items.get(*index) {
            Some(child) => fits(child, rest),
            None => *index == items.len() && fits(&ConfigValue::Null, rest),
        },
        (PropertyKey::Index(index), ConfigValue::Null) => {
            *index == 0 && fits(&ConfigValue::Null, rest)
        }
        _ => false,
    }
}

fn insert_path(node: &mut ConfigValue, path: &[PropertyKey], value: ConfigValue) {
    let Some((head, rest)) = path.split_first() else {
        *node = value;
        return;
    };
    match head {
        PropertyKey::Name(name) => {
            if !matches!(node, ConfigValue::Map(_)) {
                *node = ConfigValue::Map(PropertyMap::new());
            }
            if let ConfigValue::Map(map) = node {
                if !map.contains_key(name) {
                    map.insert(name.clone(), ConfigValue::Null);
                }
                if let Some(child) = map.get_mut(name) {
                    insert_path(child, rest, value);
                }
            }
        }
        PropertyKey::Index(index) => {
            if !matches!(node, ConfigValue::List(_)) {
                *node = ConfigValue::List(Vec::new());
            }
            if let ConfigValue::List(items) = node {
                if items.len() <= *index {
                    items.resize(*index + 1, ConfigValue::Null);
                }
                insert_path(&mut items[*index], rest, value);
            }
        }
    }
}

/// The router's answer for one request.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    /// Application name
    pub name: String,
    /// Effective profiles in precedence order
    pub profiles: Vec<String>,
    /// The requested label
    pub label: Option<String>,
    /// The store reference of the highest-precedence document, if any
    pub version: Option<String>,
    /// Expanded property sources in precedence order
    #[serde(rename = "propertySources", serialize_with = "serialize_sources")]
    pub config: ResolvedConfig,
}

fn serialize_pairs<S: Serializer>(
    pairs: &[(String, ConfigValue)],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(pairs.len()))?;
    for (key, value) in pairs {
        map.serialize_entry(key, value)?;
    }
    map.end()
}

fn serialize_sources<S: Serializer>(
    config: &ResolvedConfig,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    config.sources.serialize(serializer)
}
