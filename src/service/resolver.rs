// SPDX-License-Identifier: MIT OR Apache-2.0

//! Property resolver: folds documents into one configuration by precedence.

use crate::domain::{ConfigDocument, ConfigValue, MergedConfig, PropertyMap, PropertySource};

/// Merges documents, earliest first.
///
/// For every key the first value seen wins. When both sides hold a map the
/// maps are merged the same way, key by key; scalars and lists replace one
/// another wholesale.
///
/// # Examples
///
/// ```rust
/// use cfgserver::domain::{ConfigDocument, ConfigValue, Coordinates, PropertyMap};
/// use cfgserver::service::PropertyResolver;
///
/// fn doc(profile: &str, pairs: &[(&str, i64)]) -> ConfigDocument {
///     let properties = pairs
///         .iter()
///         .map(|(k, v)| (k.to_string(), ConfigValue::Integer(*v)))
///         .collect::<PropertyMap>();
///     ConfigDocument::new(Coordinates::new("app", profile, None), profile, "main", properties)
/// }
///
/// let merged = PropertyResolver::new().merge(&[
///     doc("prod", &[("x", 1), ("y", 2)]),
///     doc("default", &[("y", 3), ("z", 4)]),
/// ]);
/// assert_eq!(merged.properties.get("y"), Some(&ConfigValue::Integer(2)));
/// assert_eq!(merged.properties.get("z"), Some(&ConfigValue::Integer(4)));
/// assert_eq!(merged.sources.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PropertyResolver;

impl PropertyResolver {
    /// Creates a resolver.
    pub fn new() -> Self {
        PropertyResolver
    }

    /// Merges `documents` in precedence order. Empty input yields an empty
    /// configuration.
    pub fn merge(&self, documents: &[ConfigDocument]) -> MergedConfig {
        let mut properties = PropertyMap::new();
        for document in documents {
            merge_into(&mut properties, document.properties());
        }
        MergedConfig {
            properties,
            sources: documents.iter().map(PropertySource::from_document).collect(),
        }
    }
}

/// Adds the entries of `lower` that `target` does not already decide.
fn merge_into(target: &mut PropertyMap, lower: &PropertyMap) {
    for (key, value) in lower.iter() {
        match target.get_mut(key) {
            None => {
                target.insert(key, value.clone());
            }
            Some(ConfigValue::Map(existing)) => {
                if let ConfigValue::Map(incoming) = value {
                    merge_into(existing, incoming);
                }
            }
            Some(_) => {}
        }
    }
}
