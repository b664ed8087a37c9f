// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration parser trait definition.
//!
//! This module defines the `ConfigParser` trait, which provides an interface for
//! parsing configuration documents in different formats (YAML, properties,
//! JSON, etc.).

use crate::domain::{PropertyMap, Result};

/// A trait for parsing configuration documents.
///
/// Parsers turn the raw text of a document into a property tree. Nested
/// structures stay nested; flattening to dotted keys happens later, when
/// property sources are rendered.
///
/// A document must describe a mapping at its top level. Empty documents
/// parse to an empty map.
///
/// # Examples
///
/// ```rust
/// use cfgserver::domain::{ConfigValue, PropertyMap, Result};
/// use cfgserver::ports::ConfigParser;
///
/// struct LineParser;
///
/// impl ConfigParser for LineParser {
///     fn parse(&self, content: &str) -> Result<PropertyMap> {
///         Ok(content
///             .lines()
///             .filter_map(|l| l.split_once(' '))
///             .map(|(k, v)| (k.to_string(), ConfigValue::from(v)))
///             .collect())
///     }
///
///     fn supported_extensions(&self) -> &[&str] {
///         &["lines"]
///     }
/// }
///
/// let map = LineParser.parse("a 1\nb 2").unwrap();
/// assert_eq!(map.len(), 2);
/// ```
pub trait ConfigParser: Send + Sync {
    /// Parses document content into a property tree.
    ///
    /// # Returns
    ///
    /// * `Ok(PropertyMap)` - The parsed document
    /// * `Err(ConfigError::Parse)` - The content is not valid for this format
    fn parse(&self, content: &str) -> Result<PropertyMap>;

    /// Returns the file extensions supported by this parser, without the
    /// leading dot. The repository tries them in order.
    fn supported_extensions(&self) -> &[&str];
}
