// SPDX-License-Identifier: MIT OR Apache-2.0

//! YAML document parser.
//!
//! This module provides a parser that reads configuration documents written
//! in YAML. Nested mappings and sequences are kept as a tree.

use crate::domain::{ConfigError, ConfigValue, PropertyMap, Result};
use crate::ports::ConfigParser;

/// YAML parser implementation.
///
/// The document must be a mapping at its top level. An empty document, or one
/// that only contains comments, parses to an empty map.
///
/// # Examples
///
/// ```rust
/// use cfgserver::adapters::YamlParser;
/// use cfgserver::domain::ConfigValue;
/// use cfgserver::ports::ConfigParser;
///
/// let parser = YamlParser::new();
/// let yaml_content = "database:\n  host: localhost\n  port: 5432";
/// let result = parser.parse(yaml_content).unwrap();
/// let flat = result.flatten();
/// assert_eq!(flat[0], ("database.host".to_string(), ConfigValue::from("localhost")));
/// assert_eq!(flat[1], ("database.port".to_string(), ConfigValue::Integer(5432)));
/// ```
#[derive(Debug, Clone)]
pub struct YamlParser;

impl YamlParser {
    /// Creates a new YAML parser.
    pub fn new() -> Self {
        YamlParser
    }
}

impl Default for YamlParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigParser for YamlParser {
    fn parse(&self, content: &str) -> Result<PropertyMap> {
        let value: serde_yaml::Value =
            serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
                message: format!("Failed to parse YAML: {}", e),
                source: Some(Box::new(e)),
            })?;

        match ConfigValue::from_yaml(value) {
            ConfigValue::Map(map) => Ok(map),
            ConfigValue::Null => Ok(PropertyMap::new()),
            _ => Err(ConfigError::Parse {
                message: "YAML document must be a mapping at the top level".to_string(),
                source: None,
            }),
        }
    }

    fn supported_extensions(&self) -> &[&str] {
        &["yml", "yaml"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_parser_simple() {
        let parser = YamlParser::new();
        let result = parser.parse("key1: value1\nkey2: value2").unwrap();

        assert_eq!(result.get("key1"), Some(&ConfigValue::from("value1")));
        assert_eq!(result.get("key2"), Some(&ConfigValue::from("value2")));
    }

    #[test]
    fn test_yaml_parser_nested() {
        let parser = YamlParser::new();
        let yaml = r#"
database:
  host: localhost
  port: 5432
"#;
        let result = parser.parse(yaml).unwrap();
        let Some(ConfigValue::Map(database)) = result.get("database") else {
            panic!("expected a nested map");
        };
        assert_eq!(database.get("host"), Some(&ConfigValue::from("localhost")));
        assert_eq!(database.get("port"), Some(&ConfigValue::Integer(5432)));
    }

    #[test]
    fn test_yaml_parser_preserves_order() {
        let parser = YamlParser::new();
        let result = parser.parse("zeta: 1\nalpha: 2\nmid: 3").unwrap();
        assert_eq!(result.keys().collect::<Vec<_>>(), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_yaml_parser_array() {
        let parser = YamlParser::new();
        let yaml = r#"
servers:
  - server1
  - server2
"#;
        let result = parser.parse(yaml).unwrap();
        assert_eq!(
            result.get("servers"),
            Some(&ConfigValue::List(vec![
                ConfigValue::from("server1"),
                ConfigValue::from("server2"),
            ]))
        );
    }

    #[test]
    fn test_yaml_parser_mixed_types() {
        let parser = YamlParser::new();
        let yaml = r#"
string_val: hello
int_val: 42
float_val: 2.5
bool_val: true
null_val: null
"#;
        let result = parser.parse(yaml).unwrap();
        assert_eq!(result.get("string_val"), Some(&ConfigValue::from("hello")));
        assert_eq!(result.get("int_val"), Some(&ConfigValue::Integer(42)));
        assert_eq!(result.get("float_val"), Some(&ConfigValue::Float(2.5)));
        assert_eq!(result.get("bool_val"), Some(&ConfigValue::Bool(true)));
        assert_eq!(result.get("null_val"), Some(&ConfigValue::Null));
    }

    #[test]
    fn test_yaml_parser_empty_document() {
        let parser = YamlParser::new();
        assert!(parser.parse("").unwrap().is_empty());
        assert!(parser.parse("# only a comment\n").unwrap().is_empty());
    }

    #[test]
    fn test_yaml_parser_rejects_non_mapping() {
        let parser = YamlParser::new();
        assert!(matches!(
            parser.parse("- a\n- b"),
            Err(ConfigError::Parse { .. })
        ));
        assert!(parser.parse("just a string").is_err());
    }

    #[test]
    fn test_yaml_parser_invalid() {
        let parser = YamlParser::new();
        let result = parser.parse("invalid: yaml: content: [");
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_yaml_parser_supported_extensions() {
        let parser = YamlParser::new();
        assert_eq!(parser.supported_extensions(), &["yml", "yaml"]);
    }
}
