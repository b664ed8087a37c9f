// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON document parser.

use crate::domain::{ConfigError, ConfigValue, PropertyMap, Result};
use crate::ports::ConfigParser;

/// Parses JSON documents. The top level must be an object; blank content
/// parses to an empty map.
///
/// Object keys come back in sorted order.
#[derive(Debug, Clone, Default)]
pub struct JsonParser;

impl JsonParser {
    /// Creates a new JSON parser.
    pub fn new() -> Self {
        JsonParser
    }
}

impl ConfigParser for JsonParser {
    fn parse(&self, content: &str) -> Result<PropertyMap> {
        if content.trim().is_empty() {
            return Ok(PropertyMap::new());
        }

        let value: serde_json::Value =
            serde_json::from_str(content).map_err(|e| ConfigError::Parse {
                message: format!("Failed to parse JSON: {}", e),
                source: Some(Box::new(e)),
            })?;

        match ConfigValue::from_json(value) {
            ConfigValue::Map(map) => Ok(map),
            _ => Err(ConfigError::Parse {
                message: "JSON document must be an object at the top level".to_string(),
                source: None,
            }),
        }
    }

    fn supported_extensions(&self) -> &[&str] {
        &["json"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_parser_object() {
        let result = JsonParser::new()
            .parse(r#"{"server": {"port": 8080}, "name": "billing"}"#)
            .unwrap();
        assert_eq!(
            result.flatten(),
            vec![
                ("name".to_string(), ConfigValue::from("billing")),
                ("server.port".to_string(), ConfigValue::Integer(8080)),
            ]
        );
    }

    #[test]
    fn test_json_parser_blank() {
        assert!(JsonParser::new().parse("  \n").unwrap().is_empty());
    }

    #[test]
    fn test_json_parser_rejects_array() {
        assert!(matches!(
            JsonParser::new().parse("[1, 2]"),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_json_parser_invalid() {
        assert!(JsonParser::new().parse("{\"a\": ").is_err());
    }
}
