// SPDX-License-Identifier: MIT OR Apache-2.0

//! Renders a resolved configuration as a single document.

use std::fmt::Write as _;
use std::str::FromStr;

use crate::domain::{ConfigError, ResolvedConfig, Result};

/// Output format of the document endpoints, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `.json`
    Json,
    /// `.yml` or `.yaml`
    Yaml,
    /// `.properties`
    Properties,
}

impl FromStr for Format {
    type Err = ConfigError;

    fn from_str(extension: &str) -> Result<Self> {
        match extension {
            "json" => Ok(Format::Json),
            "yml" | "yaml" => Ok(Format::Yaml),
            "properties" => Ok(Format::Properties),
            other => Err(ConfigError::invalid_request(format!(
                "unsupported format '{other}'"
            ))),
        }
    }
}

impl Format {
    /// The response content type.
    pub fn content_type(self) -> &'static str {
        match self {
            Format::Json => "application/json",
            Format::Yaml | Format::Properties => "text/plain; charset=utf-8",
        }
    }

    /// Renders `config` in this format.
    pub fn render(self, config: &ResolvedConfig) -> Result<String> {
        match self {
            Format::Json => serde_json::to_string_pretty(&config.to_tree()).map_err(|e| {
                ConfigError::Parse {
                    message: format!("failed to render JSON: {e}"),
                    source: Some(Box::new(e)),
                }
            }),
            Format::Yaml => {
                if config.is_empty() {
                    return Ok("{}\n".to_string());
                }
                serde_yaml::to_string(&config.to_tree()).map_err(|e| ConfigError::Parse {
                    message: format!("failed to render YAML: {e}"),
                    source: Some(Box::new(e)),
                })
            }
            Format::Properties => {
                let mut out = String::new();
                for (key, value) in &config.properties {
                    let value = value.to_string().replace('\\', "\\\\").replace('\n', "\\n");
                    let _ = writeln!(out, "{key}: {value}");
                }
                Ok(out)
            }
        }
    }
}
