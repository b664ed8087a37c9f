// SPDX-License-Identifier: MIT OR Apache-2.0

//! Placeholder expansion.
//!
//! String values may reference other keys of the same merged configuration
//! with `${key}` or `${key:default}`. References are resolved recursively,
//! keys and defaults may themselves contain placeholders, and a value that is
//! exactly one placeholder takes the referenced value with its type.

use crate::domain::{
    ConfigError, ConfigValue, MergedConfig, PropertySource, ResolvedConfig, Result,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Default bound on nested placeholder resolution.
pub const DEFAULT_MAX_DEPTH: usize = 10;

const PREFIX: &str = "${";
const SUFFIX: char = '}';
const SEPARATOR: char = ':';

/// What to do with a placeholder whose key does not exist and that has no
/// default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceholderMode {
    /// Fail with `UnresolvablePlaceholder`.
    Strict,
    /// Leave the placeholder text in place.
    #[default]
    Lenient,
}

impl fmt::Display for PlaceholderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaceholderMode::Strict => f.write_str("strict"),
            PlaceholderMode::Lenient => f.write_str("lenient"),
        }
    }
}

impl FromStr for PlaceholderMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(PlaceholderMode::Strict),
            "lenient" => Ok(PlaceholderMode::Lenient),
            other => Err(ConfigError::Settings {
                message: format!("unknown placeholder mode '{}' (expected strict or lenient)", other),
                source: None,
            }),
        }
    }
}

/// Expands `${...}` placeholders in a merged configuration.
///
/// # Examples
///
/// ```rust
/// use cfgserver::domain::{ConfigValue, MergedConfig, PropertyMap};
/// use cfgserver::service::{PlaceholderExpander, PlaceholderMode};
///
/// let mut properties = PropertyMap::new();
/// properties.insert("host", ConfigValue::from("db.local"));
/// properties.insert("url", ConfigValue::from("jdbc://${host}:${port:5432}/app"));
/// let merged = MergedConfig { properties, sources: vec![] };
///
/// let resolved = PlaceholderExpander::new(PlaceholderMode::Strict)
///     .expand(&merged)
///     .unwrap();
/// assert_eq!(
///     resolved.get("url"),
///     Some(&ConfigValue::from("jdbc://db.local:5432/app"))
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderExpander {
    mode: PlaceholderMode,
    max_depth: usize,
}

impl Default for PlaceholderExpander {
    fn default() -> Self {
        Self::new(PlaceholderMode::default())
    }
}

impl PlaceholderExpander {
    /// Creates an expander with the default depth limit.
    pub fn new(mode: PlaceholderMode) -> Self {
        Self {
            mode,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Sets the depth limit for nested references.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// The configured mode.
    pub fn mode(&self) -> PlaceholderMode {
        self.mode
    }

    /// The depth limit for nested references.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Expands every value of `config`.
    ///
    /// Property sources are rendered against the merged view in lenient
    /// mode, so a shadowed value never fails the request.
    ///
    /// # Errors
    ///
    /// * `CyclicReference` - A chain of references leads back to itself
    /// * `PlaceholderDepthExceeded` - References nest deeper than the limit
    /// * `UnresolvablePlaceholder` - Strict mode only
    pub fn expand(&self, config: &MergedConfig) -> Result<ResolvedConfig> {
        let flat = config.properties.flatten();
        let mut expansion = Expansion::new(&flat, self.mode, self.max_depth);

        let mut properties = Vec::with_capacity(flat.len());
        for (key, _) in &flat {
            let value = expansion
                .resolve(key)?
                .unwrap_or(ConfigValue::Null);
            properties.push((key.clone(), value));
        }

        expansion.mode = PlaceholderMode::Lenient;
        let mut sources = Vec::with_capacity(config.sources.len());
        for source in &config.sources {
            let mut rendered = Vec::with_capacity(source.source.len());
            for (key, value) in &source.source {
                let value = match value {
                    ConfigValue::String(text) => expansion.expand_text(text, key)?,
                    other => other.clone(),
                };
                rendered.push((key.clone(), value));
            }
            sources.push(PropertySource {
                name: source.name.clone(),
                source: rendered,
            });
        }

        Ok(ResolvedConfig {
            properties,
            sources,
        })
    }
}

/// State for one `expand` call: the raw values, the values resolved so
/// far and the chain of keys being resolved.
struct Expansion<'a> {
    raw: HashMap<&'a str, &'a ConfigValue>,
    resolved: HashMap<String, ConfigValue>,
    visiting: Vec<String>,
    /// Tokens currently open inside the value being expanded.
    nesting: usize,
    mode: PlaceholderMode,
    max_depth: usize,
}

impl<'a> Expansion<'a> {
    fn new(flat: &'a [(String, ConfigValue)], mode: PlaceholderMode, max_depth: usize) -> Self {
        Self {
            raw: flat.iter().map(|(k, v)| (k.as_str(), v)).collect(),
            resolved: HashMap::new(),
            visiting: Vec::new(),
            nesting: 0,
            mode,
            max_depth,
        }
    }

    /// The fully expanded value of `key`, or `None` if the key is absent.
    fn resolve(&mut self, key: &str) -> Result<Option<ConfigValue>> {
        if let Some(value) = self.resolved.get(key) {
            return Ok(Some(value.clone()));
        }
        if let Some(start) = self.visiting.iter().position(|k| k == key) {
            let mut cycle = self.visiting[start..].to_vec();
            cycle.push(key.to_string());
            return Err(ConfigError::CyclicReference { cycle });
        }
        let Some(raw) = self.raw.get(key).copied() else {
            return Ok(None);
        };
        let ConfigValue::String(text) = raw else {
            return Ok(Some(raw.clone()));
        };
        if self.visiting.len() >= self.max_depth {
            return Err(ConfigError::PlaceholderDepthExceeded {
                key: self.visiting.first().cloned().unwrap_or_else(|| key.to_string()),
                max_depth: self.max_depth,
            });
        }

        self.visiting.push(key.to_string());
        let outer_nesting = std::mem::replace(&mut self.nesting, 0);
        let expanded = self.expand_text(text, key);
        self.nesting = outer_nesting;
        self.visiting.pop();

        let expanded = expanded?;
        self.resolved.insert(key.to_string(), expanded.clone());
        Ok(Some(expanded))
    }

    /// Expands every placeholder in `text`, the value of `owner`.
    fn expand_text(&mut self, text: &str, owner: &str) -> Result<ConfigValue> {
        let Some(first) = text.find(PREFIX) else {
            return Ok(ConfigValue::String(text.to_string()));
        };
        if first == 0 {
            if let Some(end) = token_end(text, 0) {
                if end == text.len() {
                    return self.expand_token(&text[PREFIX.len()..end - 1], text, owner);
                }
            }
        }

        let mut output = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find(PREFIX) {
            output.push_str(&rest[..start]);
            let Some(end) = token_end(rest, start) else {
                // Unterminated: keep the remainder as written.
                output.push_str(&rest[start..]);
                return Ok(ConfigValue::String(output));
            };
            let token = &rest[start..end];
            let value = self.expand_token(&token[PREFIX.len()..token.len() - 1], token, owner)?;
            output.push_str(&value.to_string());
            rest = &rest[end..];
        }
        output.push_str(rest);
        Ok(ConfigValue::String(output))
    }

    /// Resolves the body of one `${...}` token, bounding how deeply tokens
    /// nest inside keys and defaults.
    fn expand_token(&mut self, body: &str, token: &str, owner: &str) -> Result<ConfigValue> {
        if self.nesting >= self.max_depth {
            return Err(ConfigError::PlaceholderDepthExceeded {
                key: owner.to_string(),
                max_depth: self.max_depth,
            });
        }
        self.nesting += 1;
        let value = self.expand_token_body(body, token, owner);
        self.nesting -= 1;
        value
    }

    fn expand_token_body(&mut self, body: &str, token: &str, owner: &str) -> Result<ConfigValue> {
        let (key_text, default) = split_default(body);
        let key = self.expand_text(key_text, owner)?.to_string();
        let key = key.trim();

        if let Some(value) = self.resolve(key)? {
            return Ok(value);
        }
        if let Some(default) = default {
            return self.expand_text(default, owner);
        }
        match self.mode {
            PlaceholderMode::Strict => Err(ConfigError::UnresolvablePlaceholder {
                key: owner.to_string(),
                placeholder: token.to_string(),
            }),
            PlaceholderMode::Lenient => Ok(ConfigValue::String(token.to_string())),
        }
    }
}

/// Byte offset just past the `}` closing the token that starts at `start`,
/// honoring nested tokens.
fn token_end(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = start;
    while i < bytes.len() {
        if bytes[i..].starts_with(PREFIX.as_bytes()) {
            depth += 1;
            i += PREFIX.len();
            continue;
        }
        if bytes[i] == SUFFIX as u8 {
            depth -= 1;
            if depth == 0 {
                return Some(i + 1);
            }
        }
        i += 1;
    }
    None
}

/// Splits `key:default` at the first separator outside nested tokens.
fn split_default(body: &str) -> (&str, Option<&str>) {
    let bytes = body.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i..].starts_with(PREFIX.as_bytes()) {
            depth += 1;
            i += PREFIX.len();
            continue;
        }
        match bytes[i] {
            b if b == SUFFIX as u8 && depth > 0 => depth -= 1,
            b if b == SEPARATOR as u8 && depth == 0 => {
                return (&body[..i], Some(&body[i + 1..]));
            }
            _ => {}
        }
        i += 1;
    }
    (body, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PropertyMap;

    fn merged(yaml: &str) -> MergedConfig {
        let properties = match ConfigValue::from_yaml(serde_yaml::from_str(yaml).unwrap()) {
            ConfigValue::Map(map) => map,
            _ => PropertyMap::new(),
        };
        MergedConfig {
            properties,
            sources: vec![],
        }
    }

    fn strict(yaml: &str) -> Result<ResolvedConfig> {
        PlaceholderExpander::new(PlaceholderMode::Strict).expand(&merged(yaml))
    }

    fn lenient(yaml: &str) -> Result<ResolvedConfig> {
        PlaceholderExpander::new(PlaceholderMode::Lenient).expand(&merged(yaml))
    }

    fn text(value: &str) -> ConfigValue {
        ConfigValue::from(value)
    }

    #[test]
    fn test_expand_without_placeholders_is_identity() {
        let config = merged("a: 1\nb:\n  c: text\nd: [x, y]");
        let resolved = PlaceholderExpander::default().expand(&config).unwrap();
        assert_eq!(resolved.properties, config.properties.flatten());
    }

    #[test]
    fn test_expand_simple_reference() {
        let resolved = strict("host: db\nurl: 'jdbc://${host}/x'").unwrap();
        assert_eq!(resolved.get("url"), Some(&text("jdbc://db/x")));
    }

    #[test]
    fn test_expand_chain() {
        let resolved = strict("a: '${b}-a'\nb: '${c}-b'\nc: c").unwrap();
        assert_eq!(resolved.get("a"), Some(&text("c-b-a")));
    }

    #[test]
    fn test_expand_dotted_and_indexed_keys() {
        let resolved = strict("db:\n  hosts: [one, two]\nprimary: '${db.hosts[1]}'").unwrap();
        assert_eq!(resolved.get("primary"), Some(&text("two")));
    }

    #[test]
    fn test_single_token_keeps_type() {
        let resolved = strict("port: 8080\nserver:\n  port: '${port}'").unwrap();
        assert_eq!(resolved.get("server.port"), Some(&ConfigValue::Integer(8080)));
    }

    #[test]
    fn test_embedded_token_stringifies() {
        let resolved = strict("port: 8080\naddr: 'localhost:${port}'").unwrap();
        assert_eq!(resolved.get("addr"), Some(&text("localhost:8080")));
    }

    #[test]
    fn test_default_used_when_missing() {
        let resolved = strict("url: '${db.url:jdbc://localhost}'").unwrap();
        assert_eq!(resolved.get("url"), Some(&text("jdbc://localhost")));
    }

    #[test]
    fn test_default_ignored_when_present() {
        let resolved = strict("db:\n  url: real\nurl: '${db.url:fallback}'").unwrap();
        assert_eq!(resolved.get("url"), Some(&text("real")));
    }

    #[test]
    fn test_default_is_expanded() {
        let resolved = strict("fallback: fb\nurl: '${missing:${fallback}}'").unwrap();
        assert_eq!(resolved.get("url"), Some(&text("fb")));
    }

    #[test]
    fn test_empty_default() {
        let resolved = strict("url: 'x${missing:}y'").unwrap();
        assert_eq!(resolved.get("url"), Some(&text("xy")));
    }

    #[test]
    fn test_nested_key() {
        let resolved = strict("env: prod\nhost-prod: p.example\nhost: '${host-${env}}'").unwrap();
        assert_eq!(resolved.get("host"), Some(&text("p.example")));
    }

    #[test]
    fn test_cycle_detected() {
        let err = strict("a: '${b}'\nb: '${a}'").unwrap_err();
        let ConfigError::CyclicReference { cycle } = err else {
            panic!("expected a cycle");
        };
        assert_eq!(cycle, vec!["a", "b", "a"]);
    }

    #[test]
    fn test_cycle_detected_in_lenient_mode() {
        assert!(matches!(
            lenient("a: '${a}'"),
            Err(ConfigError::CyclicReference { .. })
        ));
    }

    #[test]
    fn test_cycle_through_default() {
        let err = strict("a: '${missing:${b}}'\nb: '${a}'").unwrap_err();
        assert!(matches!(err, ConfigError::CyclicReference { .. }));
    }

    #[test]
    fn test_strict_unresolvable() {
        let err = strict("url: 'jdbc://${db.host}'").unwrap_err();
        let ConfigError::UnresolvablePlaceholder { key, placeholder } = err else {
            panic!("expected unresolvable placeholder");
        };
        assert_eq!(key, "url");
        assert_eq!(placeholder, "${db.host}");
    }

    #[test]
    fn test_lenient_keeps_token() {
        let resolved = lenient("url: 'jdbc://${db.host}/x'").unwrap();
        assert_eq!(resolved.get("url"), Some(&text("jdbc://${db.host}/x")));
    }

    #[test]
    fn test_unterminated_token_is_literal() {
        let resolved = strict("a: x\nb: '${a} and ${a'").unwrap();
        assert_eq!(resolved.get("b"), Some(&text("x and ${a")));
    }

    #[test]
    fn test_depth_exceeded() {
        let yaml = (0..12)
            .map(|i| format!("k{}: '${{k{}}}'", i, i + 1))
            .chain(std::iter::once("k12: end".to_string()))
            .collect::<Vec<_>>()
            .join("\n");
        let err = strict(&yaml).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::PlaceholderDepthExceeded { max_depth: 10, .. }
        ));

        let resolved = PlaceholderExpander::new(PlaceholderMode::Strict)
            .with_max_depth(20)
            .expand(&merged(&yaml))
            .unwrap();
        assert_eq!(resolved.get("k0"), Some(&text("end")));
    }

    #[test]
    fn test_nested_tokens_bounded() {
        let nested = |n: usize| format!("{}{}", "${".repeat(n), "}".repeat(n));

        let mut properties = PropertyMap::new();
        properties.insert("deep", text(&nested(10_000)));
        let config = MergedConfig {
            properties,
            sources: vec![],
        };
        for mode in [PlaceholderMode::Strict, PlaceholderMode::Lenient] {
            let err = PlaceholderExpander::new(mode).expand(&config).unwrap_err();
            let ConfigError::PlaceholderDepthExceeded { key, max_depth } = err else {
                panic!("expected depth error");
            };
            assert_eq!(key, "deep");
            assert_eq!(max_depth, 10);
        }

        let mut properties = PropertyMap::new();
        properties.insert("shallow", text(&nested(11)));
        let config = MergedConfig {
            properties,
            sources: vec![],
        };
        assert!(PlaceholderExpander::default().expand(&config).is_err());
        assert!(PlaceholderExpander::default()
            .with_max_depth(12)
            .expand(&config)
            .is_ok());
    }

    #[test]
    fn test_nested_defaults_within_limit() {
        let resolved = strict("c: found
v: '${a:${b:${c}}}'").unwrap();
        assert_eq!(resolved.get("v"), Some(&text("found")));
    }

    #[test]
    fn test_sources_rendered_leniently() {
        let mut config = merged("host: db\nurl: '${host}'");
        config.sources = vec![PropertySource {
            name: "default".to_string(),
            source: vec![
                ("url".to_string(), text("${host}/${missing}")),
                ("port".to_string(), ConfigValue::Integer(1)),
            ],
        }];
        let resolved = PlaceholderExpander::new(PlaceholderMode::Strict)
            .expand(&config)
            .unwrap();
        assert_eq!(
            resolved.sources[0].source,
            vec![
                ("url".to_string(), text("db/${missing}")),
                ("port".to_string(), ConfigValue::Integer(1)),
            ]
        );
    }

    #[test]
    fn test_placeholder_mode_from_str() {
        assert_eq!("STRICT".parse::<PlaceholderMode>().unwrap(), PlaceholderMode::Strict);
        assert_eq!(" lenient ".parse::<PlaceholderMode>().unwrap(), PlaceholderMode::Lenient);
        assert!("loose".parse::<PlaceholderMode>().is_err());
        assert_eq!(PlaceholderMode::default(), PlaceholderMode::Lenient);
    }

    #[test]
    fn test_split_default() {
        assert_eq!(split_default("a"), ("a", None));
        assert_eq!(split_default("a:b:c"), ("a", Some("b:c")));
        assert_eq!(split_default("${x:y}:z"), ("${x:y}", Some("z")));
    }

    #[test]
    fn test_token_end() {
        assert_eq!(token_end("${a}", 0), Some(4));
        assert_eq!(token_end("${a:${b}}x", 0), Some(9));
        assert_eq!(token_end("${a", 0), None);
    }
}
