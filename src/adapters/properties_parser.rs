// SPDX-License-Identifier: MIT OR Apache-2.0

//! Java-style `.properties` document parser.
//!
//! Supports `key=value`, `key: value` and `key value` lines, `#` and `!`
//! comments, backslash line continuations and the common escapes. Dotted
//! keys and `[i]` indices are nested, so `db.hosts[0]=a` yields the same tree
//! as the equivalent YAML document. Keys that cannot nest without losing an
//! entry stay whole. All values are strings.

use std::iter::Peekable;
use std::str::Chars;

use crate::domain::document::insert_property;
use crate::domain::{ConfigValue, PropertyMap, Result};
use crate::ports::ConfigParser;

/// Properties parser implementation.
///
/// # Examples
///
/// ```rust
/// use cfgserver::adapters::PropertiesParser;
/// use cfgserver::domain::ConfigValue;
/// use cfgserver::ports::ConfigParser;
///
/// let parser = PropertiesParser::new();
/// let result = parser.parse("# comment\nserver.port=8080\nserver.host: localhost").unwrap();
/// assert_eq!(
///     result.flatten(),
///     vec![
///         ("server.port".to_string(), ConfigValue::from("8080")),
///         ("server.host".to_string(), ConfigValue::from("localhost")),
///     ]
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct PropertiesParser;

impl PropertiesParser {
    /// Creates a new properties parser.
    pub fn new() -> Self {
        PropertiesParser
    }

    /// Joins continuation lines and drops comments and blank lines.
    fn logical_lines(content: &str) -> Vec<String> {
        let mut lines = Vec::new();
        let mut current = String::new();
        let mut continuing = false;

        for raw in content.lines() {
            let line = if continuing {
                raw.trim_start()
            } else {
                let trimmed = raw.trim_start();
                if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                    continue;
                }
                trimmed
            };

            // An odd number of trailing backslashes continues the line.
            let trailing = line.chars().rev().take_while(|c| *c == '\\').count();
            if trailing % 2 == 1 {
                current.push_str(&line[..line.len() - 1]);
                continuing = true;
            } else {
                current.push_str(line);
                lines.push(std::mem::take(&mut current));
                continuing = false;
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
        lines
    }

    /// Splits a logical line at the first unescaped `=`, `:` or whitespace.
    fn split_entry(line: &str) -> (String, String) {
        let mut key = String::new();
        let mut chars = line.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '\\' => push_escaped(&mut key, &mut chars),
                '=' | ':' => break,
                c if c.is_whitespace() => {
                    while chars.peek().is_some_and(|c| c.is_whitespace()) {
                        chars.next();
                    }
                    if matches!(chars.peek(), Some('=') | Some(':')) {
                        chars.next();
                    }
                    break;
                }
                c => key.push(c),
            }
        }

        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }

        let mut value = String::new();
        while let Some(c) = chars.next() {
            if c == '\\' {
                push_escaped(&mut value, &mut chars);
            } else {
                value.push(c);
            }
        }
        (key, value)
    }
}

/// Decodes the escape following a backslash. A malformed `\uXXXX` is kept
/// literally.
fn push_escaped(out: &mut String, chars: &mut Peekable<Chars<'_>>) {
    let Some(c) = chars.next() else {
        return;
    };
    match c {
        'n' => out.push('\n'),
        't' => out.push('\t'),
        'r' => out.push('\r'),
        'f' => out.push('\u{000C}'),
        'u' => {
            let digits: String = chars.clone().take(4).collect();
            let decoded = (digits.len() == 4 && digits.chars().all(|d| d.is_ascii_hexdigit()))
                .then(|| u32::from_str_radix(&digits, 16).ok())
                .flatten()
                .and_then(char::from_u32);
            match decoded {
                Some(ch) => {
                    out.push(ch);
                    for _ in 0..4 {
                        chars.next();
                    }
                }
                None => out.push('u'),
            }
        }
        other => out.push(other),
    }
}

impl ConfigParser for PropertiesParser {
    fn parse(&self, content: &str) -> Result<PropertyMap> {
        let mut root = PropertyMap::new();
        for line in Self::logical_lines(content) {
            let (key, value) = Self::split_entry(&line);
            if key.is_empty() {
                continue;
            }
            insert_property(&mut root, &key, ConfigValue::String(value));
        }
        Ok(root)
    }

    fn supported_extensions(&self) -> &[&str] {
        &["properties"]
    }
}
