// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapters layer containing store, parser and watcher implementations.
//!
//! This module contains concrete implementations of the traits defined in
//! the ports layer: document stores, document parsers and change watchers.

pub mod file_store;
pub mod json_parser;
pub mod memory_store;
pub mod properties_parser;
#[cfg(feature = "redis")]
pub mod redis_store;
pub mod yaml_parser;

pub mod watchers;

pub use file_store::FileSystemStore;
pub use json_parser::JsonParser;
pub use memory_store::InMemoryStore;
pub use properties_parser::PropertiesParser;
#[cfg(feature = "redis")]
pub use redis_store::{RedisStorageMode, RedisStore};
#[cfg(feature = "reload")]
pub use watchers::FileWatcher;
pub use yaml_parser::YamlParser;

use crate::ports::ConfigParser;
use std::sync::Arc;

/// The parsers every repository starts with, in lookup order:
/// `yml`, `yaml`, `properties`, `json`.
pub fn default_parsers() -> Vec<Arc<dyn ConfigParser>> {
    vec![
        Arc::new(YamlParser::new()),
        Arc::new(PropertiesParser::new()),
        Arc::new(JsonParser::new()),
    ]
}
