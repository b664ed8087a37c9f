// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain layer containing core types.
//!
//! This module contains the documents, values and errors the configuration
//! server works with. It is independent of any store, transport or runtime.

pub mod config_value;
pub mod coordinates;
pub mod document;
pub mod errors;

// Re-export commonly used types
pub use config_value::{ConfigValue, PropertyKey, PropertyMap};
pub use coordinates::{Coordinates, ProfileChain, DEFAULT_PROFILE};
pub use document::{ConfigDocument, Environment, MergedConfig, PropertySource, ResolvedConfig};
pub use errors::{ConfigError, RequestError, Result};
