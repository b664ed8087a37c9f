// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the configuration server.
//!
//! This module defines the errors that can occur while fetching, merging and
//! expanding configuration documents. All errors use `thiserror` for proper
//! error handling and conversion.

use crate::domain::coordinates::Coordinates;
use std::num::{ParseFloatError, ParseIntError};
use std::str::ParseBoolError;
use thiserror::Error;

/// The main error type for configuration server operations.
///
/// It is marked as `#[non_exhaustive]` to allow for future additions without
/// breaking backwards compatibility.
///
/// # Examples
///
/// ```
/// use cfgserver::domain::{ConfigError, Coordinates};
///
/// fn fetch() -> Result<(), ConfigError> {
///     Err(ConfigError::NotFound {
///         coordinates: Coordinates::new("billing", "prod", Some("main")),
///     })
/// }
///
/// assert!(!fetch().unwrap_err().is_retryable());
/// ```
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// No document exists for the given coordinates.
    #[error("No configuration document found for {coordinates}")]
    NotFound {
        /// The coordinates that were looked up
        coordinates: Coordinates,
    },

    /// The backing store could not be reached or timed out.
    #[error("Configuration store '{store}' unavailable for {coordinates}: {message}")]
    SourceUnavailable {
        /// The coordinates being fetched
        coordinates: Coordinates,
        /// The name of the store that failed
        store: String,
        /// The error message
        message: String,
        /// The underlying error, if any
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Placeholder expansion found a reference cycle.
    #[error("Cyclic placeholder reference: {}", .cycle.join(" -> "))]
    CyclicReference {
        /// The keys forming the cycle, first key repeated at the end
        cycle: Vec<String>,
    },

    /// A document could not be parsed.
    #[error("Malformed configuration document '{document}' for {coordinates}: {message}")]
    MalformedDocument {
        /// The coordinates being fetched
        coordinates: Coordinates,
        /// The document path inside the store
        document: String,
        /// The error message
        message: String,
        /// The underlying parsing error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Document content could not be parsed. Repositories report this as
    /// `MalformedDocument` once the coordinates are known.
    #[error("Failed to parse configuration: {message}")]
    Parse {
        /// The error message
        message: String,
        /// The underlying parsing error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A placeholder referenced a missing key and had no default (strict mode).
    #[error("Could not resolve placeholder '{placeholder}' in value of '{key}'")]
    UnresolvablePlaceholder {
        /// The key whose value contains the placeholder
        key: String,
        /// The placeholder text, including `${` and `}`
        placeholder: String,
    },

    /// Placeholder resolution nested deeper than the configured limit.
    #[error("Placeholder resolution for '{key}' exceeded the maximum depth of {max_depth}")]
    PlaceholderDepthExceeded {
        /// The key being resolved when the limit was hit
        key: String,
        /// The configured limit
        max_depth: usize,
    },

    /// Failed to convert a configuration value to the requested type.
    #[error("Failed to convert configuration value for key '{key}' to type {target_type}: {source}")]
    TypeConversion {
        /// The key being converted
        key: String,
        /// The target type name
        target_type: String,
        /// The underlying conversion error
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A request named an invalid application, profile, label or path.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// The error message
        message: String,
    },

    /// Server settings could not be loaded.
    #[error("Invalid server settings: {message}")]
    Settings {
        /// The error message
        message: String,
        /// The underlying error, if any
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An error occurred in a store watcher.
    #[error("Store watcher error: {message}")]
    Watcher {
        /// The error message
        message: String,
        /// The underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An I/O error occurred outside of a document fetch.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Returns `true` when retrying the same operation may succeed.
    ///
    /// Only transient store failures are retryable. Cycles and malformed
    /// documents are authoring bugs and will fail the same way every time.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ConfigError::SourceUnavailable { .. })
    }

    /// Creates a `SourceUnavailable` error without an underlying cause.
    pub fn unavailable(
        coordinates: &Coordinates,
        store: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ConfigError::SourceUnavailable {
            coordinates: coordinates.clone(),
            store: store.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates an `InvalidRequest` error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        ConfigError::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a TypeConversion error from a ParseIntError.
    pub fn from_parse_int_error(key: String, err: ParseIntError) -> Self {
        ConfigError::TypeConversion {
            key,
            target_type: "integer".to_string(),
            source: Box::new(err),
        }
    }

    /// Creates a TypeConversion error from a ParseFloatError.
    pub fn from_parse_float_error(key: String, err: ParseFloatError) -> Self {
        ConfigError::TypeConversion {
            key,
            target_type: "float".to_string(),
            source: Box::new(err),
        }
    }

    /// Creates a TypeConversion error from a ParseBoolError.
    pub fn from_parse_bool_error(key: String, err: ParseBoolError) -> Self {
        ConfigError::TypeConversion {
            key,
            target_type: "boolean".to_string(),
            source: Box::new(err),
        }
    }
}

/// A specialized Result type for configuration server operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// An error surfaced to a client, tagged with the request coordinates.
///
/// The router wraps every failure in this type so the caller can tell which
/// application, profiles and label were being served.
#[derive(Debug, Error)]
#[error("{error} (application '{application}', profiles '{profiles}', label '{}')", .label.as_deref().unwrap_or("<default>"))]
pub struct RequestError {
    /// The requested application
    pub application: String,
    /// The requested profiles, comma-separated
    pub profiles: String,
    /// The requested label, if any
    pub label: Option<String>,
    /// The underlying failure
    #[source]
    pub error: ConfigError,
}
