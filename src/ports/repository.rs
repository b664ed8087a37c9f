// SPDX-License-Identifier: MIT OR Apache-2.0

//! Source repository trait definition.
//!
//! A `SourceRepository` fetches one parsed document for a set of
//! coordinates. The store-backed implementation and the caching decorator in
//! the service layer both implement it, so the router can be wired with
//! either.

use crate::domain::{ConfigDocument, Coordinates, Result};
use async_trait::async_trait;

/// Fetches configuration documents by coordinates.
///
/// # Errors
///
/// * `ConfigError::NotFound` - No document matches the coordinates
/// * `ConfigError::SourceUnavailable` - The backend failed or timed out
/// * `ConfigError::MalformedDocument` - The document could not be parsed
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use cfgserver::domain::{ConfigDocument, ConfigError, Coordinates, Result};
/// use cfgserver::ports::SourceRepository;
///
/// struct NothingHere;
///
/// #[async_trait]
/// impl SourceRepository for NothingHere {
///     async fn fetch(&self, coordinates: &Coordinates) -> Result<ConfigDocument> {
///         Err(ConfigError::NotFound { coordinates: coordinates.clone() })
///     }
/// }
/// ```
#[async_trait]
pub trait SourceRepository: Send + Sync {
    /// Fetches the document for `coordinates`. Must not mutate the store.
    async fn fetch(&self, coordinates: &Coordinates) -> Result<ConfigDocument>;
}
