// SPDX-License-Identifier: MIT OR Apache-2.0

//! Document store trait definition.
//!
//! This module defines the `DocumentStore` trait, the backend interface the
//! server consumes. A store holds raw document bytes under a path at a given
//! reference (a branch, tag or version). The server only ever reads from it.

use async_trait::async_trait;
use std::io;

/// A versioned, read-only store of raw configuration documents.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so a single store can serve
/// concurrent requests.
///
/// # Errors
///
/// Implementations return `Ok(None)` from [`read`](DocumentStore::read) when
/// the path does not exist at the reference. `Err` is reserved for failures
/// reaching the store; callers treat those as transient. The one exception is
/// [`io::ErrorKind::InvalidData`], which marks a document the store refuses
/// to serve (for example, one over the size limit) and is reported as
/// malformed.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use cfgserver::ports::DocumentStore;
///
/// struct EmptyStore;
///
/// #[async_trait]
/// impl DocumentStore for EmptyStore {
///     fn name(&self) -> &str {
///         "empty"
///     }
///
///     async fn read(&self, _path: &str, _reference: &str) -> std::io::Result<Option<Vec<u8>>> {
///         Ok(None)
///     }
///
///     async fn list_versions(&self, _path: &str) -> std::io::Result<Vec<String>> {
///         Ok(vec![])
///     }
/// }
/// ```
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns a short name for logs and property source names, like
    /// `"file"` or `"redis"`.
    fn name(&self) -> &str;

    /// Reads the document at `path` as of `reference`.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(bytes))` - The document exists
    /// * `Ok(None)` - No document at that path and reference
    /// * `Err(io::Error)` - The store could not be read
    async fn read(&self, path: &str, reference: &str) -> io::Result<Option<Vec<u8>>>;

    /// Lists the references at which `path` exists, sorted. An empty path
    /// lists every reference in the store.
    async fn list_versions(&self, path: &str) -> io::Result<Vec<String>>;
}
