// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store watcher trait definition.
//!
//! This module defines the `StoreWatcher` trait, which provides an interface for
//! watching a document store for changes so cached documents can be dropped
//! before they expire.

use crate::domain::Result;
use std::sync::Arc;

/// Type alias for change notification callbacks.
///
/// The callback receives the store path that changed. It should be
/// non-blocking to avoid delaying the watcher.
pub type ChangeCallback = Arc<dyn Fn(String) + Send + Sync>;

/// A trait for watching document stores for changes.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow for use in multi-threaded contexts.
///
/// # Examples
///
/// ```rust
/// use cfgserver::domain::Result;
/// use cfgserver::ports::{ChangeCallback, StoreWatcher};
///
/// struct NeverChanges;
///
/// impl StoreWatcher for NeverChanges {
///     fn watch(&mut self, _callback: ChangeCallback) -> Result<()> {
///         Ok(())
///     }
///
///     fn stop(&mut self) -> Result<()> {
///         Ok(())
///     }
/// }
/// ```
pub trait StoreWatcher: Send + Sync {
    /// Starts watching for changes.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The watcher was successfully started
    /// * `Err(ConfigError::Watcher)` - The watcher could not start or is already running
    fn watch(&mut self, callback: ChangeCallback) -> Result<()>;

    /// Stops watching. Stopping a watcher that is not running is a no-op.
    fn stop(&mut self) -> Result<()>;
}
