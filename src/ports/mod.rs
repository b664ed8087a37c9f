// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ports layer containing trait definitions.
//!
//! This module contains the trait definitions (ports) at the seams of the
//! configuration server: the raw document store, the repository that turns
//! stored bytes into documents, the document parsers and change watchers.
//! They are implemented by the adapters and service layers.

pub mod parser;
pub mod repository;
pub mod store;
pub mod watcher;

// Re-export commonly used types
pub use parser::ConfigParser;
pub use repository::SourceRepository;
pub use store::DocumentStore;
pub use watcher::{ChangeCallback, StoreWatcher};
