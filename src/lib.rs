// SPDX-License-Identifier: MIT OR Apache-2.0

//! A hexagonal architecture configuration server.
//!
//! Clients ask for the configuration of an application under an ordered list
//! of profiles and an optional label (branch or version). The server fetches
//! the matching documents from a versioned store, deep-merges them so the
//! most specific document wins, expands `${key}` and `${key:default}`
//! placeholders, and returns the result over HTTP.
//!
//! # Architecture
//!
//! - **Domain Layer**: coordinates, documents, values and errors
//! - **Ports**: the traits at the seams (`DocumentStore`, `SourceRepository`,
//!   `ConfigParser`, `StoreWatcher`)
//! - **Adapters**: filesystem, in-memory and Redis stores, document parsers
//!   and the filesystem watcher
//! - **Service**: the repository, cache, merge, expansion and the
//!   [`ConfigServer`](service::ConfigServer) that orchestrates them
//! - **HTTP**: the axum router in front of the server
//!
//! # Feature Flags
//!
//! - `reload`: drop cached documents when a filesystem repository changes (default)
//! - `redis`: serve documents stored in Redis
//! - `full`: enable all features
//!
//! # Quick Start
//!
//! ```rust
//! use cfgserver::prelude::*;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let store = InMemoryStore::new()
//!     .with_document("main", "billing-prod.yml", "x: 1\ny: 2\n")
//!     .with_document("main", "billing.yml", "y: 3\nz: 4\n");
//!
//! let server = ConfigServer::builder().with_store(Arc::new(store)).build()?;
//! let environment = server.resolve_config("billing", "prod", None).await?;
//!
//! assert_eq!(environment.config.get("y"), Some(&ConfigValue::Integer(2)));
//! assert_eq!(environment.config.get("z"), Some(&ConfigValue::Integer(4)));
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod http;
pub mod logging;
pub mod ports;
pub mod service;
pub mod settings;

/// Commonly used types and traits.
///
/// This module re-exports the most commonly used types and traits for convenient access.
pub mod prelude {
    pub use crate::domain::{
        ConfigDocument, ConfigError, ConfigValue, Coordinates, Environment, ProfileChain,
        RequestError, Result,
    };
    pub use crate::ports::{ConfigParser, DocumentStore, SourceRepository, StoreWatcher};
    pub use crate::service::{ConfigServer, PlaceholderMode, RetryPolicy, StoreRepository};

    pub use crate::adapters::{FileSystemStore, InMemoryStore};
    #[cfg(feature = "reload")]
    pub use crate::adapters::FileWatcher;
    #[cfg(feature = "redis")]
    pub use crate::adapters::{RedisStorageMode, RedisStore};
}
