// SPDX-License-Identifier: MIT OR Apache-2.0

//! Service layer: repository, cache, merge, expansion and the request
//! router that orchestrates them.

pub mod cache;
pub mod config_server;
pub mod expander;
pub mod repository;
pub mod resolver;
pub mod retry;

// Re-export commonly used types
pub use cache::CachingRepository;
pub use config_server::{ConfigServer, ConfigServerBuilder, DEFAULT_SHARED_APPLICATION};
pub use expander::{PlaceholderExpander, PlaceholderMode, DEFAULT_MAX_DEPTH};
pub use repository::{StoreRepository, DEFAULT_LABEL, DEFAULT_TIMEOUT};
pub use resolver::PropertyResolver;
pub use retry::RetryPolicy;
