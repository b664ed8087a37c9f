// SPDX-License-Identifier: MIT OR Apache-2.0

//! Redis document store.
//!
//! This module provides a store that serves documents kept in Redis, either
//! as one string key per document or as one hash per reference.

use crate::domain::{ConfigError, Result};
use crate::ports::DocumentStore;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use std::fmt;
use std::io;
use tracing::debug;

/// Storage layout for documents in Redis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedisStorageMode {
    /// One string key per document.
    /// Example: `cfg:main:billing-prod.yml`
    StringKeys,
    /// One hash per reference whose fields are document paths.
    /// Example: `HGET cfg:main billing-prod.yml`
    Hash,
}

/// Document store backed by Redis.
///
/// Keys are found with `SCAN`, never `KEYS`, so listing references does not
/// block the server. One multiplexed connection is opened up front and shared
/// by every request and every clone of the store.
///
/// # Examples
///
/// ```rust,no_run
/// use cfgserver::adapters::{RedisStorageMode, RedisStore};
/// use cfgserver::ports::DocumentStore;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// // Documents stored as cfg:<reference>:<path>
/// let store = RedisStore::new("redis://localhost:6379", "cfg:", RedisStorageMode::StringKeys).await?;
///
/// // Or one hash per reference, cfg:<reference>
/// let store = RedisStore::new("redis://localhost:6379", "cfg:", RedisStorageMode::Hash).await?;
/// let bytes = store.read("billing-prod.yml", "main").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RedisStore {
    /// Shared multiplexed connection
    conn: MultiplexedConnection,
    /// Key prefix shared by every document
    namespace: String,
    /// Storage mode (string keys or hash)
    storage_mode: RedisStorageMode,
}

impl RedisStore {
    /// Validates namespace so it cannot act as a SCAN pattern.
    fn validate_namespace(namespace: &str) -> Result<()> {
        if namespace.contains(['*', '?', '[', ']', '\\']) {
            return Err(ConfigError::Settings {
                message: "Redis namespace contains invalid characters (* ? [ ] \\)".to_string(),
                source: None,
            });
        }
        Ok(())
    }

    /// Creates a store and checks that Redis is reachable.
    ///
    /// # Arguments
    ///
    /// * `url` - Redis connection URL (e.g., `"redis://localhost:6379"`)
    /// * `namespace` - Prefix for every key this store reads
    /// * `storage_mode` - Whether documents are string keys or hash fields
    pub async fn new(url: &str, namespace: &str, storage_mode: RedisStorageMode) -> Result<Self> {
        Self::validate_namespace(namespace)?;

        let client = Client::open(url).map_err(|e| ConfigError::Settings {
            message: format!("Failed to create Redis client: {}", e),
            source: Some(Box::new(e)),
        })?;

        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| ConfigError::Settings {
                message: format!("Failed to connect to Redis: {}", e),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            conn,
            namespace: namespace.to_string(),
            storage_mode,
        })
    }

    /// The configured storage mode.
    pub fn storage_mode(&self) -> RedisStorageMode {
        self.storage_mode
    }

    /// A handle on the shared connection.
    fn connection(&self) -> MultiplexedConnection {
        self.conn.clone()
    }

    fn string_key(&self, reference: &str, path: &str) -> String {
        format!("{}{}:{}", self.namespace, reference, path)
    }

    fn hash_key(&self, reference: &str) -> String {
        format!("{}{}", self.namespace, reference)
    }

    /// Collects every key matching `pattern` with SCAN.
    async fn scan(&self, conn: &mut MultiplexedConnection, pattern: &str) -> io::Result<Vec<String>> {
        let mut cursor: u64 = 0;
        let mut all_keys = Vec::new();

        loop {
            let (new_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(conn)
                .await
                .map_err(to_io)?;

            all_keys.extend(keys);
            cursor = new_cursor;
            if cursor == 0 {
                break;
            }
        }

        Ok(all_keys)
    }
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("namespace", &self.namespace)
            .field("storage_mode", &self.storage_mode)
            .finish_non_exhaustive()
    }
}

fn to_io(e: redis::RedisError) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e)
}

/// Escapes SCAN glob characters so `value` matches literally.
fn escape_glob(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl DocumentStore for RedisStore {
    fn name(&self) -> &str {
        "redis"
    }

    async fn read(&self, path: &str, reference: &str) -> io::Result<Option<Vec<u8>>> {
        let mut conn = self.connection();
        match self.storage_mode {
            RedisStorageMode::StringKeys => {
                let key = self.string_key(reference, path);
                debug!(key = %key, "Reading document from Redis");
                conn.get(&key).await.map_err(to_io)
            }
            RedisStorageMode::Hash => {
                let key = self.hash_key(reference);
                debug!(key = %key, field = path, "Reading document from Redis hash");
                conn.hget(&key, path).await.map_err(to_io)
            }
        }
    }

    async fn list_versions(&self, path: &str) -> io::Result<Vec<String>> {
        let mut conn = self.connection();
        let namespace = escape_glob(&self.namespace);

        let mut references = match self.storage_mode {
            RedisStorageMode::StringKeys if path.is_empty() => self
                .scan(&mut conn, &format!("{}*", namespace))
                .await?
                .into_iter()
                .filter_map(|key| {
                    key.strip_prefix(&self.namespace)
                        .and_then(|rest| rest.split_once(':'))
                        .map(|(reference, _)| reference.to_string())
                })
                .collect::<Vec<_>>(),
            RedisStorageMode::StringKeys => {
                let suffix = format!(":{}", path);
                let pattern = format!("{}*{}", namespace, escape_glob(&suffix));
                self.scan(&mut conn, &pattern)
                    .await?
                    .into_iter()
                    .filter_map(|key| {
                        key.strip_prefix(&self.namespace)
                            .and_then(|rest| rest.strip_suffix(&suffix))
                            .map(str::to_string)
                    })
                    .collect::<Vec<_>>()
            }
            RedisStorageMode::Hash => {
                let pattern = format!("{}*", namespace);
                let mut references = Vec::new();
                for key in self.scan(&mut conn, &pattern).await? {
                    if !path.is_empty() {
                        let exists: bool = conn.hexists(&key, path).await.map_err(to_io)?;
                        if !exists {
                            continue;
                        }
                    }
                    if let Some(reference) = key.strip_prefix(&self.namespace) {
                        references.push(reference.to_string());
                    }
                }
                references
            }
        };

        references.sort();
        references.dedup();
        Ok(references)
    }
}
