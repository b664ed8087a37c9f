// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory document store.
//!
//! Useful for embedding the server in another process and for tests.

use crate::ports::DocumentStore;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::io;
use std::sync::RwLock;

/// Document store holding `(reference, path) -> bytes` in memory.
///
/// # Examples
///
/// ```rust
/// use cfgserver::adapters::InMemoryStore;
/// use cfgserver::ports::DocumentStore;
///
/// # #[tokio::main]
/// # async fn main() {
/// let store = InMemoryStore::new()
///     .with_document("main", "billing.yml", "server:\n  port: 8080\n");
///
/// assert!(store.read("billing.yml", "main").await.unwrap().is_some());
/// assert_eq!(store.list_versions("billing.yml").await.unwrap(), vec!["main"]);
/// # }
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    documents: RwLock<HashMap<(String, String), Vec<u8>>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a document and returns the store, for chained construction.
    pub fn with_document(
        self,
        reference: impl Into<String>,
        path: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        self.insert(reference, path, content);
        self
    }

    /// Adds or replaces a document.
    pub fn insert(
        &self,
        reference: impl Into<String>,
        path: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) {
        let mut documents = self.documents.write().unwrap_or_else(|e| e.into_inner());
        documents.insert((reference.into(), path.into()), content.into());
    }

    /// Removes a document, returning its content if it was present.
    pub fn remove(&self, reference: &str, path: &str) -> Option<Vec<u8>> {
        let mut documents = self.documents.write().unwrap_or_else(|e| e.into_inner());
        documents.remove(&(reference.to_string(), path.to_string()))
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn read(&self, path: &str, reference: &str) -> io::Result<Option<Vec<u8>>> {
        let documents = self.documents.read().unwrap_or_else(|e| e.into_inner());
        Ok(documents
            .get(&(reference.to_string(), path.to_string()))
            .cloned())
    }

    async fn list_versions(&self, path: &str) -> io::Result<Vec<String>> {
        let documents = self.documents.read().unwrap_or_else(|e| e.into_inner());
        let references: BTreeSet<&String> = documents
            .keys()
            .filter(|(_, p)| path.is_empty() || p == path)
            .map(|(r, _)| r)
            .collect();
        Ok(references.into_iter().cloned().collect())
    }
}
