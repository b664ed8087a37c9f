// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store-backed source repository.
//!
//! This module maps coordinates to candidate document paths, picks the store
//! reference for the requested label and parses whichever candidate exists
//! first.

use crate::adapters::default_parsers;
use crate::domain::coordinates::validate_segment;
use crate::domain::{ConfigDocument, ConfigError, Coordinates, Result, DEFAULT_PROFILE};
use crate::ports::{ConfigParser, DocumentStore, SourceRepository};
use async_trait::async_trait;
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Label used when a request does not name one.
pub const DEFAULT_LABEL: &str = "main";

/// Default bound on each store call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Label encoding for `/`, so `feature(_)tls` addresses `feature/tls`.
const LABEL_SLASH: &str = "(_)";

/// A [`SourceRepository`] that reads and parses documents from a
/// [`DocumentStore`].
///
/// For profile `P` the base name `<application>-P` is looked up; the
/// `default` profile also falls back to the bare `<application>`. Each base
/// name is tried under every search path and with every parser extension in
/// order. The first document found wins.
///
/// # Examples
///
/// ```rust
/// use cfgserver::adapters::InMemoryStore;
/// use cfgserver::domain::Coordinates;
/// use cfgserver::ports::SourceRepository;
/// use cfgserver::service::StoreRepository;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> cfgserver::domain::Result<()> {
/// let store = InMemoryStore::new().with_document("main", "billing-prod.yml", "port: 8080");
/// let repository = StoreRepository::new(Arc::new(store));
///
/// let document = repository
///     .fetch(&Coordinates::new("billing", "prod", None))
///     .await?;
/// assert_eq!(document.name(), "memory:main:billing-prod.yml");
/// # Ok(())
/// # }
/// ```
pub struct StoreRepository {
    store: Arc<dyn DocumentStore>,
    parsers: Vec<Arc<dyn ConfigParser>>,
    default_label: String,
    label_fallback: bool,
    search_paths: Vec<String>,
    timeout: Duration,
}

impl StoreRepository {
    /// Creates a repository with the default parsers, label `main`, label
    /// fallback enabled, the store root as the only search path and a 5s
    /// timeout.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            parsers: default_parsers(),
            default_label: DEFAULT_LABEL.to_string(),
            label_fallback: true,
            search_paths: vec![String::new()],
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the label used when none is requested or fallback applies.
    pub fn with_default_label(mut self, label: impl Into<String>) -> Self {
        self.default_label = label.into();
        self
    }

    /// Enables or disables falling back to the default label when the
    /// requested label does not exist in the store.
    pub fn with_label_fallback(mut self, enabled: bool) -> Self {
        self.label_fallback = enabled;
        self
    }

    /// Sets the directories searched for documents, relative to a
    /// reference. `{application}`, `{profile}` and `{label}` are substituted.
    /// An empty list means the reference root.
    pub fn with_search_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_paths = paths.into_iter().map(Into::into).collect();
        if self.search_paths.is_empty() {
            self.search_paths.push(String::new());
        }
        self
    }

    /// Sets the bound applied to each store call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Appends a parser. Its extensions are tried after the existing ones.
    pub fn with_parser(mut self, parser: Arc<dyn ConfigParser>) -> Self {
        self.parsers.push(parser);
        self
    }

    /// The store this repository reads from.
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Candidate base names for the coordinates, in lookup order.
    fn base_names(coordinates: &Coordinates) -> Vec<String> {
        let application = coordinates.application();
        let profile = coordinates.profile();
        let mut names = vec![format!("{}-{}", application, profile)];
        if profile == DEFAULT_PROFILE {
            names.push(application.to_string());
        }
        names
    }

    /// Every candidate document path with the parser that reads it.
    fn candidates(
        &self,
        coordinates: &Coordinates,
        label: &str,
    ) -> Vec<(String, Arc<dyn ConfigParser>)> {
        let mut candidates = Vec::new();
        for base in Self::base_names(coordinates) {
            for search_path in &self.search_paths {
                let directory = search_path
                    .replace("{application}", coordinates.application())
                    .replace("{profile}", coordinates.profile())
                    .replace("{label}", label);
                let directory = directory.trim_matches('/');
                for parser in &self.parsers {
                    for extension in parser.supported_extensions() {
                        let file = format!("{}.{}", base, extension);
                        let path = if directory.is_empty() {
                            file
                        } else {
                            format!("{}/{}", directory, file)
                        };
                        candidates.push((path, Arc::clone(parser)));
                    }
                }
            }
        }
        candidates
    }

    /// Runs a store call under the timeout, mapping failures to
    /// `SourceUnavailable`.
    async fn call<T>(
        &self,
        coordinates: &Coordinates,
        operation: impl Future<Output = io::Result<T>>,
    ) -> Result<std::result::Result<T, io::Error>> {
        match tokio::time::timeout(self.timeout, operation).await {
            Ok(Ok(value)) => Ok(Ok(value)),
            Ok(Err(e)) if e.kind() == io::ErrorKind::InvalidData => Ok(Err(e)),
            Ok(Err(e)) => Err(ConfigError::SourceUnavailable {
                coordinates: coordinates.clone(),
                store: self.store.name().to_string(),
                message: e.to_string(),
                source: Some(Box::new(e)),
            }),
            Err(_) => Err(ConfigError::unavailable(
                coordinates,
                self.store.name(),
                format!("timed out after {}ms", self.timeout.as_millis()),
            )),
        }
    }

    /// Picks the store reference to read for the requested label.
    async fn resolve_reference(&self, coordinates: &Coordinates) -> Result<String> {
        let label = match coordinates.label() {
            Some(label) if !label.is_empty() => label.replace(LABEL_SLASH, "/"),
            _ => return Ok(self.default_label.clone()),
        };
        if label.split('/').any(|part| part.is_empty() || part == "." || part == "..") {
            return Err(ConfigError::invalid_request(format!(
                "label '{}' is not a valid reference",
                label
            )));
        }
        if label == self.default_label || !self.label_fallback {
            return Ok(label);
        }

        let versions = match self.call(coordinates, self.store.list_versions("")).await? {
            Ok(versions) => versions,
            Err(e) => {
                return Err(ConfigError::unavailable(coordinates, self.store.name(), e.to_string()))
            }
        };
        if versions.iter().any(|v| *v == label) {
            Ok(label)
        } else {
            warn!(
                label = %label,
                fallback = %self.default_label,
                application = coordinates.application(),
                "Requested label not found, falling back to default label"
            );
            Ok(self.default_label.clone())
        }
    }
}

#[async_trait]
impl SourceRepository for StoreRepository {
    async fn fetch(&self, coordinates: &Coordinates) -> Result<ConfigDocument> {
        validate_segment("application", coordinates.application())?;
        validate_segment("profile", coordinates.profile())?;

        let reference = self.resolve_reference(coordinates).await?;

        for (path, parser) in self.candidates(coordinates, &reference) {
            let bytes = match self.call(coordinates, self.store.read(&path, &reference)).await? {
                Ok(Some(bytes)) => bytes,
                Ok(None) => {
                    debug!(path = %path, reference = %reference, "No document at candidate path");
                    continue;
                }
                Err(e) => {
                    return Err(ConfigError::MalformedDocument {
                        coordinates: coordinates.clone(),
                        document: path,
                        message: e.to_string(),
                        source: Some(Box::new(e)),
                    })
                }
            };

            let content = String::from_utf8(bytes).map_err(|e| ConfigError::MalformedDocument {
                coordinates: coordinates.clone(),
                document: path.clone(),
                message: "document is not valid UTF-8".to_string(),
                source: Some(Box::new(e)),
            })?;

            let properties = parser.parse(&content).map_err(|e| match e {
                ConfigError::Parse { message, source } => ConfigError::MalformedDocument {
                    coordinates: coordinates.clone(),
                    document: path.clone(),
                    message,
                    source,
                },
                other => other,
            })?;

            let name = format!("{}:{}:{}", self.store.name(), reference, path);
            debug!(document = %name, keys = properties.len(), "Loaded configuration document");
            return Ok(ConfigDocument::new(
                coordinates.clone(),
                name,
                reference,
                properties,
            ));
        }

        Err(ConfigError::NotFound {
            coordinates: coordinates.clone(),
        })
    }
}
