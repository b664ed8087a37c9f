// SPDX-License-Identifier: MIT OR Apache-2.0

//! The request router: fetch, merge and expand configuration for a client.

use crate::domain::coordinates::validate_segment;
use crate::domain::{
    ConfigDocument, ConfigError, Coordinates, Environment, ProfileChain, RequestError, Result,
};
use crate::ports::{DocumentStore, SourceRepository};
use crate::service::cache::CachingRepository;
use crate::service::expander::{PlaceholderExpander, PlaceholderMode};
use crate::service::repository::StoreRepository;
use crate::service::resolver::PropertyResolver;
use crate::service::retry::RetryPolicy;
use std::sync::Arc;
use std::time::Duration;

/// Application name whose documents every application inherits.
pub const DEFAULT_SHARED_APPLICATION: &str = "application";

/// Serves merged, expanded configuration for `(application, profiles,
/// label)` requests.
///
/// For each profile in the chain the server fetches the application's own
/// document and then the shared application's, so application keys outrank
/// shared ones and earlier profiles outrank later ones. Missing documents
/// are skipped; an application with no documents at all gets an empty
/// environment. Transient store failures are retried by the retry policy.
///
/// The server holds no per-request state and can be shared behind an `Arc`.
///
/// # Examples
///
/// ```rust
/// use cfgserver::adapters::InMemoryStore;
/// use cfgserver::domain::ConfigValue;
/// use cfgserver::service::ConfigServer;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemoryStore::new()
///     .with_document("main", "billing-prod.yml", "db:\n  host: prod-db\n")
///     .with_document("main", "application.yml", "db:\n  host: localhost\n  port: 5432\n");
///
/// let server = ConfigServer::builder().with_store(Arc::new(store)).build()?;
/// let environment = server.resolve_config("billing", "prod", None).await?;
///
/// assert_eq!(environment.profiles, vec!["prod", "default"]);
/// assert_eq!(environment.config.get("db.host"), Some(&ConfigValue::from("prod-db")));
/// assert_eq!(environment.config.get("db.port"), Some(&ConfigValue::Integer(5432)));
/// # Ok(())
/// # }
/// ```
pub struct ConfigServer {
    repository: Arc<dyn SourceRepository>,
    cache: Option<Arc<CachingRepository>>,
    resolver: PropertyResolver,
    expander: PlaceholderExpander,
    retry: RetryPolicy,
    shared_application: String,
}

impl ConfigServer {
    /// Starts building a server.
    pub fn builder() -> ConfigServerBuilder {
        ConfigServerBuilder::new()
    }

    /// Resolves the configuration for one request.
    ///
    /// # Arguments
    ///
    /// * `application` - The application name
    /// * `profiles` - Comma-separated profiles, highest precedence first
    /// * `label` - Branch or version; `None` uses the repository default
    ///
    /// # Errors
    ///
    /// Every error carries the request coordinates. The wrapped
    /// [`ConfigError`] is `InvalidRequest` for bad names, `SourceUnavailable`
    /// once retries are spent, and `MalformedDocument`, `CyclicReference`,
    /// `UnresolvablePlaceholder` or `PlaceholderDepthExceeded` for content
    /// problems.
    pub async fn resolve_config(
        &self,
        application: &str,
        profiles: &str,
        label: Option<&str>,
    ) -> std::result::Result<Environment, RequestError> {
        self.resolve(application, profiles, label)
            .await
            .map_err(|error| RequestError {
                application: application.to_string(),
                profiles: profiles.to_string(),
                label: label.map(str::to_string),
                error,
            })
    }

    async fn resolve(
        &self,
        application: &str,
        profiles: &str,
        label: Option<&str>,
    ) -> Result<Environment> {
        validate_segment("application", application)?;
        let chain = ProfileChain::parse(profiles)?;

        let documents = self.fetch_documents(application, &chain, label).await?;
        if documents.is_empty() {
            tracing::debug!(application, profiles, "No configuration documents found");
        }

        let merged = self.resolver.merge(&documents);
        let resolved = self.expander.expand(&merged)?;

        Ok(Environment {
            name: application.to_string(),
            profiles: chain.profiles().to_vec(),
            label: label.map(str::to_string),
            version: documents.first().map(|d| d.version().to_string()),
            config: resolved,
        })
    }

    /// Fetches every document for the chain in precedence order.
    async fn fetch_documents(
        &self,
        application: &str,
        chain: &ProfileChain,
        label: Option<&str>,
    ) -> Result<Vec<ConfigDocument>> {
        let mut applications = vec![application];
        if !self.shared_application.is_empty() && self.shared_application != application {
            applications.push(&self.shared_application);
        }

        let mut documents = Vec::new();
        for profile in chain.profiles() {
            for app in &applications {
                let coordinates = Coordinates::new(*app, profile.as_str(), label);
                let fetched = self
                    .retry
                    .run("fetch", || self.repository.fetch(&coordinates))
                    .await;
                match fetched {
                    Ok(document) => documents.push(document),
                    Err(ConfigError::NotFound { .. }) => {
                        tracing::debug!(coordinates = %coordinates, "Document not found, skipping");
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(documents)
    }

    /// Drops every cached document. A no-op without a cache.
    pub fn invalidate_all(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate_all();
        }
    }

    /// Drops the cached documents of one application. A no-op without a
    /// cache.
    pub fn invalidate_application(&self, application: &str) {
        if let Some(cache) = &self.cache {
            cache.invalidate_application(application);
        }
    }

    /// The document cache, if one is configured.
    pub fn cache(&self) -> Option<&Arc<CachingRepository>> {
        self.cache.as_ref()
    }

    /// The name of the shared application.
    pub fn shared_application(&self) -> &str {
        &self.shared_application
    }
}

/// Builder for constructing a [`ConfigServer`].
///
/// A repository is required, either directly or as a store.
///
/// # Examples
///
/// ```rust
/// use cfgserver::adapters::InMemoryStore;
/// use cfgserver::service::{ConfigServer, PlaceholderMode, RetryPolicy};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # fn main() -> cfgserver::domain::Result<()> {
/// let server = ConfigServer::builder()
///     .with_store(Arc::new(InMemoryStore::new()))
///     .with_placeholder_mode(PlaceholderMode::Strict)
///     .with_retry_policy(RetryPolicy::none())
///     .with_cache_ttl(Duration::from_secs(30))
///     .build()?;
/// assert!(server.cache().is_some());
/// # Ok(())
/// # }
/// ```
pub struct ConfigServerBuilder {
    repository: Option<Arc<dyn SourceRepository>>,
    resolver: PropertyResolver,
    expander: PlaceholderExpander,
    retry: RetryPolicy,
    shared_application: String,
    cache_ttl: Duration,
}

impl ConfigServerBuilder {
    /// Creates a new builder with no repository, lenient placeholders, the
    /// default retry policy and no cache.
    pub fn new() -> Self {
        Self {
            repository: None,
            resolver: PropertyResolver::new(),
            expander: PlaceholderExpander::default(),
            retry: RetryPolicy::default(),
            shared_application: DEFAULT_SHARED_APPLICATION.to_string(),
            cache_ttl: Duration::ZERO,
        }
    }

    /// Uses `repository` to fetch documents.
    pub fn with_repository(mut self, repository: Arc<dyn SourceRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Reads documents from `store` through a [`StoreRepository`] with
    /// default options.
    pub fn with_store(self, store: Arc<dyn DocumentStore>) -> Self {
        self.with_repository(Arc::new(StoreRepository::new(store)))
    }

    /// Replaces the property resolver.
    pub fn with_resolver(mut self, resolver: PropertyResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Replaces the placeholder expander.
    pub fn with_expander(mut self, expander: PlaceholderExpander) -> Self {
        self.expander = expander;
        self
    }

    /// Sets the placeholder mode, keeping the expander's depth limit.
    pub fn with_placeholder_mode(mut self, mode: PlaceholderMode) -> Self {
        self.expander = PlaceholderExpander::new(mode).with_max_depth(self.expander.max_depth());
        self
    }

    /// Sets the retry policy for transient store failures.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the shared application name. An empty name disables shared
    /// documents.
    pub fn with_shared_application(mut self, name: impl Into<String>) -> Self {
        self.shared_application = name.into();
        self
    }

    /// Caches fetched documents for `ttl`. Zero disables the cache.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Builds the server.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Settings` if no repository was configured.
    pub fn build(self) -> Result<ConfigServer> {
        let repository = self.repository.ok_or_else(|| ConfigError::Settings {
            message: "a source repository or document store is required".to_string(),
            source: None,
        })?;

        let (repository, cache) = if self.cache_ttl.is_zero() {
            (repository, None)
        } else {
            let cache = Arc::new(CachingRepository::new(repository, self.cache_ttl));
            (Arc::clone(&cache) as Arc<dyn SourceRepository>, Some(cache))
        };

        Ok(ConfigServer {
            repository,
            cache,
            resolver: self.resolver,
            expander: self.expander,
            retry: self.retry,
            shared_application: self.shared_application,
        })
    }
}

impl Default for ConfigServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
