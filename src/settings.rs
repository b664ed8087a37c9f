// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server settings.
//!
//! Settings come from, lowest precedence first: built-in defaults, an
//! optional YAML file, environment variables and command-line flags.
//! Environment variables are named `CFGSERVER_<FLAG>`, e.g.
//! `CFGSERVER_CACHE_TTL_SECS`.
//!
//! ```yaml
//! bind: 0.0.0.0:8888
//! backend: file:///srv/config-repo
//! default_label: main
//! cache_ttl_secs: 30
//! placeholder_mode: strict
//! search_paths: ["", "{application}"]
//! ```

use crate::adapters::FileSystemStore;
use crate::domain::{ConfigError, Result};
use crate::ports::DocumentStore;
use crate::service::{ConfigServer, PlaceholderMode, RetryPolicy, StoreRepository};
use clap::Parser;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Maximum allowed settings file size (1MB).
const MAX_SETTINGS_FILE_SIZE: u64 = 1024 * 1024;

/// File name looked up in the platform configuration directory.
pub const SETTINGS_FILE_NAME: &str = "settings.yaml";

/// Storage layout for a Redis backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RedisLayout {
    /// One string key per document
    #[default]
    Strings,
    /// One hash per reference
    Hash,
}

/// Where documents are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// A directory tree, one subdirectory per reference.
    File(PathBuf),
    /// A Redis server.
    Redis(String),
}

impl Backend {
    /// Parses a backend URI: `file:///path`, `redis://host[:port][/db]`,
    /// `rediss://...`, or a bare filesystem path.
    ///
    /// ```
    /// use cfgserver::settings::Backend;
    /// use std::path::PathBuf;
    ///
    /// assert_eq!(
    ///     Backend::parse("file:///srv/repo").unwrap(),
    ///     Backend::File(PathBuf::from("/srv/repo"))
    /// );
    /// assert_eq!(Backend::parse("./repo").unwrap(), Backend::File(PathBuf::from("./repo")));
    /// assert!(Backend::parse("ftp://example.com").is_err());
    /// ```
    pub fn parse(uri: &str) -> Result<Self> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(settings_error("backend must not be empty"));
        }
        if let Some(path) = uri.strip_prefix("file://") {
            if path.is_empty() {
                return Err(settings_error("file backend needs a path"));
            }
            return Ok(Backend::File(PathBuf::from(path)));
        }
        if uri.starts_with("redis://") || uri.starts_with("rediss://") {
            return Ok(Backend::Redis(uri.to_string()));
        }
        if let Some((scheme, _)) = uri.split_once("://") {
            return Err(settings_error(format!("unsupported backend scheme '{scheme}'")));
        }
        Ok(Backend::File(PathBuf::from(uri)))
    }
}

fn settings_error(message: impl Into<String>) -> ConfigError {
    ConfigError::Settings {
        message: message.into(),
        source: None,
    }
}

/// Command-line flags. Every flag can also be set through its environment
/// variable.
#[derive(Parser, Debug, Default, Clone)]
#[command(name = "cfgserver", version, about = "Centralized configuration server")]
pub struct Args {
    /// Path to a YAML settings file
    #[arg(long, env = "CFGSERVER_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, env = "CFGSERVER_BIND")]
    pub bind: Option<String>,

    /// Backend URI (file:///path, a bare path, or redis://host)
    #[arg(long, env = "CFGSERVER_BACKEND")]
    pub backend: Option<String>,

    /// Label used when a request names none
    #[arg(long, env = "CFGSERVER_DEFAULT_LABEL")]
    pub default_label: Option<String>,

    /// Document cache lifetime in seconds (0 disables the cache)
    #[arg(long, env = "CFGSERVER_CACHE_TTL_SECS")]
    pub cache_ttl_secs: Option<u64>,

    /// Placeholder mode: strict or lenient
    #[arg(long, env = "CFGSERVER_PLACEHOLDER_MODE")]
    pub placeholder_mode: Option<PlaceholderMode>,

    /// Bound on each backend call, in milliseconds
    #[arg(long, env = "CFGSERVER_REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: Option<u64>,

    /// Retries after a transient backend failure
    #[arg(long, env = "CFGSERVER_MAX_RETRIES")]
    pub max_retries: Option<u32>,

    /// Delay before the first retry, in milliseconds
    #[arg(long, env = "CFGSERVER_RETRY_BASE_DELAY_MS")]
    pub retry_base_delay_ms: Option<u64>,

    /// Upper bound for a retry delay, in milliseconds
    #[arg(long, env = "CFGSERVER_RETRY_MAX_DELAY_MS")]
    pub retry_max_delay_ms: Option<u64>,

    /// Fall back to the default label when a label does not exist
    #[arg(long, env = "CFGSERVER_LABEL_FALLBACK")]
    pub label_fallback: Option<bool>,

    /// Application whose documents every application inherits
    #[arg(long, env = "CFGSERVER_SHARED_APPLICATION")]
    pub shared_application: Option<String>,

    /// Directories searched for documents, comma-separated
    #[arg(long, env = "CFGSERVER_SEARCH_PATHS", value_delimiter = ',')]
    pub search_paths: Option<Vec<String>>,

    /// Watch a file backend and drop cached documents on change
    #[arg(long, env = "CFGSERVER_WATCH")]
    pub watch: Option<bool>,

    /// Key prefix for a Redis backend
    #[arg(long, env = "CFGSERVER_REDIS_NAMESPACE")]
    pub redis_namespace: Option<String>,

    /// Storage layout for a Redis backend
    #[arg(long, env = "CFGSERVER_REDIS_LAYOUT", value_enum)]
    pub redis_layout: Option<RedisLayout>,

    /// Log level when RUST_LOG is unset
    #[arg(long, env = "CFGSERVER_LOG_LEVEL")]
    pub log_level: Option<String>,
}

/// Effective server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSettings {
    /// Address to listen on
    pub bind: String,
    /// Backend URI
    pub backend: String,
    /// Label used when a request names none
    pub default_label: String,
    /// Document cache lifetime in seconds; 0 disables the cache
    pub cache_ttl_secs: u64,
    /// Strict or lenient placeholder expansion
    pub placeholder_mode: PlaceholderMode,
    /// Bound on each backend call, in milliseconds
    pub request_timeout_ms: u64,
    /// Retries after a transient backend failure
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds
    pub retry_base_delay_ms: u64,
    /// Upper bound for a retry delay, in milliseconds
    pub retry_max_delay_ms: u64,
    /// Fall back to the default label when a label does not exist
    pub label_fallback: bool,
    /// Application whose documents every application inherits
    pub shared_application: String,
    /// Directories searched for documents under each reference
    pub search_paths: Vec<String>,
    /// Watch a file backend for changes
    pub watch: bool,
    /// Key prefix for a Redis backend
    pub redis_namespace: String,
    /// Storage layout for a Redis backend
    pub redis_layout: RedisLayout,
    /// Log level when RUST_LOG is unset
    pub log_level: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8888".to_string(),
            backend: "./config-repo".to_string(),
            default_label: crate::service::DEFAULT_LABEL.to_string(),
            cache_ttl_secs: 30,
            placeholder_mode: PlaceholderMode::default(),
            request_timeout_ms: crate::service::DEFAULT_TIMEOUT.as_millis() as u64,
            max_retries: 2,
            retry_base_delay_ms: 100,
            retry_max_delay_ms: 2_000,
            label_fallback: true,
            shared_application: crate::service::DEFAULT_SHARED_APPLICATION.to_string(),
            search_paths: Vec::new(),
            watch: true,
            redis_namespace: "cfg:".to_string(),
            redis_layout: RedisLayout::default(),
            log_level: "info".to_string(),
        }
    }
}

impl ServerSettings {
    /// Loads settings for `args`.
    ///
    /// The file named by `--settings` must exist. Without it,
    /// `settings.yaml` in the platform configuration directory is used when
    /// present. Flags and environment variables are applied on top.
    pub fn load(args: &Args) -> Result<Self> {
        let mut settings = match &args.settings {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_location() {
                Some(path) if path.is_file() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        settings.apply(args);
        settings.validate()?;
        Ok(settings)
    }

    /// `settings.yaml` in the platform configuration directory.
    pub fn default_location() -> Option<PathBuf> {
        ProjectDirs::from("org", "cfgserver", "cfgserver")
            .map(|dirs| dirs.config_dir().join(SETTINGS_FILE_NAME))
    }

    /// Reads settings from a YAML file. Missing fields keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path).map_err(|e| ConfigError::Settings {
            message: format!("cannot read settings file {}", path.display()),
            source: Some(Box::new(e)),
        })?;
        if metadata.len() > MAX_SETTINGS_FILE_SIZE {
            return Err(settings_error(format!(
                "settings file too large: {} bytes (max {} bytes)",
                metadata.len(),
                MAX_SETTINGS_FILE_SIZE
            )));
        }
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Settings {
            message: format!("cannot read settings file {}", path.display()),
            source: Some(Box::new(e)),
        })?;
        Self::from_yaml(&content)
    }

    /// Parses settings from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| ConfigError::Settings {
            message: format!("invalid settings: {e}"),
            source: Some(Box::new(e)),
        })
    }

    /// Overrides fields with every flag or environment variable that is set.
    pub fn apply(&mut self, args: &Args) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                *target = value.clone();
            }
        }

        set(&mut self.bind, &args.bind);
        set(&mut self.backend, &args.backend);
        set(&mut self.default_label, &args.default_label);
        set(&mut self.cache_ttl_secs, &args.cache_ttl_secs);
        set(&mut self.placeholder_mode, &args.placeholder_mode);
        set(&mut self.request_timeout_ms, &args.request_timeout_ms);
        set(&mut self.max_retries, &args.max_retries);
        set(&mut self.retry_base_delay_ms, &args.retry_base_delay_ms);
        set(&mut self.retry_max_delay_ms, &args.retry_max_delay_ms);
        set(&mut self.label_fallback, &args.label_fallback);
        set(&mut self.shared_application, &args.shared_application);
        set(&mut self.search_paths, &args.search_paths);
        set(&mut self.watch, &args.watch);
        set(&mut self.redis_namespace, &args.redis_namespace);
        set(&mut self.redis_layout, &args.redis_layout);
        set(&mut self.log_level, &args.log_level);
    }

    /// Checks values that cannot be represented by types alone.
    pub fn validate(&self) -> Result<()> {
        Backend::parse(&self.backend)?;
        if self.default_label.trim().is_empty() {
            return Err(settings_error("default_label must not be empty"));
        }
        if self.request_timeout_ms == 0 {
            return Err(settings_error("request_timeout_ms must be greater than zero"));
        }
        if self.retry_max_delay_ms < self.retry_base_delay_ms {
            return Err(settings_error(
                "retry_max_delay_ms must not be smaller than retry_base_delay_ms",
            ));
        }
        Ok(())
    }

    /// The parsed backend.
    pub fn backend(&self) -> Result<Backend> {
        Backend::parse(&self.backend)
    }

    /// The document cache lifetime.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// The bound on each backend call.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// The retry policy for transient backend failures.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
        }
    }

    /// Opens the configured document store.
    pub async fn open_store(&self) -> Result<Arc<dyn DocumentStore>> {
        match self.backend()? {
            Backend::File(root) => Ok(Arc::new(FileSystemStore::new(root)?)),
            #[cfg(feature = "redis")]
            Backend::Redis(url) => {
                use crate::adapters::{RedisStorageMode, RedisStore};
                let mode = match self.redis_layout {
                    RedisLayout::Strings => RedisStorageMode::StringKeys,
                    RedisLayout::Hash => RedisStorageMode::Hash,
                };
                Ok(Arc::new(RedisStore::new(&url, &self.redis_namespace, mode).await?))
            }
            #[cfg(not(feature = "redis"))]
            Backend::Redis(_) => Err(settings_error(
                "redis backend requires the `redis` feature",
            )),
        }
    }

    /// Builds a server over `store` with these settings.
    pub fn build_server(&self, store: Arc<dyn DocumentStore>) -> Result<ConfigServer> {
        let repository = StoreRepository::new(store)
            .with_default_label(self.default_label.clone())
            .with_label_fallback(self.label_fallback)
            .with_search_paths(self.search_paths.clone())
            .with_timeout(self.request_timeout());

        ConfigServer::builder()
            .with_repository(Arc::new(repository))
            .with_placeholder_mode(self.placeholder_mode)
            .with_retry_policy(self.retry_policy())
            .with_shared_application(self.shared_application.clone())
            .with_cache_ttl(self.cache_ttl())
            .build()
    }
}
