// SPDX-License-Identifier: MIT OR Apache-2.0

//! File system watcher for document store changes.
//!
//! This module provides a watcher that monitors a filesystem store's tree
//! and reports changed documents, so cached copies can be dropped.

use crate::domain::{ConfigError, Result};
use crate::ports::{ChangeCallback, StoreWatcher};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default quiet period before changes are reported.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// File system watcher for a document store root.
///
/// The root is watched recursively, so documents under every reference are
/// covered. Rapid bursts of events (an editor saving, a `git checkout`) are
/// debounced: each changed path is reported once the tree has been quiet for
/// the debounce delay.
///
/// # Examples
///
/// ```rust,no_run
/// use cfgserver::adapters::FileWatcher;
/// use cfgserver::ports::StoreWatcher;
/// use std::sync::Arc;
///
/// # fn main() -> cfgserver::domain::Result<()> {
/// let mut watcher = FileWatcher::new("/srv/config-repo", None)?;
///
/// watcher.watch(Arc::new(|path| {
///     println!("Document changed: {}", path);
/// }))?;
///
/// // Later, stop watching
/// watcher.stop()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FileWatcher {
    /// Root directory being watched
    root: PathBuf,
    /// Debounce delay (default 500ms)
    debounce_delay: Duration,
    /// Internal watcher
    watcher: Option<RecommendedWatcher>,
    /// Thread handle for the event loop
    watch_thread: Option<JoinHandle<()>>,
    /// Stop signal sender
    stop_tx: Option<Sender<()>>,
}

impl FileWatcher {
    /// Creates a new watcher for the given store root.
    ///
    /// # Arguments
    ///
    /// * `root` - Directory to watch recursively
    /// * `debounce_delay` - Optional debounce delay (default 500ms)
    pub fn new(root: impl AsRef<Path>, debounce_delay: Option<Duration>) -> Result<Self> {
        let root = root.as_ref();

        if !root.is_dir() {
            return Err(ConfigError::Watcher {
                message: format!("Directory does not exist: {}", root.display()),
                source: None,
            });
        }

        let root = root.canonicalize().map_err(|e| ConfigError::Watcher {
            message: format!("Failed to resolve directory: {}", root.display()),
            source: Some(Box::new(e)),
        })?;

        Ok(Self {
            root,
            debounce_delay: debounce_delay.unwrap_or(DEFAULT_DEBOUNCE),
            watcher: None,
            watch_thread: None,
            stop_tx: None,
        })
    }

    /// The directory being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Runs until a stop signal arrives or the event channel closes.
///
/// Changes are reported on the trailing edge: a path is passed to the
/// callback once no event has arrived for `debounce_delay`, so the last
/// write of a burst is always followed by a callback.
fn event_loop(
    root: PathBuf,
    debounce_delay: Duration,
    event_rx: Receiver<notify::Result<Event>>,
    stop_rx: Receiver<()>,
    callback: ChangeCallback,
) {
    let mut pending: BTreeSet<String> = BTreeSet::new();
    let mut last_event = Instant::now();

    loop {
        if stop_rx.try_recv().is_ok() {
            break;
        }

        let wait = if pending.is_empty() {
            POLL_INTERVAL
        } else {
            debounce_delay
                .saturating_sub(last_event.elapsed())
                .min(POLL_INTERVAL)
        };

        match event_rx.recv_timeout(wait) {
            Ok(Ok(event)) => {
                if event.kind.is_access() {
                    continue;
                }
                for changed in &event.paths {
                    let relative = changed.strip_prefix(&root).unwrap_or(changed);
                    pending.insert(relative.to_string_lossy().replace('\\', "/"));
                }
                last_event = Instant::now();
                continue;
            }
            Ok(Err(e)) => {
                warn!(error = %e, "File watcher reported an error");
                continue;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if !pending.is_empty() && last_event.elapsed() >= debounce_delay {
            for path in std::mem::take(&mut pending) {
                debug!(path = %path, "Store content changed");
                callback(path);
            }
        }
    }
}

impl StoreWatcher for FileWatcher {
    fn watch(&mut self, callback: ChangeCallback) -> Result<()> {
        if self.watcher.is_some() {
            return Err(ConfigError::Watcher {
                message: "Watcher is already running".to_string(),
                source: None,
            });
        }

        let (event_tx, event_rx) = channel();
        let (stop_tx, stop_rx) = channel::<()>();

        let mut watcher =
            RecommendedWatcher::new(event_tx, notify::Config::default()).map_err(|e| {
                ConfigError::Watcher {
                    message: format!("Failed to create file watcher: {}", e),
                    source: Some(Box::new(e)),
                }
            })?;

        watcher
            .watch(&self.root, RecursiveMode::Recursive)
            .map_err(|e| ConfigError::Watcher {
                message: format!("Failed to start watching: {}", e),
                source: Some(Box::new(e)),
            })?;

        let root = self.root.clone();
        let debounce_delay = self.debounce_delay;
        let watch_thread =
            thread::spawn(move || event_loop(root, debounce_delay, event_rx, stop_rx, callback));

        self.watcher = Some(watcher);
        self.stop_tx = Some(stop_tx);
        self.watch_thread = Some(watch_thread);

        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }

        if let Some(handle) = self.watch_thread.take() {
            handle.join().map_err(|_| ConfigError::Watcher {
                message: "Failed to join watcher thread".to_string(),
                source: None,
            })?;
        }

        self.watcher = None;

        Ok(())
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
