//! Storage configuration.
//!
//! Local roots come first, most specific first, followed by a single network
//! storage used as the fallback.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::DerefError;
use crate::storage::{LocalStorage, Storage};

/// Environment variable holding semicolon-delimited local schema roots.
pub const LOCAL_PATHS_ENV: &str = "SCHEMA_LOCAL_PATHS";

/// Default timeout for network fetches.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Which storages to search, in which order.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Local root directories, searched in order.
    pub local_roots: Vec<PathBuf>,
    /// Append a network storage after the local roots.
    /// Ignored when the crate is built without the `remote` feature.
    pub remote: bool,
    /// Timeout for each network fetch.
    pub http_timeout: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            local_roots: Vec::new(),
            remote: true,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

impl StorageConfig {
    /// Configuration from `SCHEMA_LOCAL_PATHS`; remote fallback enabled.
    pub fn from_env() -> Self {
        match std::env::var(LOCAL_PATHS_ENV) {
            Ok(list) => Self::from_local_paths(&list),
            Err(_) => Self::default(),
        }
    }

    /// Parse a semicolon-delimited list of local roots. Empty entries are skipped.
    pub fn from_local_paths(list: &str) -> Self {
        let mut local_roots = Vec::new();
        for entry in list.split(';') {
            if entry.trim().is_empty() {
                debug!(list, "skipping empty local path entry");
                continue;
            }
            local_roots.push(PathBuf::from(entry));
        }
        Self {
            local_roots,
            ..Self::default()
        }
    }

    /// Append a local root (least specific so far).
    pub fn local_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.local_roots.push(root.into());
        self
    }

    /// Insert a local root ahead of all others (most specific).
    pub fn prepend_local_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.local_roots.insert(0, root.into());
        self
    }

    /// Enable or disable the network fallback.
    pub fn remote(mut self, remote: bool) -> Self {
        self.remote = remote;
        self
    }

    /// Set the network fetch timeout.
    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Build the ordered storage list.
    ///
    /// # Errors
    ///
    /// Returns `DerefError::NetworkError` if the HTTP client can't be created.
    pub fn build(&self) -> Result<Vec<Box<dyn Storage>>, DerefError> {
        let mut storages: Vec<Box<dyn Storage>> = Vec::with_capacity(self.local_roots.len() + 1);
        for root in &self.local_roots {
            if !root.is_dir() {
                warn!(root = %root.display(), "local schema root is not a directory");
            }
            storages.push(Box::new(LocalStorage::new(root.clone())));
        }

        if self.remote {
            #[cfg(feature = "remote")]
            {
                storages.push(Box::new(crate::storage::WebStorage::with_timeout(
                    self.http_timeout,
                )?));
            }
            #[cfg(not(feature = "remote"))]
            {
                warn!("built without the `remote` feature; network storage disabled");
            }
        }

        debug!(
            storages = ?storages.iter().map(|s| s.name()).collect::<Vec<_>>(),
            "configured storages"
        );
        Ok(storages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_semicolon_list() {
        let config = StorageConfig::from_local_paths("/a;;/b;");
        assert_eq!(
            config.local_roots,
            vec![PathBuf::from("/a"), PathBuf::from("/b")]
        );
        assert!(config.remote);
        assert_eq!(config.http_timeout, Duration::from_secs(30));
    }

    #[test]
    fn empty_list_has_no_roots() {
        assert!(StorageConfig::from_local_paths("").local_roots.is_empty());
    }

    #[test]
    fn prepend_puts_root_first() {
        let config = StorageConfig::from_local_paths("/env")
            .local_root("/later")
            .prepend_local_root("/first");
        assert_eq!(
            config.local_roots,
            vec![
                PathBuf::from("/first"),
                PathBuf::from("/env"),
                PathBuf::from("/later")
            ]
        );
    }

    #[test]
    fn build_without_remote() {
        let storages = StorageConfig::from_local_paths("/a;/b")
            .remote(false)
            .build()
            .unwrap();
        let names: Vec<&str> = storages.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["local:/a", "local:/b"]);
    }

    #[cfg(feature = "remote")]
    #[test]
    fn build_puts_web_last() {
        let storages = StorageConfig::from_local_paths("/a").build().unwrap();
        let names: Vec<&str> = storages.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["local:/a", "web"]);
    }
}
