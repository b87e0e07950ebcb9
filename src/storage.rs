//! Storage backends that turn a locator into a parsed JSON document.
//!
//! Every backend answers `Ok(None)` for "not here" so the resolver can move on
//! to the next candidate locator or the next storage. Only unexpected failures
//! (I/O other than not-found, transport errors, malformed JSON) are errors.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::trace;

use crate::error::DerefError;
use crate::types::is_url;

#[cfg(feature = "remote")]
use std::time::Duration;

/// A source of schema documents.
///
/// Implementations cache parsed results by the exact locator they were asked
/// for. Caches use interior mutability and are not shared across threads.
pub trait Storage {
    /// Fetch and parse the document at `locator`, or `Ok(None)` if absent.
    fn fetch(&self, locator: &str) -> Result<Option<Value>, DerefError>;

    /// Short label used in log output.
    fn name(&self) -> &str;
}

/// Reads documents from beneath a local root directory.
#[derive(Debug)]
pub struct LocalStorage {
    root: PathBuf,
    label: String,
    cache: RefCell<HashMap<PathBuf, Value>>,
}

impl LocalStorage {
    /// Create a storage that resolves locators under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let label = format!("local:{}", root.display());
        Self {
            root,
            label,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Directory locators are resolved against.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Storage for LocalStorage {
    fn fetch(&self, locator: &str) -> Result<Option<Value>, DerefError> {
        if is_url(locator) {
            return Ok(None);
        }
        // Locators are always taken relative to the root, even with a leading '/'.
        let full_path = self.root.join(locator.trim_start_matches('/'));

        if let Some(hit) = self.cache.borrow().get(&full_path) {
            return Ok(Some(hit.clone()));
        }

        trace!(path = %full_path.display(), "reading local schema");
        let content = match std::fs::read_to_string(&full_path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(DerefError::ReadError {
                    path: full_path,
                    source,
                })
            }
        };
        if content.trim().is_empty() {
            return Ok(None);
        }

        let parsed: Value =
            serde_json::from_str(&content).map_err(|source| DerefError::InvalidJson {
                locator: full_path.display().to_string(),
                source,
            })?;
        self.cache.borrow_mut().insert(full_path, parsed.clone());
        Ok(Some(parsed))
    }

    fn name(&self) -> &str {
        &self.label
    }
}

/// Fetches documents over HTTP(S).
///
/// Requires the `remote` feature (enabled by default). Locators that are not
/// `http://` or `https://` URLs are never requested. A 404 or 410 response is
/// "not found"; any other non-success status is an error.
#[cfg(feature = "remote")]
#[derive(Debug)]
pub struct WebStorage {
    client: reqwest::blocking::Client,
    cache: RefCell<HashMap<String, Value>>,
}

#[cfg(feature = "remote")]
impl WebStorage {
    /// Create a web storage with the default 30 second timeout.
    pub fn new() -> Result<Self, DerefError> {
        Self::with_timeout(crate::config::DEFAULT_HTTP_TIMEOUT)
    }

    /// Create a web storage whose requests give up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, DerefError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| DerefError::NetworkError {
                url: String::new(),
                source,
            })?;
        Ok(Self {
            client,
            cache: RefCell::new(HashMap::new()),
        })
    }
}

#[cfg(feature = "remote")]
impl Storage for WebStorage {
    fn fetch(&self, uri: &str) -> Result<Option<Value>, DerefError> {
        if !is_url(uri) {
            return Ok(None);
        }
        if let Some(hit) = self.cache.borrow().get(uri) {
            return Ok(Some(hit.clone()));
        }

        trace!(uri, "requesting remote schema");
        let response = self
            .client
            .get(uri)
            .send()
            .map_err(|source| DerefError::NetworkError {
                url: uri.to_string(),
                source,
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::GONE {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(DerefError::HttpStatus {
                url: uri.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().map_err(|source| DerefError::NetworkError {
            url: uri.to_string(),
            source,
        })?;
        let parsed: Value =
            serde_json::from_str(&body).map_err(|source| DerefError::InvalidJson {
                locator: uri.to_string(),
                source,
            })?;
        self.cache.borrow_mut().insert(uri.to_string(), parsed.clone());
        Ok(Some(parsed))
    }

    fn name(&self) -> &str {
        "web"
    }
}

/// Load a JSON document from a file path.
///
/// # Errors
///
/// Returns `DerefError::FileNotFound` if the file doesn't exist,
/// or `DerefError::InvalidJson` if the file isn't valid JSON.
pub fn load_document(path: &Path) -> Result<Value, DerefError> {
    if !path.exists() {
        return Err(DerefError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| DerefError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| DerefError::InvalidJson {
        locator: path.display().to_string(),
        source,
    })
}

/// Load a JSON document from a string.
///
/// # Errors
///
/// Returns `DerefError::InvalidJson` if the string isn't valid JSON.
pub fn load_document_str(content: &str) -> Result<Value, DerefError> {
    serde_json::from_str(content).map_err(|source| DerefError::InvalidJson {
        locator: "<input>".to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn local_fetch_joins_root() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("types")).unwrap();
        fs::write(dir.path().join("types/id.json"), r#"{"type": "string"}"#).unwrap();

        let storage = LocalStorage::new(dir.path());
        assert_eq!(storage.root(), dir.path());
        assert_eq!(storage.name(), format!("local:{}", dir.path().display()));

        let doc = storage.fetch("types/id.json").unwrap().unwrap();
        assert_eq!(doc["type"], "string");

        let doc = storage.fetch("/types/id.json").unwrap().unwrap();
        assert_eq!(doc["type"], "string");
    }

    #[test]
    fn local_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        assert!(storage.fetch("nope.json").unwrap().is_none());
    }

    #[test]
    fn local_empty_file_is_none() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("empty.json"), "").unwrap();
        let storage = LocalStorage::new(dir.path());
        assert!(storage.fetch("empty.json").unwrap().is_none());
    }

    #[test]
    fn local_skips_urls() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        assert!(storage
            .fetch("https://example.com/a.json")
            .unwrap()
            .is_none());
    }

    #[test]
    fn local_malformed_json_errors() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bad.json"), "{ not json").unwrap();
        let storage = LocalStorage::new(dir.path());
        let result = storage.fetch("bad.json");
        assert!(matches!(result, Err(DerefError::InvalidJson { .. })));
    }

    #[test]
    fn local_caches_by_full_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.json");
        fs::write(&path, r#"{"v": 1}"#).unwrap();

        let storage = LocalStorage::new(dir.path());
        assert_eq!(storage.fetch("a.json").unwrap().unwrap()["v"], 1);

        // Never invalidated, even if the file changes on disk.
        fs::write(&path, r#"{"v": 2}"#).unwrap();
        assert_eq!(storage.fetch("a.json").unwrap().unwrap()["v"], 1);
    }

    #[test]
    fn load_document_valid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"schemas": []}}"#).unwrap();

        let doc = load_document(file.path()).unwrap();
        assert!(doc["schemas"].is_array());
    }

    #[test]
    fn load_document_file_not_found() {
        let result = load_document(Path::new("/nonexistent/doc.json"));
        assert!(matches!(result, Err(DerefError::FileNotFound { .. })));
    }

    #[test]
    fn load_document_str_invalid() {
        let result = load_document_str("not json");
        assert!(matches!(result, Err(DerefError::InvalidJson { .. })));
    }

    #[cfg(feature = "remote")]
    #[test]
    fn web_skips_relative_locators() {
        let storage = WebStorage::new().unwrap();
        assert!(storage.fetch("types/id.json").unwrap().is_none());
    }
}
