//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde_json::Value;
use schema_deref::{DerefError, Storage};

pub const DRAFT04: &str = "http://json-schema.org/draft-04/schema#";

/// In-memory storage that records every locator it is asked for.
pub struct MemoryStorage {
    name: String,
    docs: HashMap<String, Value>,
    calls: Rc<RefCell<Vec<String>>>,
}

impl MemoryStorage {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            docs: HashMap::new(),
            calls: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn with(mut self, locator: &str, doc: Value) -> Self {
        self.docs.insert(locator.to_string(), doc);
        self
    }

    /// Handle to the call log that stays valid after the storage is boxed.
    pub fn calls(&self) -> Rc<RefCell<Vec<String>>> {
        Rc::clone(&self.calls)
    }
}

impl Storage for MemoryStorage {
    fn fetch(&self, locator: &str) -> Result<Option<Value>, DerefError> {
        self.calls.borrow_mut().push(locator.to_string());
        Ok(self.docs.get(locator).cloned())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Write `content` to `dir/name`, creating parent directories.
pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}
