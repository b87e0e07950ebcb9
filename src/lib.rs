//! Schema Dereferencer
//!
//! Expands `$ref` pointers inside draft-04 JSON-Schemas embedded in a
//! RAML-style API document, producing a self-contained document.
//!
//! A reference may point into the same schema (`#/definitions/x`), at another
//! file found under a local root (`types/user.json#/definitions/name`), or at a
//! schema served over HTTP. Referenced subtrees are expanded recursively and
//! merged into the referencing node.
//!
//! # Example
//!
//! ```
//! use schema_deref::{expand_schema, Storage};
//!
//! let storages: Vec<Box<dyn Storage>> = Vec::new();
//! let schema = r##"{
//!     "$schema": "http://json-schema.org/draft-04/schema#",
//!     "definitions": { "id": { "type": "integer", "minimum": 1 } },
//!     "properties": { "userId": { "$ref": "#/definitions/id", "description": "owner" } }
//! }"##;
//!
//! let expanded = expand_schema(schema, &storages).unwrap();
//! let value: serde_json::Value = serde_json::from_str(&expanded).unwrap();
//! assert_eq!(value["properties"]["userId"]["type"], "integer");
//! assert_eq!(value["properties"]["userId"]["description"], "owner");
//! ```
//!
//! # Reference Rules
//!
//! | `$ref` value | Resolves to |
//! |--------------|-------------|
//! | `"#"` | nothing; the node is left as-is |
//! | `"#/a/b"` | path `/a/b` of the current document |
//! | `"file.json"` | the whole of `file.json` |
//! | `"file.json#/a"` | path `/a` of `file.json` |
//!
//! Relative files are joined onto the directory of the current document's
//! `id` (or the locator it was fetched from) and searched in each storage,
//! then retried as written. Attributes of the referenced object overwrite the
//! referencing node's own attributes of the same name.

mod config;
mod error;
mod pointer;
mod resolver;
mod rewriter;
mod storage;
mod types;

pub use config::{StorageConfig, DEFAULT_HTTP_TIMEOUT, LOCAL_PATHS_ENV};
pub use error::DerefError;
pub use pointer::{base_path, join_locator, navigate, RefPointer};
pub use resolver::{expand_schema, Resolver, DEFAULT_MAX_DEPTH};
pub use rewriter::{expand_json_schemas, DocumentRewriter, ExpandedSchemaCache};
pub use storage::{load_document, load_document_str, LocalStorage, Storage};
pub use types::{is_json_schema, needs_expansion, DRAFT04_MARKER};

#[cfg(feature = "remote")]
pub use storage::WebStorage;
