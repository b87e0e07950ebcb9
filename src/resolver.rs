//! Reference resolution - replaces `$ref` pointers with the subtrees they name.
//!
//! Walking is an owned tree transform: each node is consumed and a rebuilt
//! node returned, so a document fetched once and referenced from several
//! places is copied at each site rather than aliased.

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::DerefError;
use crate::pointer::{base_path, join_locator, navigate, RefPointer};
use crate::storage::Storage;
use crate::types::{json_type_name, needs_expansion, schema_id, REF_KEY};

/// Default limit on nested reference hops.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Where references found while walking a document are resolved.
struct Context<'s, 'r> {
    /// Storages still worth searching. Narrows when a fetch crosses documents.
    storages: &'s [Box<dyn Storage>],
    /// Directory-equivalent prefix for relative file references.
    base_path: String,
    /// Target of same-document references.
    root: &'r Value,
    /// Number of reference hops taken to reach this document.
    depth: usize,
}

impl<'s, 'r> Context<'s, 'r> {
    fn new(
        storages: &'s [Box<dyn Storage>],
        root: &'r Value,
        source: Option<&str>,
        depth: usize,
    ) -> Self {
        let base_path = schema_id(root)
            .or(source)
            .map(base_path)
            .unwrap_or_default();
        Self {
            storages,
            base_path,
            root,
            depth,
        }
    }

    fn descend(&self) -> Context<'s, 'r> {
        Context {
            storages: self.storages,
            base_path: self.base_path.clone(),
            root: self.root,
            depth: self.depth + 1,
        }
    }
}

/// A document returned by one of the context's storages.
struct Fetched {
    document: Value,
    locator: String,
    storage_index: usize,
}

/// Expands `$ref` pointers against an ordered list of storages.
pub struct Resolver<'s> {
    storages: &'s [Box<dyn Storage>],
    max_depth: usize,
}

impl<'s> Resolver<'s> {
    /// Create a resolver over `storages`, most specific first.
    pub fn new(storages: &'s [Box<dyn Storage>]) -> Self {
        Self {
            storages,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Set the maximum number of nested reference hops.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Expand a schema given as text.
    ///
    /// Text that doesn't mention `$ref` or isn't draft-04 JSON-Schema is
    /// returned unchanged without being parsed. Otherwise the fully expanded
    /// schema is returned as compact JSON.
    ///
    /// # Errors
    ///
    /// Returns `DerefError::InvalidJson` if the text doesn't parse, or any
    /// resolution error from [`Resolver::expand_value`].
    pub fn expand_schema(&self, schema_text: &str) -> Result<String, DerefError> {
        if !needs_expansion(schema_text) {
            return Ok(schema_text.to_string());
        }
        let schema: Value =
            serde_json::from_str(schema_text).map_err(|source| DerefError::InvalidJson {
                locator: "<schema>".to_string(),
                source,
            })?;
        let expanded = self.expand_value(schema)?;
        serde_json::to_string(&expanded).map_err(|source| DerefError::Serialize { source })
    }

    /// Expand every `$ref` in a parsed schema.
    ///
    /// Relative file references are resolved against the directory of the
    /// schema's own `id`, or against the storage roots if it has none.
    ///
    /// # Errors
    ///
    /// - `ReferenceNotFound` if no storage holds a referenced file
    /// - `PathNotResolvable` if an inner path doesn't exist
    /// - `NonObjectTarget` if a reference resolves to something other than an object
    /// - `RecursionLimit` if references nest deeper than [`Resolver::max_depth`]
    /// - any storage error
    pub fn expand_value(&self, schema: Value) -> Result<Value, DerefError> {
        let root = schema.clone();
        let context = Context::new(self.storages, &root, None, 0);
        self.walk_tree(&context, schema)
    }

    fn walk_tree(&self, ctx: &Context<'_, '_>, node: Value) -> Result<Value, DerefError> {
        match node {
            Value::Object(map) => self.walk_object(ctx, map).map(Value::Object),
            Value::Array(items) => self.walk_array(ctx, items).map(Value::Array),
            other => Ok(other),
        }
    }

    fn walk_object(
        &self,
        ctx: &Context<'_, '_>,
        node: Map<String, Value>,
    ) -> Result<Map<String, Value>, DerefError> {
        let mut out = Map::with_capacity(node.len());
        let mut expanded_ref: Option<(String, Value)> = None;

        let mut entries = node.into_iter();
        while let Some((key, value)) = entries.next() {
            if key == REF_KEY {
                if let Value::String(reference) = &value {
                    if RefPointer::is_self(reference) {
                        // Self-reference: leave this node as it stands.
                        out.insert(key, value);
                        out.extend(entries);
                        return Ok(out);
                    }
                    let target = self.fetch_ref_data(ctx, reference)?;
                    expanded_ref = Some((reference.clone(), target));
                    continue;
                }
            }

            let value = match value {
                Value::Object(map) => Value::Object(self.walk_object(ctx, map)?),
                Value::Array(items) => Value::Array(self.walk_array(ctx, items)?),
                other => other,
            };
            out.insert(key, value);
        }

        if let Some((reference, target)) = expanded_ref {
            match target {
                // Referenced attributes overwrite the node's own.
                Value::Object(attrs) => out.extend(attrs),
                other => {
                    return Err(DerefError::NonObjectTarget {
                        reference,
                        actual: json_type_name(&other),
                    })
                }
            }
        }

        Ok(out)
    }

    fn walk_array(
        &self,
        ctx: &Context<'_, '_>,
        items: Vec<Value>,
    ) -> Result<Vec<Value>, DerefError> {
        items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => self.walk_object(ctx, map).map(Value::Object),
                other => Ok(other),
            })
            .collect()
    }

    fn fetch_ref_data(&self, ctx: &Context<'_, '_>, reference: &str) -> Result<Value, DerefError> {
        if ctx.depth >= self.max_depth {
            return Err(DerefError::RecursionLimit {
                reference: reference.to_string(),
                limit: self.max_depth,
            });
        }

        let pointer = RefPointer::parse(reference);

        if pointer.file_uri.is_empty() {
            let target = select(ctx.root, pointer.inner_path, "current document")?;
            return self.walk_tree(&ctx.descend(), target);
        }

        let fetched = self.fetch_document(ctx, pointer.file_uri)?;
        let target = select(&fetched.document, pointer.inner_path, pointer.file_uri)?;
        let child = Context::new(
            &ctx.storages[fetched.storage_index..],
            &fetched.document,
            Some(fetched.locator.as_str()),
            ctx.depth + 1,
        );
        self.walk_tree(&child, target)
    }

    /// Search the context's storages for `file_uri`, first joined onto the
    /// base path and then as given.
    fn fetch_document(&self, ctx: &Context<'_, '_>, file_uri: &str) -> Result<Fetched, DerefError> {
        let joined = join_locator(&ctx.base_path, file_uri);

        for (storage_index, storage) in ctx.storages.iter().enumerate() {
            let mut candidates = vec![joined.as_str()];
            if joined != file_uri {
                candidates.push(file_uri);
            }
            for locator in candidates {
                if let Some(document) = storage.fetch(locator)? {
                    debug!(
                        reference = file_uri,
                        locator,
                        storage = storage.name(),
                        "resolved reference"
                    );
                    return Ok(Fetched {
                        document,
                        locator: locator.to_string(),
                        storage_index,
                    });
                }
            }
            debug!(
                reference = file_uri,
                storage = storage.name(),
                "reference not in storage"
            );
        }

        Err(DerefError::ReferenceNotFound {
            reference: file_uri.to_string(),
        })
    }
}

/// Pick the subtree at `inner_path`, or the whole document when it is empty.
fn select(document: &Value, inner_path: &str, file: &str) -> Result<Value, DerefError> {
    navigate(document, inner_path)
        .cloned()
        .ok_or_else(|| DerefError::PathNotResolvable {
            path: inner_path.to_string(),
            file: file.to_string(),
        })
}

/// Expand a schema text against `storages`.
///
/// See [`Resolver::expand_schema`].
pub fn expand_schema(
    schema_text: &str,
    storages: &[Box<dyn Storage>],
) -> Result<String, DerefError> {
    Resolver::new(storages).expand_schema(schema_text)
}
