//! Document rewriting - expands every JSON-Schema blob in a RAML-style document.
//!
//! The document is expected to look like:
//! ```json
//! {
//!   "schemas": [ { "User": "{ ...schema text... }" } ],
//!   "resources": [ { "methods": [ { "body": { "application/json": { "schema": "..." } } } ] } ]
//! }
//! ```
//! Entries of `schemas` are expanded to compact JSON. Any `schema` key found
//! under `resources` whose text is draft-04 JSON-Schema is expanded and
//! written back pretty-printed.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use crate::error::DerefError;
use crate::resolver::Resolver;
use crate::storage::Storage;
use crate::types::{is_json_schema, json_type_name, needs_expansion, schema_id, SCHEMA_KEY};

/// Expanded schemas keyed by their declared `id`.
///
/// Entries are never evicted. A cache lives as long as the
/// [`DocumentRewriter`] that owns it.
#[derive(Debug, Default, Clone)]
pub struct ExpandedSchemaCache {
    entries: HashMap<String, Value>,
}

impl ExpandedSchemaCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Expanded schema recorded under `id`, if any.
    pub fn get(&self, id: &str) -> Option<&Value> {
        self.entries.get(id)
    }

    /// Record the expansion of the schema whose `id` is `id`.
    pub fn insert(&mut self, id: impl Into<String>, expanded: Value) {
        self.entries.insert(id.into(), expanded);
    }

    /// True if an expansion is recorded under `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Number of cached expansions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Rewrites the schema nodes of RAML-style documents.
///
/// Reusing one rewriter for several documents shares its cache between
/// them; use [`expand_json_schemas`] for an isolated run.
pub struct DocumentRewriter<'s> {
    resolver: Resolver<'s>,
    cache: ExpandedSchemaCache,
}

impl<'s> DocumentRewriter<'s> {
    /// Create a rewriter with a default [`Resolver`] over `storages`.
    pub fn new(storages: &'s [Box<dyn Storage>]) -> Self {
        Self::with_resolver(Resolver::new(storages))
    }

    /// Create a rewriter around a configured resolver, e.g. with a custom depth limit.
    pub fn with_resolver(resolver: Resolver<'s>) -> Self {
        Self {
            resolver,
            cache: ExpandedSchemaCache::new(),
        }
    }

    /// Expanded schemas collected so far.
    pub fn cache(&self) -> &ExpandedSchemaCache {
        &self.cache
    }

    /// Expand `schemas` entries and every schema node under `resources`.
    ///
    /// # Errors
    ///
    /// Returns `DerefError::InvalidDocument` if the document isn't an object,
    /// or the first resolution error encountered; nothing is returned
    /// partially expanded.
    pub fn rewrite(&mut self, mut doc: Value) -> Result<Value, DerefError> {
        let Some(map) = doc.as_object_mut() else {
            return Err(DerefError::InvalidDocument {
                message: "expected a JSON object at the top level".to_string(),
            });
        };

        if let Some(schemas) = map.get_mut("schemas") {
            self.rewrite_schemas(schemas)?;
        }

        if let Some(resources) = map.get_mut("resources") {
            match resources {
                Value::Array(items) => {
                    for resource in items {
                        self.fix_schema_nodes(resource)?;
                    }
                }
                Value::Null => {}
                other => {
                    return Err(DerefError::InvalidDocument {
                        message: format!(
                            "'resources' must be an array, got {}",
                            json_type_name(other)
                        ),
                    })
                }
            }
        }

        Ok(doc)
    }

    /// Each entry of `schemas` is a single-key object `{ name: text }`.
    fn rewrite_schemas(&mut self, schemas: &mut Value) -> Result<(), DerefError> {
        let entries = match schemas {
            Value::Array(entries) => entries,
            Value::Null => return Ok(()),
            _ => {
                return Err(DerefError::InvalidDocument {
                    message: "'schemas' must be an array of single-key objects".to_string(),
                })
            }
        };

        for entry in entries {
            let Some((name, value)) = entry.as_object_mut().and_then(|m| m.iter_mut().next())
            else {
                continue;
            };
            if let Value::String(text) = value {
                debug!(schema = %name, "expanding named schema");
                let locator = format!("schemas/{name}");
                *text = self.expand_schema_text(text, &locator)?;
            }
        }
        Ok(())
    }

    /// Expand a schema text, recording the result under its `id`.
    fn expand_schema_text(&mut self, text: &str, locator: &str) -> Result<String, DerefError> {
        if !needs_expansion(text) {
            return Ok(text.to_string());
        }
        let schema = parse_schema(text, locator)?;
        let id = schema_id(&schema).map(str::to_string);
        let expanded = self.resolver.expand_value(schema)?;
        let out =
            serde_json::to_string(&expanded).map_err(|source| DerefError::Serialize { source })?;
        if let Some(id) = id {
            self.cache.insert(id, expanded);
        }
        Ok(out)
    }

    fn fix_schema_nodes(&mut self, node: &mut Value) -> Result<(), DerefError> {
        match node {
            Value::Object(map) => {
                for (key, value) in map.iter_mut() {
                    match value {
                        Value::String(text) if key == SCHEMA_KEY && is_json_schema(text.as_str()) => {
                            let expanded = self.expand_inline(text)?;
                            *text = serde_json::to_string_pretty(&expanded)
                                .map_err(|source| DerefError::Serialize { source })?;
                        }
                        Value::Object(_) | Value::Array(_) => self.fix_schema_nodes(value)?,
                        _ => {}
                    }
                }
            }
            Value::Array(items) => {
                for item in items.iter_mut().filter(|item| item.is_object()) {
                    self.fix_schema_nodes(item)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn expand_inline(&mut self, text: &str) -> Result<Value, DerefError> {
        let schema = parse_schema(text, "<inline schema>")?;
        let id = schema_id(&schema).map(str::to_string);

        if let Some(id) = id.as_deref() {
            if let Some(cached) = self.cache.get(id) {
                debug!(id, "expanded schema cache hit");
                return Ok(cached.clone());
            }
        }

        let expanded = if needs_expansion(text) {
            self.resolver.expand_value(schema)?
        } else {
            schema
        };
        if let Some(id) = id {
            self.cache.insert(id, expanded.clone());
        }
        Ok(expanded)
    }
}

fn parse_schema(text: &str, locator: &str) -> Result<Value, DerefError> {
    serde_json::from_str(text).map_err(|source| DerefError::InvalidJson {
        locator: locator.to_string(),
        source,
    })
}

/// Expand every JSON-Schema blob in `doc` with a fresh cache.
///
/// # Example
///
/// ```
/// use schema_deref::{expand_json_schemas, Storage};
/// use serde_json::json;
///
/// let storages: Vec<Box<dyn Storage>> = Vec::new();
/// let doc = json!({
///     "schemas": [],
///     "resources": [{
///         "relativeUri": "/users",
///         "schema": r##"{
///             "$schema": "http://json-schema.org/draft-04/schema#",
///             "definitions": { "name": { "type": "string" } },
///             "properties": { "name": { "$ref": "#/definitions/name" } }
///         }"##
///     }]
/// });
///
/// let expanded = expand_json_schemas(doc, &storages).unwrap();
/// let text = expanded["resources"][0]["schema"].as_str().unwrap();
/// assert!(!text.contains("$ref"));
/// ```
pub fn expand_json_schemas(doc: Value, storages: &[Box<dyn Storage>]) -> Result<Value, DerefError> {
    DocumentRewriter::new(storages).rewrite(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn no_storages() -> Vec<Box<dyn Storage>> {
        Vec::new()
    }

    #[test]
    fn rejects_non_object_document() {
        let storages = no_storages();
        let result = expand_json_schemas(json!([1, 2]), &storages);
        assert!(matches!(result, Err(DerefError::InvalidDocument { .. })));
    }

    #[test]
    fn missing_sections_are_fine() {
        let storages = no_storages();
        let doc = json!({ "title": "API" });
        assert_eq!(expand_json_schemas(doc.clone(), &storages).unwrap(), doc);
    }

    #[test]
    fn non_schema_text_is_untouched() {
        let storages = no_storages();
        let doc = json!({
            "schemas": [{ "Plain": "not a schema" }],
            "resources": [{ "schema": "User", "body": { "schema": "{\"type\": \"string\"}" } }]
        });
        assert_eq!(expand_json_schemas(doc.clone(), &storages).unwrap(), doc);
    }

    #[test]
    fn inline_schema_is_pretty_printed() {
        let storages = no_storages();
        let doc = json!({
            "resources": [{
                "schema": r#"{"$schema":"http://json-schema.org/draft-04/schema#","type":"string"}"#
            }]
        });
        let out = expand_json_schemas(doc, &storages).unwrap();
        assert_eq!(
            out["resources"][0]["schema"],
            "{\n  \"$schema\": \"http://json-schema.org/draft-04/schema#\",\n  \"type\": \"string\"\n}"
        );
    }

    #[test]
    fn named_schema_populates_cache() {
        let storages = no_storages();
        let mut rewriter = DocumentRewriter::new(&storages);
        let doc = json!({
            "schemas": [{
                "User": r##"{"$schema":"http://json-schema.org/draft-04/schema#","id":"user","definitions":{"n":{"type":"string"}},"properties":{"name":{"$ref":"#/definitions/n"}}}"##
            }]
        });
        let out = rewriter.rewrite(doc).unwrap();
        assert!(rewriter.cache().contains("user"));
        let text = out["schemas"][0]["User"].as_str().unwrap();
        assert!(!text.contains("$ref"));
        assert!(!text.contains('\n'));
    }

    #[test]
    fn cache_empty_by_default() {
        let cache = ExpandedSchemaCache::new();
        assert!(cache.is_empty());
        assert_eq!(cache.len(), 0);
        assert!(cache.get("x").is_none());
    }
}
