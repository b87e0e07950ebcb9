//! Reference pointers and locator arithmetic.
//!
//! A reference has the form `<fileUri>#<innerPath>`. Either half may be empty:
//! an empty file part points into the current document, an empty inner path
//! selects the whole document.

use serde_json::Value;

use crate::types::{is_url, SELF_REF};

/// A `$ref` value split into its file and inner-path halves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefPointer<'a> {
    pub file_uri: &'a str,
    pub inner_path: &'a str,
}

impl<'a> RefPointer<'a> {
    /// Split a reference on its first `#`.
    pub fn parse(reference: &'a str) -> Self {
        let (file_uri, inner_path) = reference.split_once('#').unwrap_or((reference, ""));
        Self {
            file_uri,
            inner_path,
        }
    }

    /// True for the bare `#` self-reference.
    pub fn is_self(reference: &str) -> bool {
        reference == SELF_REF
    }
}

/// Directory-equivalent prefix of a locator: everything before the last `/`.
///
/// A URL with no path keeps its `scheme://authority`.
pub fn base_path(locator: &str) -> String {
    let (authority, path) = split_authority(locator);
    match path.rfind('/') {
        Some(idx) => format!("{}{}", authority, &path[..idx]),
        None if !authority.is_empty() => authority.to_string(),
        None => String::new(),
    }
}

/// Join a reference onto a base path.
///
/// Absolute URLs are returned untouched. Everything else is concatenated and
/// lexically normalised (`.` dropped, `..` folded, repeated `/` collapsed),
/// preserving a URL base's `scheme://authority`.
pub fn join_locator(base: &str, reference: &str) -> String {
    if is_url(reference) {
        return reference.to_string();
    }
    let (authority, path) = split_authority(base);
    let joined = if path.is_empty() && authority.is_empty() {
        reference.to_string()
    } else {
        format!("{}/{}", path, reference)
    };
    let normalized = normalize(&joined, !authority.is_empty());
    format!("{}{}", authority, normalized)
}

/// Split `scheme://authority` off a URL; non-URLs have an empty authority.
fn split_authority(locator: &str) -> (&str, &str) {
    if !is_url(locator) {
        return ("", locator);
    }
    let after_scheme = locator.find("://").map(|i| i + 3).unwrap_or(0);
    match locator[after_scheme..].find('/') {
        Some(idx) => locator.split_at(after_scheme + idx),
        None => (locator, ""),
    }
}

fn normalize(path: &str, force_absolute: bool) -> String {
    let absolute = force_absolute || path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().map_or(false, |last| *last != "..") {
                    segments.pop();
                } else if !absolute {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }
    let body = segments.join("/");
    if absolute {
        format!("/{}", body)
    } else if body.is_empty() {
        ".".to_string()
    } else {
        body
    }
}

/// Navigate an inner path (e.g. `/definitions/address`) one key at a time.
///
/// Empty segments are skipped, segments are JSON-Pointer unescaped and may
/// index into arrays. Returns `None` as soon as a segment is missing.
pub fn navigate<'v>(document: &'v Value, inner_path: &str) -> Option<&'v Value> {
    let mut current = document;
    for part in inner_path.split('/').filter(|p| !p.is_empty()) {
        let key = part.replace("~1", "/").replace("~0", "~");
        current = match current {
            Value::Object(map) => map.get(&key)?,
            Value::Array(items) => items.get(key.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}
