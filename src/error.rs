//! Error types for schema dereferencing.

use std::path::PathBuf;
use thiserror::Error;

/// Errors while fetching, resolving or rewriting schemas.
///
/// Any of these aborts the whole top-level expansion; there is no
/// partial-result mode.
#[derive(Debug, Error)]
pub enum DerefError {
    // Resolution errors (exit code 2)
    #[error("ref '{reference}' not found")]
    ReferenceNotFound { reference: String },

    #[error("cannot resolve path '{path}' in '{file}'")]
    PathNotResolvable { path: String, file: String },

    #[error("ref '{reference}' resolved to {actual}, expected object")]
    NonObjectTarget {
        reference: String,
        actual: &'static str,
    },

    #[error("ref '{reference}' exceeds the maximum reference depth of {limit}")]
    RecursionLimit { reference: String, limit: usize },

    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("can't get file by uri {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("can't get file by uri {url}: HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    // Parse errors (exit code 2)
    #[error("invalid JSON in {locator}: {source}")]
    InvalidJson {
        locator: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid document: {message}")]
    InvalidDocument { message: String },

    #[error("cannot serialize expanded schema: {source}")]
    Serialize {
        #[source]
        source: serde_json::Error,
    },
}

impl DerefError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            DerefError::FileNotFound { .. }
            | DerefError::ReadError { .. }
            | DerefError::HttpStatus { .. } => 3,
            #[cfg(feature = "remote")]
            DerefError::NetworkError { .. } => 3,
            _ => 2,
        }
    }

    /// Stable machine-readable tag for this error.
    pub fn kind(&self) -> &'static str {
        match self {
            DerefError::ReferenceNotFound { .. } => "reference_not_found",
            DerefError::PathNotResolvable { .. } => "path_not_resolvable",
            DerefError::NonObjectTarget { .. } => "non_object_target",
            DerefError::RecursionLimit { .. } => "recursion_limit",
            DerefError::FileNotFound { .. } => "file_not_found",
            DerefError::ReadError { .. } => "read_error",
            #[cfg(feature = "remote")]
            DerefError::NetworkError { .. } => "network_error",
            DerefError::HttpStatus { .. } => "http_status",
            DerefError::InvalidJson { .. } => "invalid_json",
            DerefError::InvalidDocument { .. } => "invalid_document",
            DerefError::Serialize { .. } => "serialize",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        let err = DerefError::ReferenceNotFound {
            reference: "missing.json".into(),
        };
        assert_eq!(err.exit_code(), 2);

        let err = DerefError::FileNotFound {
            path: PathBuf::from("doc.json"),
        };
        assert_eq!(err.exit_code(), 3);

        let err = DerefError::HttpStatus {
            url: "https://example.com/a.json".into(),
            status: 500,
        };
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn messages_name_the_failing_locator() {
        let err = DerefError::ReferenceNotFound {
            reference: "types/user.json".into(),
        };
        assert_eq!(err.to_string(), "ref 'types/user.json' not found");

        let err = DerefError::PathNotResolvable {
            path: "/definitions/missing".into(),
            file: "types/user.json".into(),
        };
        assert_eq!(
            err.to_string(),
            "cannot resolve path '/definitions/missing' in 'types/user.json'"
        );
    }

    #[test]
    fn kinds_are_snake_case() {
        let err = DerefError::InvalidDocument {
            message: "not an object".into(),
        };
        assert_eq!(err.kind(), "invalid_document");
    }
}
