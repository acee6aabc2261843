//! Error types for schema resolution, ordering, widget lookup and form state.

use std::path::PathBuf;
use thiserror::Error;

/// Errors during schema resolution and document loading.
#[derive(Debug, Error)]
pub enum ResolveError {
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
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    // Schema errors (exit code 2)
    #[error("Could not find a definition for {reference}.")]
    DefinitionNotFound { reference: String },

    #[error("circular $ref chain through {reference}")]
    CircularReference { reference: String },

    #[error("invalid schema: {message}")]
    InvalidSchema { message: String },
}

impl ResolveError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ResolveError::FileNotFound { .. } | ResolveError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            ResolveError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}

/// Irreconcilable `allOf` branches.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("could not merge subschemas in allOf: conflicting values for {keyword}")]
pub struct MergeError {
    pub keyword: String,
}

impl MergeError {
    pub(crate) fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
        }
    }
}

/// Problems with a `ui:order` declaration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OrderError {
    #[error("uiSchema order list contains more than one wildcard item{}", at_path(path))]
    MultipleWildcards { path: String },

    #[error("uiSchema order list does not contain {}", property_list(properties))]
    MissingProperties { properties: Vec<String> },
}

fn at_path(path: &str) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!(" at {}", path)
    }
}

fn property_list(properties: &[String]) -> String {
    if properties.len() > 1 {
        format!("properties '{}'", properties.join("', '"))
    } else {
        format!("property '{}'", properties.join(""))
    }
}

/// Widget lookup failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WidgetError {
    #[error("Unsupported widget definition: {kind}")]
    Unsupported { kind: String },

    #[error("No widget for type \"{schema_type}\"")]
    NoWidgetForType { schema_type: String },

    #[error("No widget \"{widget}\" for type \"{schema_type}\"")]
    NoWidget { widget: String, schema_type: String },

    #[error("widget alias cycle through \"{widget}\"")]
    AliasCycle { widget: String },
}

/// Errors raised while computing form state.
#[derive(Debug, Error)]
pub enum FormError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Order(#[from] OrderError),
}

impl FormError {
    pub fn exit_code(&self) -> i32 {
        match self {
            FormError::Resolve(e) => e.exit_code(),
            FormError::Order(_) => 2,
        }
    }
}
