use std::path::PathBuf;
use thiserror::Error;

/// The only two ways a whole document can be rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidDocument {
    #[error("malformed XML: {0}")]
    Malformed(String),

    #[error("schema violation at {path}: {message}")]
    SchemaViolation { path: String, message: String },
}

impl InvalidDocument {
    pub(crate) fn violation(path: &str, message: impl Into<String>) -> Self {
        Self::SchemaViolation {
            path: path.to_string(),
            message: message.into(),
        }
    }

    /// Element path of a schema violation, if that is what this is.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Malformed(_) => None,
            Self::SchemaViolation { path, .. } => Some(path),
        }
    }
}

#[derive(Debug, Error)]
pub enum HashError {
    #[error("unsupported hash algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to read schema {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse schema {path:?}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Error)]
pub enum MetalinkError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid metalink document: {0}")]
    Invalid(#[from] InvalidDocument),
}
