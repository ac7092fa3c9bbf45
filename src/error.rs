use std::path::{Path, PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FoamError>;

/// Every failure surfaced by the dictionary model and case preparation.
#[derive(Debug, Error)]
pub enum FoamError {
    /// A document, command list or control value was rejected at construction.
    #[error("invalid {what}: {reason}")]
    Validation { what: String, reason: String },

    /// A dictionary file is structurally invalid.
    #[error("failed to parse {source_name} at line {line}: {message}")]
    Parse {
        source_name: String,
        line: usize,
        message: String,
    },

    /// A recipe requires a document that neither the case nor the field registry provides.
    #[error("{recipe} needs the '{quantity}' file but the case has none and no field template exists for it")]
    MissingQuantity { quantity: String, recipe: String },

    #[error("key '{key}' not found in {file}")]
    KeyNotFound { file: String, key: String },

    #[error("I/O failure on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid case description {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

impl FoamError {
    pub fn validation(what: impl Into<String>, reason: impl Into<String>) -> Self {
        FoamError::Validation {
            what: what.into(),
            reason: reason.into(),
        }
    }

    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        FoamError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}
