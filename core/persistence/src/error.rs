//! FILENAME: core/persistence/src/error.rs

use thiserror::Error;

/// Failures while retrieving or decoding the manifest or a partition.
///
/// Neither variant is retried or swallowed at this layer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    /// The bytes could not be retrieved (transport failure, non-success status,
    /// missing file) or the manifest lacks its `partitions` field.
    #[error("Fetch error for {path}: {reason}")]
    Fetch { path: String, reason: String },

    /// The bytes were retrieved but do not have the expected shape.
    #[error("Decode error for {path}: {reason}")]
    Decode { path: String, reason: String },
}

impl DataError {
    pub fn fetch(path: impl Into<String>, reason: impl ToString) -> Self {
        DataError::Fetch {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn decode(path: impl Into<String>, reason: impl ToString) -> Self {
        DataError::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn is_fetch(&self) -> bool {
        matches!(self, DataError::Fetch { .. })
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, DataError::Decode { .. })
    }

    /// The manifest or partition location the error refers to.
    pub fn path(&self) -> &str {
        match self {
            DataError::Fetch { path, .. } | DataError::Decode { path, .. } => path,
        }
    }
}
