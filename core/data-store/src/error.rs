//! FILENAME: core/data-store/src/error.rs

use thiserror::Error;

use persistence::DataError;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Manifest or partition could not be fetched or decoded.
    #[error(transparent)]
    Data(#[from] DataError),

    /// A newer `set_filters` started while this one was resolving. The
    /// result was discarded; the cache entry it produced is kept.
    #[error("Filter update {generation} superseded by update {current}")]
    Superseded { generation: u64, current: u64 },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl StoreError {
    pub fn is_superseded(&self) -> bool {
        matches!(self, StoreError::Superseded { .. })
    }

    /// The underlying fetch/decode failure, if that is what this is.
    pub fn data_error(&self) -> Option<&DataError> {
        match self {
            StoreError::Data(e) => Some(e),
            _ => None,
        }
    }
}
