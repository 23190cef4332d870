//! FILENAME: core/data-store/src/config.rs
// PURPOSE: Store configuration, read from JSON.
// CONTEXT: Every field has a default so a dashboard can ship `{}` and only
//          override what differs (usually just the source).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use engine::FilterState;
use persistence::{AnySource, DirectorySource, HttpSource, MANIFEST_FILE_NAME};
use pivot_engine::{AverageDivisor, PivotOptions, DEFAULT_KEY_SEPARATOR, DEFAULT_NULL_KEY};

use crate::error::StoreError;

/// Where the dataset lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SourceConfig {
    Http {
        #[serde(rename = "baseUrl")]
        base_url: String,
    },
    Directory {
        root: PathBuf,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreConfig {
    /// Manifest location relative to the source root.
    pub manifest_path: String,

    /// Required by `DataStore::from_config`; ignored by `DataStore::open`.
    pub source: Option<SourceConfig>,

    /// Divisor for `avg` metrics that do not pin their own.
    pub average: AverageDivisor,

    /// Joins group values into pivot keys.
    pub key_separator: String,

    /// Stands in for null group values inside pivot keys.
    pub null_key: String,

    /// Filter state the store starts with.
    pub initial_filters: FilterState,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            manifest_path: MANIFEST_FILE_NAME.to_string(),
            source: None,
            average: AverageDivisor::default(),
            key_separator: DEFAULT_KEY_SEPARATOR.to_string(),
            null_key: DEFAULT_NULL_KEY.to_string(),
            initial_filters: FilterState::default(),
        }
    }
}

impl StoreConfig {
    pub fn from_json_str(json: &str) -> Result<Self, StoreError> {
        let config: StoreConfig =
            serde_json::from_str(json).map_err(|e| StoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, StoreError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Config(format!("Failed to read {:?}: {}", path, e)))?;
        Self::from_json_str(&json)
    }

    pub fn with_source(mut self, source: SourceConfig) -> Self {
        self.source = Some(source);
        self
    }

    fn validate(&self) -> Result<(), StoreError> {
        if self.manifest_path.trim().is_empty() {
            return Err(StoreError::Config("manifestPath must not be empty".to_string()));
        }
        if self.key_separator.is_empty() {
            return Err(StoreError::Config("keySeparator must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn pivot_options(&self) -> PivotOptions {
        PivotOptions {
            key_separator: self.key_separator.clone(),
            null_key: self.null_key.clone(),
            default_divisor: self.average,
        }
    }

    /// Builds the configured source.
    pub fn build_source(&self) -> Result<AnySource, StoreError> {
        match &self.source {
            Some(SourceConfig::Http { base_url }) => Ok(HttpSource::parse(base_url)?.into()),
            Some(SourceConfig::Directory { root }) => Ok(DirectorySource::new(root.clone()).into()),
            None => Err(StoreError::Config("no source configured".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::FilterValue;

    #[test]
    fn empty_object_uses_defaults() {
        let config = StoreConfig::from_json_str("{}").unwrap();
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.manifest_path, "index.json");
        assert_eq!(config.average, AverageDivisor::Group);
    }

    #[test]
    fn parses_full_config() {
        let config = StoreConfig::from_json_str(
            r#"{
                "manifestPath": "data/index.json",
                "source": {"kind": "http", "baseUrl": "https://example.org/dash/"},
                "average": "filteredSet",
                "keySeparator": " / ",
                "nullKey": "N/A",
                "initialFilters": {"store": ["A", "B"]}
            }"#,
        )
        .unwrap();

        assert_eq!(config.manifest_path, "data/index.json");
        assert_eq!(
            config.source,
            Some(SourceConfig::Http { base_url: "https://example.org/dash/".to_string() })
        );
        assert_eq!(config.average, AverageDivisor::FilteredSet);
        assert_eq!(
            config.initial_filters.get("store"),
            Some(&FilterValue::set(["A", "B"]))
        );

        let options = config.pivot_options();
        assert_eq!(options.key_separator, " / ");
        assert_eq!(options.null_key, "N/A");
        assert_eq!(options.default_divisor, AverageDivisor::FilteredSet);
    }

    #[test]
    fn parses_directory_source() {
        let config =
            StoreConfig::from_json_str(r#"{"source": {"kind": "directory", "root": "/srv/data"}}"#)
                .unwrap();
        assert!(matches!(config.build_source().unwrap(), AnySource::Directory(_)));
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(StoreConfig::from_json_str(r#"{"manifestPath": ""}"#).is_err());
        assert!(StoreConfig::from_json_str(r#"{"keySeparator": ""}"#).is_err());
        assert!(StoreConfig::from_json_str(r#"{"average": "median"}"#).is_err());
    }

    #[test]
    fn missing_source_is_a_config_error() {
        let err = StoreConfig::default().build_source().unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn reads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, r#"{"nullKey": "-"}"#).unwrap();

        let config = StoreConfig::from_file(&path).unwrap();
        assert_eq!(config.null_key, "-");
        assert!(StoreConfig::from_file(&dir.path().join("missing.json")).is_err());
    }
}
