//! FILENAME: core/persistence/src/source.rs
// PURPOSE: Where manifest and partition bytes come from.
// CONTEXT: The dashboard is served statically, so a source only needs to
//          answer "give me the bytes at this relative path". HTTP is the
//          production case; a directory source serves local exports and tests.

use std::future::Future;
use std::path::{Component, Path, PathBuf};

use reqwest::Url;

use crate::error::DataError;

/// Retrieves raw bytes for a path relative to the source root.
pub trait PartitionSource: Send + Sync {
    fn fetch(&self, path: &str) -> impl Future<Output = Result<Vec<u8>, DataError>> + Send;
}

// ============================================================================
// HTTP
// ============================================================================

/// GETs paths relative to a base URL. Non-2xx responses are fetch errors.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    base: Url,
}

impl HttpSource {
    pub fn new(base: Url) -> Self {
        Self::with_client(reqwest::Client::new(), base)
    }

    /// Uses a caller-configured client (timeouts, proxies, headers).
    pub fn with_client(client: reqwest::Client, mut base: Url) -> Self {
        // `Url::join` replaces the last segment unless the base ends with '/'.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        HttpSource { client, base }
    }

    pub fn parse(base: &str) -> Result<Self, DataError> {
        let url = Url::parse(base).map_err(|e| DataError::fetch(base, format!("Invalid url: {e}")))?;
        Ok(Self::new(url))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// The absolute URL `path` resolves to.
    pub fn url_for(&self, path: &str) -> Result<Url, DataError> {
        self.base
            .join(path)
            .map_err(|e| DataError::fetch(path, format!("Invalid url: {e}")))
    }
}

impl PartitionSource for HttpSource {
    fn fetch(&self, path: &str) -> impl Future<Output = Result<Vec<u8>, DataError>> + Send {
        let path = path.to_string();
        async move {
            let url = self.url_for(&path)?;
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| DataError::fetch(&path, e))?;

            let status = response.status();
            if !status.is_success() {
                return Err(DataError::fetch(
                    &path,
                    format!("HTTP {} {}", status.as_u16(), status.canonical_reason().unwrap_or("")),
                ));
            }

            let body = response.bytes().await.map_err(|e| DataError::fetch(&path, e))?;
            Ok(body.to_vec())
        }
    }
}

// ============================================================================
// DIRECTORY
// ============================================================================

/// Reads paths relative to a root directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectorySource { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Joins `path` onto the root, refusing anything that would leave it.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, DataError> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(DataError::fetch(path, "path escapes the source root"));
        }
        Ok(self.root.join(relative))
    }
}

impl PartitionSource for DirectorySource {
    fn fetch(&self, path: &str) -> impl Future<Output = Result<Vec<u8>, DataError>> + Send {
        let resolved = self.resolve(path);
        let path = path.to_string();
        async move {
            let full = resolved?;
            tokio::fs::read(&full).await.map_err(|e| DataError::fetch(path, e))
        }
    }
}

// ============================================================================
// EITHER
// ============================================================================

/// A source picked at runtime, typically from configuration.
#[derive(Debug, Clone)]
pub enum AnySource {
    Http(HttpSource),
    Directory(DirectorySource),
}

impl PartitionSource for AnySource {
    fn fetch(&self, path: &str) -> impl Future<Output = Result<Vec<u8>, DataError>> + Send {
        let path = path.to_string();
        async move {
            match self {
                AnySource::Http(source) => source.fetch(&path).await,
                AnySource::Directory(source) => source.fetch(&path).await,
            }
        }
    }
}

impl From<HttpSource> for AnySource {
    fn from(source: HttpSource) -> Self {
        AnySource::Http(source)
    }
}

impl From<DirectorySource> for AnySource {
    fn from(source: DirectorySource) -> Self {
        AnySource::Directory(source)
    }
}
