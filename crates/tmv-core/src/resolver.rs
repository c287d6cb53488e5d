//! # Resource Resolution
//!
//! The collaborator interface used to fetch external resources (buffer
//! files, external schema files) by URI. The binary validation core never
//! resolves anything itself: buffers are resolved before it runs and handed
//! over as bytes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Fetches the bytes behind a URI.
pub trait ResourceResolver: Send + Sync {
    /// The bytes of the resource, or `None` when it cannot be resolved.
    fn resolve_data(&self, uri: &str) -> Option<Vec<u8>>;
}

/// Resolves nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullResourceResolver;

impl ResourceResolver for NullResourceResolver {
    fn resolve_data(&self, _uri: &str) -> Option<Vec<u8>> {
        None
    }
}

/// Resolves relative URIs against a base directory on disk.
#[derive(Debug, Clone)]
pub struct FileResourceResolver {
    base_dir: PathBuf,
}

impl FileResourceResolver {
    /// Resolve relative to `base_dir`.
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    /// Resolve relative to the directory containing `file`.
    pub fn for_file(file: impl AsRef<Path>) -> Self {
        let dir = file
            .as_ref()
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self::new(dir)
    }

    /// The base directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

impl ResourceResolver for FileResourceResolver {
    fn resolve_data(&self, uri: &str) -> Option<Vec<u8>> {
        if uri.contains("://") || uri.starts_with("data:") {
            tracing::debug!(uri, "only relative file URIs are resolved");
            return None;
        }
        let path = self.base_dir.join(uri);
        match std::fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "resource not readable");
                None
            }
        }
    }
}

/// Resolves URIs from an in-memory map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryResourceResolver {
    resources: HashMap<String, Vec<u8>>,
}

impl InMemoryResourceResolver {
    /// An empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource.
    pub fn insert(&mut self, uri: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.resources.insert(uri.into(), data.into());
    }

    /// Register a resource, builder style.
    pub fn with(mut self, uri: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.insert(uri, data);
        self
    }
}

impl ResourceResolver for InMemoryResourceResolver {
    fn resolve_data(&self, uri: &str) -> Option<Vec<u8>> {
        self.resources.get(uri).cloned()
    }
}
