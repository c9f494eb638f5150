//! Asset Store - Manifest and Asset Byte Collaborators
//!
//! Assets are addressed by (pack identifier, filename). A directory store
//! lays them out as `{root}/{identifier}/{filename}` next to the manifest
//! file `{root}/contents.json`.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use crate::model::is_traversal_free;

pub const DEFAULT_MANIFEST_FILE: &str = "contents.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Asset not found: {identifier}/{filename}")]
    NotFound { identifier: String, filename: String },

    #[error("Manifest not found: {0}")]
    ManifestNotFound(String),

    #[error("Asset store I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StoreError {
    fn not_found(identifier: &str, filename: &str) -> Self {
        StoreError::NotFound {
            identifier: identifier.to_string(),
            filename: filename.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. } | StoreError::ManifestNotFound(_))
    }
}

/// Byte-level access to pack assets.
pub trait AssetStore: Send + Sync {
    /// Read a whole asset. Unknown identifier or filename is `StoreError::NotFound`.
    fn fetch_asset_bytes(&self, identifier: &str, filename: &str) -> Result<Vec<u8>, StoreError>;

    /// Open an asset for streaming.
    fn open_asset(
        &self,
        identifier: &str,
        filename: &str,
    ) -> Result<Box<dyn Read + Send>, StoreError> {
        let bytes = self.fetch_asset_bytes(identifier, filename)?;
        Ok(Box::new(Cursor::new(bytes)))
    }
}

/// The authoritative copy of the manifest document.
pub trait ManifestSource: Send + Sync {
    fn read_manifest(&self) -> Result<Vec<u8>, StoreError>;
}

impl<T: AssetStore + ?Sized> AssetStore for Arc<T> {
    fn fetch_asset_bytes(&self, identifier: &str, filename: &str) -> Result<Vec<u8>, StoreError> {
        (**self).fetch_asset_bytes(identifier, filename)
    }

    fn open_asset(
        &self,
        identifier: &str,
        filename: &str,
    ) -> Result<Box<dyn Read + Send>, StoreError> {
        (**self).open_asset(identifier, filename)
    }
}

impl<T: ManifestSource + ?Sized> ManifestSource for Arc<T> {
    fn read_manifest(&self) -> Result<Vec<u8>, StoreError> {
        (**self).read_manifest()
    }
}

/// Filesystem-backed store rooted at one directory.
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
    manifest_file: String,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            manifest_file: DEFAULT_MANIFEST_FILE.to_string(),
        }
    }

    pub fn with_manifest_file(mut self, manifest_file: impl Into<String>) -> Self {
        self.manifest_file = manifest_file.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(&self.manifest_file)
    }

    /// Resolve an asset path, refusing anything that could leave the pack directory.
    pub fn asset_path(&self, identifier: &str, filename: &str) -> Result<PathBuf, StoreError> {
        let safe = |part: &str| !part.is_empty() && is_traversal_free(part) && !part.contains('\\');
        if !safe(identifier) || !safe(filename) {
            return Err(StoreError::not_found(identifier, filename));
        }
        Ok(self.root.join(identifier).join(filename))
    }
}

impl AssetStore for DirStore {
    fn fetch_asset_bytes(&self, identifier: &str, filename: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.asset_path(identifier, filename)?;
        fs::read(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StoreError::not_found(identifier, filename),
            _ => StoreError::Io(e),
        })
    }

    fn open_asset(
        &self,
        identifier: &str,
        filename: &str,
    ) -> Result<Box<dyn Read + Send>, StoreError> {
        let path = self.asset_path(identifier, filename)?;
        match File::open(&path) {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::not_found(identifier, filename))
            }
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

impl ManifestSource for DirStore {
    fn read_manifest(&self) -> Result<Vec<u8>, StoreError> {
        let path = self.manifest_path();
        fs::read(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StoreError::ManifestNotFound(path.display().to_string()),
            _ => StoreError::Io(e),
        })
    }
}

/// In-memory store, mutable through a shared reference.
#[derive(Debug, Default)]
pub struct MemoryStore {
    manifest: RwLock<Option<Vec<u8>>>,
    assets: RwLock<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_manifest(&self, bytes: impl Into<Vec<u8>>) {
        *self.manifest.write() = Some(bytes.into());
    }

    pub fn put_asset(&self, identifier: &str, filename: &str, bytes: impl Into<Vec<u8>>) {
        self.assets
            .write()
            .insert((identifier.to_string(), filename.to_string()), bytes.into());
    }

    pub fn remove_asset(&self, identifier: &str, filename: &str) -> Option<Vec<u8>> {
        self.assets
            .write()
            .remove(&(identifier.to_string(), filename.to_string()))
    }
}

impl AssetStore for MemoryStore {
    fn fetch_asset_bytes(&self, identifier: &str, filename: &str) -> Result<Vec<u8>, StoreError> {
        self.assets
            .read()
            .get(&(identifier.to_string(), filename.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::not_found(identifier, filename))
    }
}

impl ManifestSource for MemoryStore {
    fn read_manifest(&self) -> Result<Vec<u8>, StoreError> {
        self.manifest
            .read()
            .clone()
            .ok_or_else(|| StoreError::ManifestNotFound("<memory>".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dir_store_reads_assets_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("abc")).unwrap();
        fs::write(dir.path().join("abc").join("01.webp"), b"bytes").unwrap();
        fs::write(dir.path().join("contents.json"), b"{}").unwrap();

        let store = DirStore::new(dir.path());
        assert_eq!(store.fetch_asset_bytes("abc", "01.webp").unwrap(), b"bytes");
        assert_eq!(store.read_manifest().unwrap(), b"{}");

        let mut streamed = Vec::new();
        store.open_asset("abc", "01.webp").unwrap().read_to_end(&mut streamed).unwrap();
        assert_eq!(streamed, b"bytes");
    }

    #[test]
    fn test_dir_store_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirStore::new(dir.path());
        assert!(store.fetch_asset_bytes("abc", "01.webp").unwrap_err().is_not_found());
        assert!(matches!(store.open_asset("abc", "01.webp"), Err(e) if e.is_not_found()));
        assert!(store.read_manifest().unwrap_err().is_not_found());
    }

    #[test]
    fn test_dir_store_refuses_traversal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("secret"), b"x").unwrap();
        let store = DirStore::new(dir.path());
        for (id, file) in [
            ("..", "secret"),
            ("abc", "../secret"),
            ("a/b", "c"),
            ("abc", "..\\secret"),
            (".", "secret"),
            ("abc", "."),
        ] {
            let err = store.fetch_asset_bytes(id, file).unwrap_err();
            assert!(matches!(err, StoreError::NotFound { .. }), "{id}/{file}");
        }
    }

    #[test]
    fn test_custom_manifest_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("packs.json"), b"[]").unwrap();
        let store = DirStore::new(dir.path()).with_manifest_file("packs.json");
        assert_eq!(store.read_manifest().unwrap(), b"[]");
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert!(store.read_manifest().is_err());
        store.set_manifest("{}");
        store.put_asset("abc", "tray.png", vec![1, 2, 3]);
        assert_eq!(store.read_manifest().unwrap(), b"{}");
        assert_eq!(store.fetch_asset_bytes("abc", "tray.png").unwrap(), vec![1, 2, 3]);
        assert!(store.fetch_asset_bytes("abd", "tray.png").unwrap_err().is_not_found());
        store.remove_asset("abc", "tray.png");
        assert!(store.fetch_asset_bytes("abc", "tray.png").is_err());
    }
}
