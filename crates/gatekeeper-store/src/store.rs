//! One-shot content-addressed file store (spec §4.6). The in-memory index
//! is authoritative: a key disappears from the index the instant `get`
//! starts serving it, so two concurrent reads of the same key race on a
//! single `DashMap` remove and only one can ever win.

use crate::error::StoreError;
use crate::mime;
use dashmap::DashMap;
use rand::RngCore;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct StoredMeta {
    pub path: PathBuf,
    pub mime_type: String,
    pub size: u64,
}

pub struct FileStore {
    dir: PathBuf,
    index: DashMap<String, StoredMeta>,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStore {
            dir: dir.into(),
            index: DashMap::new(),
        }
    }

    pub async fn store(&self, bytes: &[u8]) -> Result<String, StoreError> {
        let key = generate_key();
        let mime_type = mime::sniff(bytes);
        let ext = mime::extension_for(&mime_type);
        let path = self.dir.join(format!("{key}{ext}"));
        tokio::fs::write(&path, bytes).await?;
        self.index.insert(
            key.clone(),
            StoredMeta {
                path,
                mime_type,
                size: bytes.len() as u64,
            },
        );
        Ok(key)
    }

    pub async fn store_base64(&self, encoded: &str) -> Result<String, StoreError> {
        use base64::Engine;
        let bytes = base64::engine::general_purpose::STANDARD.decode(encoded)?;
        self.store(&bytes).await
    }

    pub async fn store_file(&self, path: &std::path::Path) -> Result<String, StoreError> {
        let bytes = tokio::fs::read(path).await?;
        self.store(&bytes).await
    }

    /// Atomically removes the index entry, then reads and unlinks the
    /// backing file. A second concurrent call (or any call after the
    /// first succeeds) sees `NotFound`.
    pub async fn get(&self, key: &str) -> Result<(StoredMeta, Vec<u8>), StoreError> {
        let (_, meta) = self.index.remove(key).ok_or(StoreError::NotFound)?;
        let bytes = tokio::fs::read(&meta.path).await?;
        if let Err(e) = tokio::fs::remove_file(&meta.path).await {
            tracing::warn!(path = %meta.path.display(), error = %e, "failed to unlink stored file after read");
        }
        Ok((meta, bytes))
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

fn generate_key() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_then_get_round_trips_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let key = store.store(b"hello world").await.unwrap();
        assert_eq!(key.len(), 64);
        let (meta, bytes) = store.get(&key).await.unwrap();
        assert_eq!(bytes, b"hello world");
        assert_eq!(meta.size, 11);
    }

    #[tokio::test]
    async fn second_get_of_the_same_key_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let key = store.store(b"once only").await.unwrap();
        store.get(&key).await.unwrap();
        let second = store.get(&key).await;
        assert!(matches!(second, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn store_base64_decodes_and_sniffs() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        use base64::Engine;
        let png_prefix = [0x89u8, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        let encoded = base64::engine::general_purpose::STANDARD.encode(png_prefix);
        let key = store.store_base64(&encoded).await.unwrap();
        let (meta, _bytes) = store.get(&key).await.unwrap();
        assert_eq!(meta.mime_type, "image/png");
    }

    #[tokio::test]
    async fn file_is_unlinked_after_successful_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let key = store.store(b"disk contents").await.unwrap();
        let (meta, _) = store.get(&key).await.unwrap();
        assert!(!meta.path.exists());
    }
}
