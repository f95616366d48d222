//! Persistent URL-keyed blob store for fetched weight files.
//!
//! The store is a directory tree `<root>/fileStorage/v1/` holding one blob
//! file per cached URL plus a JSON manifest. Records are write-once: a URL is
//! either absent or maps to the bytes from its first successful fetch. There
//! is no eviction, no size limit, and no integrity check of cached bytes —
//! a corrupted entry is reused exactly like a valid one.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

/// Logical store name, kept stable across releases.
pub const STORE_NAME: &str = "fileStorage";

/// On-disk layout version.
pub const STORE_VERSION: u32 = 1;

const MANIFEST_FILE: &str = "manifest.json";
const FILES_DIR: &str = "files";

/// One cached blob record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedFile {
    /// The source URL, also the store key.
    pub url: String,
    /// Blob file name relative to the store's `files/` directory.
    pub file: String,
    /// Unix seconds at the time of the `put`.
    pub last_modified: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Manifest {
    version: u32,
    files: BTreeMap<String, CachedFile>,
}

/// A persistent key-value store of large fetched files, keyed by URL.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    manifest: Manifest,
}

impl FileStore {
    /// Opens (or creates, on first use) the store under `root`.
    pub async fn open(root: &Path) -> Result<Self> {
        let dir = root.join(STORE_NAME).join(format!("v{}", STORE_VERSION));
        tokio::fs::create_dir_all(dir.join(FILES_DIR))
            .await
            .with_context(|| format!("failed to create store directory {:?}", dir))?;

        let manifest_path = dir.join(MANIFEST_FILE);
        let manifest = if manifest_path.exists() {
            let bytes = tokio::fs::read(&manifest_path)
                .await
                .with_context(|| format!("failed to read manifest {:?}", manifest_path))?;
            let manifest: Manifest =
                serde_json::from_slice(&bytes).context("failed to parse store manifest")?;
            if manifest.version != STORE_VERSION {
                return Err(anyhow!(
                    "store manifest version {} does not match expected {}",
                    manifest.version,
                    STORE_VERSION
                ));
            }
            manifest
        } else {
            Manifest {
                version: STORE_VERSION,
                files: BTreeMap::new(),
            }
        };

        Ok(Self { dir, manifest })
    }

    /// Looks up a record by URL. Returns `None` on an unseen key, or when the
    /// recorded blob has disappeared from disk.
    pub fn get(&self, url: &str) -> Option<&CachedFile> {
        let record = self.manifest.files.get(url)?;
        if self.blob_path(record).exists() {
            Some(record)
        } else {
            None
        }
    }

    /// Whether a URL has a cached blob.
    pub fn contains(&self, url: &str) -> bool {
        self.get(url).is_some()
    }

    /// Number of cached records.
    pub fn len(&self) -> usize {
        self.manifest.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifest.files.is_empty()
    }

    /// Absolute path of a record's blob file.
    pub fn blob_path(&self, record: &CachedFile) -> PathBuf {
        self.dir.join(FILES_DIR).join(&record.file)
    }

    /// Writes a blob and records it under `url`, flushing the manifest.
    pub async fn put(&mut self, url: &str, bytes: &[u8]) -> Result<CachedFile> {
        let file = blob_file_name(url);
        let path = self.dir.join(FILES_DIR).join(&file);
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("failed to write blob {:?}", path))?;

        let record = CachedFile {
            url: url.to_string(),
            file,
            last_modified: unix_now(),
        };
        self.manifest.files.insert(url.to_string(), record.clone());
        self.flush_manifest().await?;

        log::debug!("stored {} bytes for {}", bytes.len(), url);
        Ok(record)
    }

    /// Reads a cached blob back. `None` on an unseen key.
    pub async fn read(&self, url: &str) -> Result<Option<Vec<u8>>> {
        match self.get(url) {
            Some(record) => {
                let path = self.blob_path(record);
                let bytes = tokio::fs::read(&path)
                    .await
                    .with_context(|| format!("failed to read blob {:?}", path))?;
                Ok(Some(bytes))
            }
            None => Ok(None),
        }
    }

    /// Removes a record and its blob. No-op on an unseen key.
    pub async fn remove(&mut self, url: &str) -> Result<()> {
        if let Some(record) = self.manifest.files.remove(url) {
            let path = self.dir.join(FILES_DIR).join(&record.file);
            if path.exists() {
                tokio::fs::remove_file(&path)
                    .await
                    .with_context(|| format!("failed to remove blob {:?}", path))?;
            }
            self.flush_manifest().await?;
        }
        Ok(())
    }

    async fn flush_manifest(&self) -> Result<()> {
        let path = self.dir.join(MANIFEST_FILE);
        let bytes = serde_json::to_vec_pretty(&self.manifest)?;
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("failed to write manifest {:?}", path))
    }
}

/// Derives a filesystem-safe blob name from a URL. The full URL is retained
/// so distinct URLs cannot collide.
fn blob_file_name(url: &str) -> String {
    url.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
