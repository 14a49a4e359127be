//! Generated source persistence.
//!
//! The [`DiskFiler`] writes generated units under the output directory
//! following package paths and refuses duplicate creations within one
//! round. The [`CachedFiler`] layers a content-addressed cache on top:
//! inputs whose fingerprint is unchanged restore their outputs from
//! `cache/classes/` instead of regenerating, and fresh outputs are
//! mirrored back with a bounded pool of async writers.

use blake3::Hasher;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;

/// Name of the manifest file inside the cache directory.
const MANIFEST_FILENAME: &str = "manifest.json";

/// Cached copies of generated sources live under this subdirectory.
const CLASSES_DIRNAME: &str = "classes";

/// At most this many cache mirror writes run concurrently.
const WRITER_POOL_SIZE: usize = 4;

/// Error types for generated source persistence.
#[derive(Debug, Error)]
pub enum FilerError {
    /// Filesystem operation failed.
    #[error("failed to write generated source: {0}")]
    Io(#[from] std::io::Error),

    /// Cache manifest could not be encoded.
    #[error("failed to encode cache manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

/// Computes the blake3 fingerprint of one input source.
pub fn fingerprint(source: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(source.as_bytes());
    hasher.finalize().to_hex().to_string()
}

/// Converts a qualified class name to its relative `.java` path.
pub fn source_path(qualified_name: &str) -> Utf8PathBuf {
    let mut path = Utf8PathBuf::new();
    for segment in qualified_name.split('.') {
        path.push(segment);
    }
    path.set_extension("java");
    path
}

/// Writes generated sources under the output directory.
#[derive(Debug)]
pub struct DiskFiler {
    out_dir: Utf8PathBuf,
    written_this_round: HashSet<String>,
}

impl DiskFiler {
    pub fn new(out_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            written_this_round: HashSet::new(),
        }
    }

    /// Resets duplicate tracking at a round boundary.
    pub fn begin_round(&mut self) {
        self.written_this_round.clear();
    }

    /// Writes one generated unit, creating package directories as needed.
    ///
    /// A second creation of the same qualified name within a round is a
    /// logged no-op and returns `Ok(false)`.
    pub fn create_source(&mut self, qualified_name: &str, content: &str) -> Result<bool, FilerError> {
        if !self.written_this_round.insert(qualified_name.to_string()) {
            eprintln!("actiongen: skipping duplicate generation of {qualified_name}");
            return Ok(false);
        }

        let path = self.out_dir.join(source_path(qualified_name));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(true)
    }

    pub fn out_dir(&self) -> &Utf8Path {
        &self.out_dir
    }
}

/// One manifest record: input fingerprint plus the outputs it produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    fingerprint: String,
    generated: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheManifest {
    entries: HashMap<String, CacheEntry>,
}

/// Content-addressed cache over a [`DiskFiler`].
#[derive(Debug)]
pub struct CachedFiler {
    inner: DiskFiler,
    cache_dir: Utf8PathBuf,
    manifest: CacheManifest,
    pending: Vec<(Utf8PathBuf, String)>,
}

impl CachedFiler {
    /// Opens the cache, loading the manifest when one exists.
    pub fn new(
        out_dir: impl Into<Utf8PathBuf>,
        cache_dir: impl Into<Utf8PathBuf>,
    ) -> Self {
        let cache_dir = cache_dir.into();
        let manifest = fs::read_to_string(cache_dir.join(MANIFEST_FILENAME))
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or_default();
        Self {
            inner: DiskFiler::new(out_dir),
            cache_dir,
            manifest,
            pending: Vec::new(),
        }
    }

    pub fn begin_round(&mut self) {
        self.inner.begin_round();
    }

    /// Whether the given input is unchanged and all its cached outputs exist.
    pub fn is_fresh(&self, input: &str, input_fingerprint: &str) -> bool {
        match self.manifest.entries.get(input) {
            Some(entry) => {
                entry.fingerprint == input_fingerprint
                    && entry
                        .generated
                        .iter()
                        .all(|rel| self.cache_dir.join(CLASSES_DIRNAME).join(rel).exists())
            }
            None => false,
        }
    }

    /// Copies the cached outputs of an unchanged input into the output
    /// directory. Returns the number of restored units.
    pub fn restore(&mut self, input: &str) -> Result<usize, FilerError> {
        let Some(entry) = self.manifest.entries.get(input) else {
            return Ok(0);
        };
        let mut restored = 0;
        for rel in entry.generated.clone() {
            let cached = self.cache_dir.join(CLASSES_DIRNAME).join(&rel);
            let target = self.inner.out_dir.join(&rel);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(&cached, &target)?;
            restored += 1;
        }
        Ok(restored)
    }

    /// Writes one generated unit and queues its cache mirror.
    pub fn create_source(
        &mut self,
        input: &str,
        input_fingerprint: &str,
        qualified_name: &str,
        content: &str,
    ) -> Result<bool, FilerError> {
        if !self.inner.create_source(qualified_name, content)? {
            return Ok(false);
        }

        let rel = source_path(qualified_name);
        let entry = self
            .manifest
            .entries
            .entry(input.to_string())
            .or_insert_with(|| CacheEntry {
                fingerprint: input_fingerprint.to_string(),
                generated: Vec::new(),
            });
        if entry.fingerprint != input_fingerprint {
            entry.fingerprint = input_fingerprint.to_string();
            entry.generated.clear();
        }
        if !entry.generated.iter().any(|g| g == rel.as_str()) {
            entry.generated.push(rel.to_string());
        }

        self.pending
            .push((self.cache_dir.join(CLASSES_DIRNAME).join(rel), content.to_string()));
        Ok(true)
    }

    /// Drops manifest entries for inputs that no longer exist.
    pub fn retain_inputs(&mut self, live: &HashSet<String>) {
        self.manifest.entries.retain(|input, _| live.contains(input));
    }

    /// Flushes queued cache mirrors with the bounded writer pool, then
    /// persists the manifest.
    pub async fn flush(&mut self) -> Result<(), FilerError> {
        let semaphore = Arc::new(Semaphore::new(WRITER_POOL_SIZE));
        let mut handles = Vec::with_capacity(self.pending.len());

        for (path, content) in self.pending.drain(..) {
            let semaphore = Arc::clone(&semaphore);
            handles.push(tokio::spawn(async move {
                // A closed semaphore is unreachable, it lives for the loop.
                let Ok(_permit) = semaphore.acquire().await else {
                    return;
                };
                if let Some(parent) = path.parent() {
                    if tokio::fs::create_dir_all(parent).await.is_err() {
                        eprintln!("actiongen: failed to create cache directory {parent}");
                        return;
                    }
                }
                if tokio::fs::write(&path, content).await.is_err() {
                    eprintln!("actiongen: failed to mirror {path} into the cache");
                }
            }));
        }
        for handle in handles {
            let _ = handle.await;
        }

        fs::create_dir_all(&self.cache_dir)?;
        let text = serde_json::to_string_pretty(&self.manifest)?;
        fs::write(self.cache_dir.join(MANIFEST_FILENAME), text)?;
        Ok(())
    }

    pub fn out_dir(&self) -> &Utf8Path {
        self.inner.out_dir()
    }
}
