//! Fingerprint-keyed cache of fitted image subspaces
//!
//! Fitting the subspace is the expensive part of an image query. When the
//! corpus has not changed between calls, the mean, basis and projected corpus
//! can be reused as-is. Entries are immutable and shared behind `Arc`; a
//! changed corpus produces a different key, so stale entries are never hit and
//! simply age out.

use crate::projection::ProjectedCorpus;
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::UNIX_EPOCH;

/// Entries kept before the oldest is evicted
pub const DEFAULT_CAPACITY: usize = 4;

/// SHA-256 over the corpus listing and the fit parameters
///
/// Each file contributes its path, size and modification time, so edits,
/// additions and removals all change the key without hashing file contents.
pub fn corpus_fingerprint(
    files: &[PathBuf],
    width: u32,
    height: u32,
    components: usize,
) -> std::io::Result<String> {
    let mut sorted: Vec<&PathBuf> = files.iter().collect();
    sorted.sort();

    let mut hasher = Sha256::new();
    for path in sorted {
        let metadata = std::fs::metadata(path)?;
        let mtime_nanos = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_nanos())
            .unwrap_or(0);

        hasher.update(path.to_string_lossy().as_bytes());
        hasher.update([0u8]);
        hasher.update(metadata.len().to_le_bytes());
        hasher.update(mtime_nanos.to_le_bytes());
    }
    hasher.update(width.to_le_bytes());
    hasher.update(height.to_le_bytes());
    hasher.update((components as u64).to_le_bytes());

    Ok(format!("{:x}", hasher.finalize()))
}

/// Bounded cache, oldest entry evicted first
#[derive(Debug)]
pub struct SubspaceCache {
    capacity: usize,
    entries: Mutex<VecDeque<(String, Arc<ProjectedCorpus>)>>,
}

impl SubspaceCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::new()),
        }
    }

    pub fn get(&self, fingerprint: &str) -> Option<Arc<ProjectedCorpus>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .iter()
            .find(|(key, _)| key == fingerprint)
            .map(|(_, corpus)| Arc::clone(corpus))
    }

    pub fn insert(&self, fingerprint: String, corpus: Arc<ProjectedCorpus>) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|(key, _)| *key != fingerprint);
        entries.push_back((fingerprint, corpus));
        while entries.len() > self.capacity {
            entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Default for SubspaceCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
