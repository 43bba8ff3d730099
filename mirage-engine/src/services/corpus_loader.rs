//! Corpus loader
//!
//! Lists the eligible files of one corpus directory. Eligibility is decided by
//! extension alone (case-insensitive); a file with the right extension but
//! unreadable contents is reported later as a skipped item.
//!
//! The listing is sorted by path so that row `i` of every matrix built during
//! a call refers to entry `i` of this list. Only the directory's own entries
//! are listed; a symlink counts as a file when its target is one.

use crate::types::{MediaItem, MediaKind};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

/// Corpus listing errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Cannot access file
    #[error("File access error {0}: {1}")]
    FileAccessError(PathBuf, String),

    /// Directory holds no file with an allowed extension
    #[error("No eligible files in {0}")]
    NoEligibleFiles(PathBuf),
}

/// Listing with statistics
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// Eligible files, sorted by path
    pub files: Vec<PathBuf>,
    /// Total size of all files in bytes
    pub total_size: u64,
    /// Count of files by extension (lowercase)
    pub by_format: HashMap<String, usize>,
    /// Per-file metadata errors encountered
    pub errors: Vec<String>,
}

/// Corpus directory lister
pub struct CorpusLoader {
    ignore_patterns: Vec<String>,
}

impl CorpusLoader {
    /// Create a loader that lists only the directory's own entries
    ///
    /// Ignores system files like .DS_Store, Thumbs.db, .git, etc.
    pub fn new() -> Self {
        Self {
            ignore_patterns: vec![
                ".DS_Store".to_string(),
                "Thumbs.db".to_string(),
                ".git".to_string(),
                ".svn".to_string(),
            ],
        }
    }

    /// List files whose extension is in `allowed_extensions`
    ///
    /// # Errors
    /// `NoEligibleFiles` when nothing matches, so callers can abort before any
    /// numerical step runs.
    pub fn list_items(
        &self,
        directory: &Path,
        allowed_extensions: &[&str],
    ) -> Result<Vec<PathBuf>, ScanError> {
        if !directory.exists() {
            return Err(ScanError::PathNotFound(directory.to_path_buf()));
        }

        if !directory.is_dir() {
            return Err(ScanError::NotADirectory(directory.to_path_buf()));
        }

        let mut files = Vec::new();

        let walker = WalkDir::new(directory)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_entry(|e| self.should_process_entry(e));

        for entry in walker {
            match entry {
                Ok(entry) => {
                    // Path::is_file follows symlinks
                    if entry.path().is_file()
                        && has_allowed_extension(entry.path(), allowed_extensions)
                    {
                        files.push(entry.path().to_path_buf());
                    }
                }
                Err(e) => {
                    tracing::warn!("Error accessing entry: {}", e);
                }
            }
        }

        files.sort();

        tracing::debug!(
            directory = %directory.display(),
            files = files.len(),
            "Corpus listing complete"
        );

        if files.is_empty() {
            return Err(ScanError::NoEligibleFiles(directory.to_path_buf()));
        }

        Ok(files)
    }

    /// List a corpus directory as media items of one kind
    pub fn list_media(
        &self,
        directory: &Path,
        kind: MediaKind,
        allowed_extensions: &[&str],
    ) -> Result<Vec<MediaItem>, ScanError> {
        let files = self.list_items(directory, allowed_extensions)?;
        Ok(files
            .into_iter()
            .map(|path| MediaItem::from_path(path, kind))
            .collect())
    }

    /// List with size and per-extension statistics
    pub fn scan_with_stats(
        &self,
        directory: &Path,
        allowed_extensions: &[&str],
    ) -> Result<ScanResult, ScanError> {
        let files = self.list_items(directory, allowed_extensions)?;

        let mut total_size = 0u64;
        let mut by_format = HashMap::new();
        let mut errors = Vec::new();

        for file in &files {
            match std::fs::metadata(file) {
                Ok(metadata) => total_size += metadata.len(),
                Err(e) => errors.push(
                    ScanError::FileAccessError(file.clone(), e.to_string()).to_string(),
                ),
            }

            if let Some(ext) = file.extension() {
                let ext_str = ext.to_string_lossy().to_lowercase();
                *by_format.entry(ext_str).or_insert(0) += 1;
            }
        }

        Ok(ScanResult {
            files,
            total_size,
            by_format,
            errors,
        })
    }

    fn should_process_entry(&self, entry: &DirEntry) -> bool {
        let file_name = entry.file_name().to_string_lossy();
        !self
            .ignore_patterns
            .iter()
            .any(|pattern| file_name.contains(pattern.as_str()))
    }
}

impl Default for CorpusLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Case-insensitive extension check (extensions given without the dot)
pub fn has_allowed_extension(path: &Path, allowed_extensions: &[&str]) -> bool {
    match path.extension() {
        Some(ext) => {
            let ext = ext.to_string_lossy();
            allowed_extensions
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(&ext))
        }
        None => false,
    }
}
