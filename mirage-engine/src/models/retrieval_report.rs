//! Retrieval results and skip records

use crate::types::{ExtractionError, MediaItem, MediaKind, ScoredResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// What a result's `score` means
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreKind {
    /// Euclidean distance in the subspace, lower is better
    Distance,
    /// `1 - distance / max_distance` over the full result set, higher is better
    Similarity,
    /// Cosine similarity of melody histograms, higher is better
    Cosine,
}

impl ScoreKind {
    /// Short label for tables
    pub fn label(&self) -> &'static str {
        match self {
            ScoreKind::Distance => "distance (lower is better)",
            ScoreKind::Similarity => "similarity (higher is better)",
            ScoreKind::Cosine => "cosine (higher is better)",
        }
    }
}

/// Corpus item dropped from a retrieval call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedItem {
    /// File path that caused the error
    pub path: PathBuf,

    /// Error code (e.g. "IMAGE_DECODE_ERROR", "NO_NOTES")
    pub error_code: String,

    /// Human-readable error message
    pub error_message: String,

    /// When the error occurred
    pub occurred_at: DateTime<Utc>,
}

impl SkippedItem {
    pub fn from_error(item: &MediaItem, error: &ExtractionError) -> Self {
        Self {
            path: item.path.clone(),
            error_code: error.code().to_string(),
            error_message: error.to_string(),
            occurred_at: mirage_common::time::now(),
        }
    }
}

/// Outcome of one retrieval call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalReport {
    /// Identifier shared with log lines and events of this call
    pub request_id: Uuid,

    /// Pipeline that produced the report
    pub kind: MediaKind,

    /// Query file as given by the caller
    pub query: PathBuf,

    /// Best match first, at most N entries
    pub results: Vec<ScoredResult>,

    /// Meaning of `results[..].score`
    pub score_kind: ScoreKind,

    /// Files enumerated in the corpus directory
    pub corpus_size: usize,

    /// Files that produced a feature vector
    pub usable_items: usize,

    /// Files dropped during extraction
    pub skipped: Vec<SkippedItem>,

    /// Whether the image subspace came from the cache
    pub cache_hit: bool,

    /// When the call started
    pub started_at: DateTime<Utc>,

    /// Wall-clock processing time
    pub elapsed_ms: u64,
}

impl RetrievalReport {
    /// Result identifiers in rank order
    pub fn ids(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.id.as_str()).collect()
    }

    /// Top result, if any
    pub fn best(&self) -> Option<&ScoredResult> {
        self.results.first()
    }
}
