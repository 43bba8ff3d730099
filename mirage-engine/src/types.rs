//! Core types and trait definitions
//!
//! Both retrieval pipelines share one shape: extract -> reduce/aggregate ->
//! compare -> rank. The types here are the vocabulary passed between those
//! stages:
//! - [`MediaItem`]: one enumerated corpus file
//! - [`FeatureVector`]: fixed-length numeric summary of an item
//! - [`ScoredResult`]: an item with its distance or similarity score
//! - [`FeatureExtractor`]: per-file extraction step used by the batch executor

use crate::models::RetrievalEvent;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

// ============================================================================
// Common Types
// ============================================================================

/// Fixed-length numeric feature vector
pub type FeatureVector = Vec<f64>;

/// Kind of media a corpus holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
}

impl MediaKind {
    /// Extensions (lowercase, no dot) eligible for this kind
    pub fn default_extensions(&self) -> &'static [&'static str] {
        match self {
            MediaKind::Image => &["png", "jpg", "jpeg"],
            MediaKind::Audio => &["mid", "midi"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Audio => "audio",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One corpus file, immutable once enumerated for a retrieval call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Stable identifier (file name)
    pub id: String,
    /// Full path to the file
    pub path: PathBuf,
    /// Media kind
    pub kind: MediaKind,
}

impl MediaItem {
    /// Build an item whose id is the path's file name
    pub fn from_path(path: impl Into<PathBuf>, kind: MediaKind) -> Self {
        let path = path.into();
        let id = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self { id, path, kind }
    }
}

/// Ranked result: item identifier plus score
///
/// Image pipeline scores are distances (lower is better) or the
/// `1 - d/max_d` similarity; audio scores are cosine similarities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub id: String,
    pub path: PathBuf,
    pub score: f64,
}

impl ScoredResult {
    pub fn new(item: &MediaItem, score: f64) -> Self {
        Self {
            id: item.id.clone(),
            path: item.path.clone(),
            score,
        }
    }
}

/// Per-call context threaded through every stage of a retrieval call
#[derive(Debug, Clone)]
pub struct RetrievalContext {
    /// Identifier used in every log line and event of this call
    pub request_id: Uuid,
    /// Checked once per corpus item and before each numerical stage
    pub cancel_token: CancellationToken,
    /// Optional progress channel
    pub events: Option<UnboundedSender<RetrievalEvent>>,
}

impl RetrievalContext {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            cancel_token: CancellationToken::new(),
            events: None,
        }
    }

    pub fn with_cancel_token(mut self, cancel_token: CancellationToken) -> Self {
        self.cancel_token = cancel_token;
        self
    }

    pub fn with_events(mut self, events: UnboundedSender<RetrievalEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Send a progress event; a closed receiver is not an error
    pub fn emit(&self, event: RetrievalEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}

impl Default for RetrievalContext {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Feature Extractor Trait
// ============================================================================

/// Per-file extraction step
///
/// Implementations are pure: no hidden state carries over between files, so
/// the batch executor may run them on any worker thread.
///
/// # Example
/// ```rust,ignore
/// use mirage_engine::extractors::image_features::ImageFeatureExtractor;
/// use mirage_engine::types::FeatureExtractor;
///
/// let extractor = ImageFeatureExtractor::new(300, 300);
/// let pixels = extractor.extract(Path::new("cover.png"))?;
/// assert_eq!(pixels.len(), 300 * 300);
/// ```
pub trait FeatureExtractor: Send + Sync {
    /// Output produced for one file
    type Output: Send;

    /// Extractor name for logging
    fn name(&self) -> &'static str;

    /// Extract from one file
    ///
    /// # Errors
    /// Returns `ExtractionError` if the file cannot be turned into an output;
    /// callers decide whether that is fatal (query) or a skip (corpus item).
    fn extract(&self, path: &Path) -> Result<Self::Output, ExtractionError>;
}

/// Extraction error for a single file
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// I/O error (file read)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image could not be decoded
    #[error("Image decode error: {0}")]
    ImageDecode(String),

    /// MIDI container could not be parsed
    #[error("MIDI parse error: {0}")]
    MidiParse(String),

    /// No note-on events on the melody channel
    #[error("No usable notes on channel {channel}")]
    NoNotes { channel: u8 },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExtractionError {
    /// Short machine-readable code recorded in skip reports
    pub fn code(&self) -> &'static str {
        match self {
            ExtractionError::Io(_) => "IO_ERROR",
            ExtractionError::ImageDecode(_) => "IMAGE_DECODE_ERROR",
            ExtractionError::MidiParse(_) => "MIDI_PARSE_ERROR",
            ExtractionError::NoNotes { .. } => "NO_NOTES",
            ExtractionError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
