//! Retrieval configuration
//!
//! [`RetrievalConfig`] is an explicit value handed to the engine; nothing in
//! the pipelines reads process-wide state. TOML overrides come from the
//! `[retrieval]` table of `mirage.toml`.

use crate::extractors::image_features::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::extractors::melody::{DEFAULT_MAX_NOTES, DEFAULT_MELODY_CHANNEL};
use crate::types::MediaKind;
use mirage_common::config::{RetrievalSection, TomlConfig};
use mirage_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Default retained component count
pub const DEFAULT_COMPONENTS: usize = 50;

/// Default result count
pub const DEFAULT_RESULT_COUNT: usize = 10;

/// Default window length (notes) for the windowed audio variant
pub const DEFAULT_WINDOW_SIZE: usize = 40;

/// Default window stride (notes) for the windowed audio variant
pub const DEFAULT_WINDOW_SLIDE: usize = 8;

/// How image results report their score
///
/// Ordering is always by ascending distance; only the reported number changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageScore {
    /// Raw Euclidean distance in the subspace
    Distance,
    /// `1 - distance / max_distance` over the full corpus
    #[default]
    Similarity,
}

impl FromStr for ImageScore {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "distance" => Ok(ImageScore::Distance),
            "similarity" => Ok(ImageScore::Similarity),
            other => Err(Error::Config(format!(
                "Invalid image_score '{}', expected 'distance' or 'similarity'",
                other
            ))),
        }
    }
}

/// Which audio feature variant to compute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum AudioMode {
    /// One 638-bin vector over the whole melody
    #[default]
    WholeTrack,
    /// One vector per window of `size` notes every `slide` notes; track
    /// similarity is the mean over all window pairs
    Windowed { size: usize, slide: usize },
}

impl AudioMode {
    /// Parse `whole_track` / `windowed`, taking window geometry from the
    /// given values
    pub fn parse(s: &str, size: usize, slide: usize) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "whole_track" | "whole" => Ok(AudioMode::WholeTrack),
            "windowed" => Ok(AudioMode::Windowed { size, slide }),
            other => Err(Error::Config(format!(
                "Invalid audio_mode '{}', expected 'whole_track' or 'windowed'",
                other
            ))),
        }
    }
}

/// Retrieval tuning passed into every call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Target width after resize
    pub image_width: u32,
    /// Target height after resize
    pub image_height: u32,
    /// Requested principal components (clamped to the corpus rank)
    pub components: usize,
    /// Default N when the caller does not pass one
    pub result_count: usize,
    pub image_score: ImageScore,
    pub audio_mode: AudioMode,
    /// MIDI channel holding the melody (0-15)
    pub melody_channel: u8,
    /// Note ceiling per file
    pub max_notes: usize,
    /// Eligible image extensions, lowercase without dot
    pub image_extensions: Vec<String>,
    /// Eligible MIDI extensions, lowercase without dot
    pub audio_extensions: Vec<String>,
    /// Reuse fitted subspaces across calls while the corpus is unchanged
    pub cache_subspace: bool,
    /// Extract corpus items on the rayon pool
    pub parallel: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            image_width: DEFAULT_WIDTH,
            image_height: DEFAULT_HEIGHT,
            components: DEFAULT_COMPONENTS,
            result_count: DEFAULT_RESULT_COUNT,
            image_score: ImageScore::default(),
            audio_mode: AudioMode::default(),
            melody_channel: DEFAULT_MELODY_CHANNEL,
            max_notes: DEFAULT_MAX_NOTES,
            image_extensions: extensions_of(MediaKind::Image),
            audio_extensions: extensions_of(MediaKind::Audio),
            cache_subspace: false,
            parallel: true,
        }
    }
}

fn extensions_of(kind: MediaKind) -> Vec<String> {
    kind.default_extensions()
        .iter()
        .map(|e| e.to_string())
        .collect()
}

impl RetrievalConfig {
    /// Compiled defaults overridden by the `[retrieval]` table, then validated
    pub fn from_toml(toml_config: &TomlConfig) -> Result<Self> {
        let config = Self::default().with_section(&toml_config.retrieval)?;
        config.validate()?;
        Ok(config)
    }

    fn with_section(mut self, section: &RetrievalSection) -> Result<Self> {
        if let Some(v) = section.image_width {
            self.image_width = v;
        }
        if let Some(v) = section.image_height {
            self.image_height = v;
        }
        if let Some(v) = section.components {
            self.components = v;
        }
        if let Some(v) = section.result_count {
            self.result_count = v;
        }
        if let Some(v) = &section.image_score {
            self.image_score = v.parse()?;
        }

        let size = section.window_size.unwrap_or(DEFAULT_WINDOW_SIZE);
        let slide = section.window_slide.unwrap_or(DEFAULT_WINDOW_SLIDE);
        if let Some(v) = &section.audio_mode {
            self.audio_mode = AudioMode::parse(v, size, slide)?;
        }

        if let Some(v) = section.melody_channel {
            self.melody_channel = v;
        }
        if let Some(v) = section.max_notes {
            self.max_notes = v;
        }
        if let Some(v) = section.cache_subspace {
            self.cache_subspace = v;
        }
        if let Some(v) = section.parallel {
            self.parallel = v;
        }
        Ok(self)
    }

    /// Reject values no pipeline can run with
    pub fn validate(&self) -> Result<()> {
        if self.image_width == 0 || self.image_height == 0 {
            return Err(Error::Config(format!(
                "Image size must be non-zero, got {}x{}",
                self.image_width, self.image_height
            )));
        }
        if self.components == 0 {
            return Err(Error::Config("components must be at least 1".to_string()));
        }
        if self.result_count == 0 {
            return Err(Error::Config("result_count must be at least 1".to_string()));
        }
        if let AudioMode::Windowed { size, slide } = self.audio_mode {
            if size == 0 || slide == 0 {
                return Err(Error::Config(format!(
                    "Window size and slide must be non-zero, got {}/{}",
                    size, slide
                )));
            }
        }
        if self.melody_channel > 15 {
            return Err(Error::Config(format!(
                "melody_channel must be 0-15, got {}",
                self.melody_channel
            )));
        }
        if self.max_notes == 0 {
            return Err(Error::Config("max_notes must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Eligible extensions for a media kind
    pub fn extensions(&self, kind: MediaKind) -> Vec<&str> {
        let list = match kind {
            MediaKind::Image => &self.image_extensions,
            MediaKind::Audio => &self.audio_extensions,
        };
        list.iter().map(String::as_str).collect()
    }
}
