//! Melody histograms
//!
//! A melody becomes one 638-value vector made of three L1-normalized
//! histograms:
//!
//! | Part | Bins | Input                                  | Bin of value `x` |
//! |------|------|----------------------------------------|------------------|
//! | ATB  | 128  | pitch                                  | `x`              |
//! | RTB  | 255  | consecutive pitch difference           | `x + 127`        |
//! | FTB  | 255  | pitch minus the first pitch            | `x + 127`        |
//!
//! RTB does not change when a melody is transposed, ATB does.

use super::melody::{Melody, MelodyExtractor};
use crate::config::AudioMode;
use crate::ranking::Metric;
use crate::types::{ExtractionError, FeatureExtractor, FeatureVector};
use std::path::Path;

pub const ATB_BINS: usize = 128;
pub const RTB_BINS: usize = 255;
pub const FTB_BINS: usize = 255;

/// Length of a full melody feature vector
pub const FEATURE_LENGTH: usize = ATB_BINS + RTB_BINS + FTB_BINS;

/// Guard added to histogram mass before dividing
pub const NORMALIZATION_EPSILON: f64 = 1e-8;

const INTERVAL_OFFSET: i16 = 127;

fn normalize(counts: Vec<f64>) -> Vec<f64> {
    let total: f64 = counts.iter().sum();
    counts
        .into_iter()
        .map(|c| c / (total + NORMALIZATION_EPSILON))
        .collect()
}

fn interval_bin(delta: i16) -> Option<usize> {
    let bin = delta + INTERVAL_OFFSET;
    (0..RTB_BINS as i16).contains(&bin).then_some(bin as usize)
}

/// Absolute pitch histogram (ATB)
pub fn pitch_histogram(pitches: &[u8]) -> Vec<f64> {
    let mut counts = vec![0.0; ATB_BINS];
    for &p in pitches {
        if let Some(c) = counts.get_mut(p as usize) {
            *c += 1.0;
        }
    }
    normalize(counts)
}

/// Consecutive interval histogram (RTB)
pub fn interval_histogram(pitches: &[u8]) -> Vec<f64> {
    let mut counts = vec![0.0; RTB_BINS];
    for pair in pitches.windows(2) {
        let delta = i16::from(pair[1]) - i16::from(pair[0]);
        if let Some(bin) = interval_bin(delta) {
            counts[bin] += 1.0;
        }
    }
    normalize(counts)
}

/// Histogram of pitches relative to the first pitch (FTB)
pub fn first_note_histogram(pitches: &[u8]) -> Vec<f64> {
    let mut counts = vec![0.0; FTB_BINS];
    if let Some(&first) = pitches.first() {
        for &p in pitches {
            if let Some(bin) = interval_bin(i16::from(p) - i16::from(first)) {
                counts[bin] += 1.0;
            }
        }
    }
    normalize(counts)
}

/// ATB ++ RTB ++ FTB
pub fn feature_vector(pitches: &[u8]) -> FeatureVector {
    let mut v = Vec::with_capacity(FEATURE_LENGTH);
    v.extend(pitch_histogram(pitches));
    v.extend(interval_histogram(pitches));
    v.extend(first_note_histogram(pitches));
    v
}

pub fn atb(v: &[f64]) -> &[f64] {
    &v[..ATB_BINS]
}

pub fn rtb(v: &[f64]) -> &[f64] {
    &v[ATB_BINS..ATB_BINS + RTB_BINS]
}

pub fn ftb(v: &[f64]) -> &[f64] {
    &v[ATB_BINS + RTB_BINS..]
}

/// Overlapping windows of `size` pitches every `slide` pitches
///
/// A sequence no longer than one window yields a single window holding all of
/// it; trailing pitches that do not fill a window are dropped.
pub fn windows(pitches: &[u8], size: usize, slide: usize) -> Vec<&[u8]> {
    if pitches.len() <= size || size == 0 {
        return vec![pitches];
    }

    let slide = slide.max(1);
    (0..=pitches.len() - size)
        .step_by(slide)
        .map(|start| &pitches[start..start + size])
        .collect()
}

/// Feature representation of one track
#[derive(Debug, Clone, PartialEq)]
pub enum TrackFeatures {
    Whole(FeatureVector),
    Windowed(Vec<FeatureVector>),
}

impl TrackFeatures {
    pub fn from_melody(melody: &Melody, mode: AudioMode) -> Self {
        let pitches = melody.pitches();
        match mode {
            AudioMode::WholeTrack => TrackFeatures::Whole(feature_vector(&pitches)),
            AudioMode::Windowed { size, slide } => TrackFeatures::Windowed(
                windows(&pitches, size, slide)
                    .into_iter()
                    .map(feature_vector)
                    .collect(),
            ),
        }
    }

    pub fn vectors(&self) -> &[FeatureVector] {
        match self {
            TrackFeatures::Whole(v) => std::slice::from_ref(v),
            TrackFeatures::Windowed(vs) => vs,
        }
    }

    /// Mean cosine similarity over every pair of vectors
    ///
    /// For two whole-track features this is their plain cosine similarity.
    pub fn similarity(&self, other: &TrackFeatures) -> f64 {
        let (ours, theirs) = (self.vectors(), other.vectors());
        let pairs = ours.len() * theirs.len();
        if pairs == 0 {
            return 0.0;
        }

        let total: f64 = ours
            .iter()
            .flat_map(|a| theirs.iter().map(move |b| Metric::Cosine.score(a, b)))
            .sum();
        total / pairs as f64
    }
}

/// MIDI file to [`TrackFeatures`]
#[derive(Debug, Clone, Copy)]
pub struct AudioFeatureExtractor {
    melody: MelodyExtractor,
    mode: AudioMode,
}

impl AudioFeatureExtractor {
    pub fn new(melody: MelodyExtractor, mode: AudioMode) -> Self {
        Self { melody, mode }
    }

    pub fn mode(&self) -> AudioMode {
        self.mode
    }

    pub fn extract_from_bytes(&self, bytes: &[u8]) -> Result<TrackFeatures, ExtractionError> {
        let melody = self.melody.extract_from_bytes(bytes)?;
        Ok(TrackFeatures::from_melody(&melody, self.mode))
    }
}

impl FeatureExtractor for AudioFeatureExtractor {
    type Output = TrackFeatures;

    fn name(&self) -> &'static str {
        "melody_histograms"
    }

    fn extract(&self, path: &Path) -> Result<TrackFeatures, ExtractionError> {
        let melody = self.melody.extract(path)?;
        Ok(TrackFeatures::from_melody(&melody, self.mode))
    }
}
