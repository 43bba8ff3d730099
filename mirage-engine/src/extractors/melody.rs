//! Melody extraction from Standard MIDI Files
//!
//! Approximates a monophonic lead line: every note-on with non-zero velocity
//! on one channel, track by track, in event order.

use crate::types::{ExtractionError, FeatureExtractor};
use midly::{MidiMessage, Smf, TrackEventKind};
use std::path::Path;

/// Channel holding the melody (0-based)
pub const DEFAULT_MELODY_CHANNEL: u8 = 0;

/// Note count ceiling per file
pub const DEFAULT_MAX_NOTES: usize = 1000;

/// One note-on event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Note {
    /// MIDI key, 0-127
    pub pitch: u8,
    /// Cumulative ticks since the start of the note's track
    pub onset: u64,
}

/// Time-ordered notes of one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Melody {
    pub notes: Vec<Note>,
}

impl Melody {
    pub fn pitches(&self) -> Vec<u8> {
        self.notes.iter().map(|n| n.pitch).collect()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

/// Reads the melody channel of a MIDI file
#[derive(Debug, Clone, Copy)]
pub struct MelodyExtractor {
    channel: u8,
    max_notes: usize,
}

impl MelodyExtractor {
    pub fn new(channel: u8, max_notes: usize) -> Self {
        Self { channel, max_notes }
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Parse MIDI bytes and collect the melody
    ///
    /// # Errors
    /// `MidiParse` for malformed containers, `NoNotes` when the channel has no
    /// note-on events.
    pub fn extract_from_bytes(&self, bytes: &[u8]) -> Result<Melody, ExtractionError> {
        let smf = Smf::parse(bytes).map_err(|e| ExtractionError::MidiParse(e.to_string()))?;

        let mut notes = Vec::new();

        'tracks: for track in &smf.tracks {
            let mut ticks: u64 = 0;
            for event in track {
                ticks += u64::from(event.delta.as_int());

                if let TrackEventKind::Midi { channel, message } = event.kind {
                    if channel.as_int() != self.channel {
                        continue;
                    }
                    if let MidiMessage::NoteOn { key, vel } = message {
                        if vel.as_int() == 0 {
                            continue;
                        }
                        notes.push(Note {
                            pitch: key.as_int(),
                            onset: ticks,
                        });
                        if notes.len() >= self.max_notes {
                            break 'tracks;
                        }
                    }
                }
            }
        }

        if notes.is_empty() {
            return Err(ExtractionError::NoNotes {
                channel: self.channel,
            });
        }

        tracing::trace!(
            tracks = smf.tracks.len(),
            notes = notes.len(),
            "Extracted melody"
        );

        Ok(Melody { notes })
    }
}

impl Default for MelodyExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_MELODY_CHANNEL, DEFAULT_MAX_NOTES)
    }
}

impl FeatureExtractor for MelodyExtractor {
    type Output = Melody;

    fn name(&self) -> &'static str {
        "midi_melody"
    }

    fn extract(&self, path: &Path) -> Result<Melody, ExtractionError> {
        let bytes = std::fs::read(path)?;
        self.extract_from_bytes(&bytes)
    }
}
