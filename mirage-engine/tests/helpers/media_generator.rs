//! Media Fixture Generator
//!
//! Deterministic images and MIDI files for retrieval tests

use image::{Rgb, RgbImage};
use midly::num::{u15, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use std::path::{Path, PathBuf};

/// Ticks between consecutive generated notes
const NOTE_TICKS: u32 = 240;

/// Small linear congruential generator, enough for reproducible noise
struct Lcg(u64);

impl Lcg {
    fn next_u8(&mut self) -> u8 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (self.0 >> 56) as u8
    }
}

/// Smooth diagonal stripes; `variant` shifts the stripe frequency
pub fn pattern_image(width: u32, height: u32, variant: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let phase = ((x + y) * (variant + 2)) as f32 / width.max(1) as f32;
        let v = ((phase * std::f32::consts::PI).sin() * 0.5 + 0.5) * 255.0;
        let v = v as u8;
        Rgb([v, v / 2, 255 - v])
    })
}

/// Uniform per-pixel noise
pub fn noise_image(width: u32, height: u32, seed: u64) -> RgbImage {
    let mut rng = Lcg(seed.wrapping_add(1));
    RgbImage::from_fn(width, height, |_, _| {
        Rgb([rng.next_u8(), rng.next_u8(), rng.next_u8()])
    })
}

/// Same picture, slightly different colors
pub fn recolor(image: &RgbImage) -> RgbImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        let [r, g, b] = pixel.0;
        pixel.0 = [r.saturating_add(6), g.saturating_sub(4), b.saturating_add(3)];
    }
    out
}

/// Save an image; the format follows the extension
pub fn write_image(dir: &Path, name: &str, image: &RgbImage) -> anyhow::Result<PathBuf> {
    let path = dir.join(name);
    image.save(&path)?;
    Ok(path)
}

/// Note on a given channel
#[derive(Debug, Clone, Copy)]
pub struct MidiNote {
    pub channel: u8,
    pub pitch: u8,
}

/// Write a Standard MIDI File, one track per slice, each note held for
/// `NOTE_TICKS`
pub fn write_midi(dir: &Path, name: &str, tracks: &[Vec<MidiNote>]) -> anyhow::Result<PathBuf> {
    let format = if tracks.len() <= 1 {
        Format::SingleTrack
    } else {
        Format::Parallel
    };
    let mut smf = Smf::new(Header::new(format, Timing::Metrical(u15::new(480))));

    for notes in tracks {
        let mut track = Vec::with_capacity(notes.len() * 2 + 1);
        for note in notes {
            track.push(TrackEvent {
                delta: u28::new(0),
                kind: TrackEventKind::Midi {
                    channel: u4::new(note.channel),
                    message: MidiMessage::NoteOn {
                        key: u7::new(note.pitch),
                        vel: u7::new(96),
                    },
                },
            });
            track.push(TrackEvent {
                delta: u28::new(NOTE_TICKS),
                kind: TrackEventKind::Midi {
                    channel: u4::new(note.channel),
                    message: MidiMessage::NoteOff {
                        key: u7::new(note.pitch),
                        vel: u7::new(0),
                    },
                },
            });
        }
        track.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        });
        smf.tracks.push(track);
    }

    let path = dir.join(name);
    smf.save(&path)?;
    Ok(path)
}

/// Single-track melody on channel 0
pub fn write_melody(dir: &Path, name: &str, pitches: &[u8]) -> anyhow::Result<PathBuf> {
    let notes = pitches
        .iter()
        .map(|&pitch| MidiNote { channel: 0, pitch })
        .collect();
    write_midi(dir, name, &[notes])
}
