//! Test Helper Utilities
//!
//! Shared fixtures for mirage-engine integration tests

#![allow(dead_code)]

pub mod log_capture;
pub mod media_generator;

pub use log_capture::{init_test_logging, LogCapture};
pub use media_generator::{
    noise_image, pattern_image, recolor, write_image, write_melody, write_midi, MidiNote,
};

use mirage_engine::RetrievalConfig;

/// Small target size so fixtures decode and fit quickly
pub fn test_config() -> RetrievalConfig {
    RetrievalConfig {
        image_width: 32,
        image_height: 32,
        parallel: false,
        ..Default::default()
    }
}
