//! mirage-engine: content-based media retrieval
//!
//! Two pipelines share one shape, extract -> reduce/aggregate -> compare ->
//! rank:
//! - **Images**: grayscale + resize + flatten, centered truncated SVD of the
//!   corpus, Euclidean distance in the shared subspace.
//! - **MIDI melodies**: pitch/interval histograms (ATB, RTB, FTB), cosine
//!   similarity.
//!
//! [`RetrievalEngine`] is the entry point.

pub mod config;
pub mod error;
pub mod extractors;
pub mod models;
pub mod projection;
pub mod ranking;
pub mod services;
pub mod types;
pub mod workflow;

pub use crate::config::{AudioMode, ImageScore, RetrievalConfig};
pub use crate::error::{RetrievalError, RetrievalResult};
pub use crate::models::{RetrievalEvent, RetrievalReport, ScoreKind, SkippedItem};
pub use crate::types::{MediaItem, MediaKind, RetrievalContext, ScoredResult};
pub use crate::workflow::RetrievalEngine;
