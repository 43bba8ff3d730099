//! Data models for retrieval results and progress reporting

pub mod events;
pub mod retrieval_report;

pub use events::RetrievalEvent;
pub use retrieval_report::{RetrievalReport, ScoreKind, SkippedItem};
