//! Progress events emitted during a retrieval call

use crate::types::MediaKind;
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

/// Retrieval progress event
///
/// Sent over the optional channel in `RetrievalContext`; every variant carries
/// the request id of the call that produced it.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RetrievalEvent {
    /// Corpus enumerated, extraction about to start
    Started {
        request_id: Uuid,
        kind: MediaKind,
        corpus_size: usize,
    },
    /// One corpus item extracted successfully
    ItemProcessed {
        request_id: Uuid,
        index: usize,
        total: usize,
        path: PathBuf,
    },
    /// One corpus item dropped
    ItemSkipped {
        request_id: Uuid,
        path: PathBuf,
        reason: String,
    },
    /// Subspace served from cache instead of being recomputed
    CacheHit { request_id: Uuid, fingerprint: String },
    /// Ranking finished
    Completed {
        request_id: Uuid,
        result_count: usize,
        elapsed_ms: u64,
    },
    /// Call stopped by its cancellation token
    Cancelled { request_id: Uuid },
}
