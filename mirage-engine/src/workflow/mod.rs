//! Retrieval orchestration
//!
//! Each call runs: list corpus -> extract query -> extract corpus (batch) ->
//! compare -> rank. [`RetrievalEngine`] is the single entry point; it owns the
//! configuration and the optional subspace cache and dispatches to
//! [`ImageRetrieval`] or [`AudioRetrieval`].
//!
//! # Error handling
//!
//! Per-item failures never abort a call; they are logged and reported in
//! [`RetrievalReport::skipped`]. An empty corpus, an unusable query or a
//! cancellation ends the call with a [`RetrievalError`].

pub mod audio_pipeline;
pub mod image_pipeline;

pub use audio_pipeline::AudioRetrieval;
pub use image_pipeline::ImageRetrieval;

use crate::config::RetrievalConfig;
use crate::error::{RetrievalError, RetrievalResult};
use crate::models::{RetrievalEvent, RetrievalReport};
use crate::services::{QueryUpload, SubspaceCache};
use crate::types::{MediaKind, RetrievalContext};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, info_span, warn};

/// Wall-clock bookkeeping for one call
pub(crate) struct CallClock {
    pub started_at: DateTime<Utc>,
    start: Instant,
}

impl CallClock {
    pub fn start() -> Self {
        Self {
            started_at: mirage_common::time::now(),
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        mirage_common::time::elapsed_millis(self.start)
    }
}

/// Retrieval entry point
///
/// Cheap to clone; clones share the subspace cache.
#[derive(Debug, Clone)]
pub struct RetrievalEngine {
    config: RetrievalConfig,
    cache: Option<Arc<SubspaceCache>>,
}

impl RetrievalEngine {
    /// Create an engine; fails if the configuration does not validate
    pub fn new(config: RetrievalConfig) -> RetrievalResult<Self> {
        config.validate()?;
        let cache = config
            .cache_subspace
            .then(|| Arc::new(SubspaceCache::default()));
        Ok(Self { config, cache })
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Subspace cache, present when `cache_subspace` is enabled
    pub fn cache(&self) -> Option<&SubspaceCache> {
        self.cache.as_deref()
    }

    /// Rank `corpus_dir` against `query` and return `min(n, usable items)`
    /// results
    pub fn retrieve(
        &self,
        kind: MediaKind,
        query: &Path,
        corpus_dir: &Path,
        n: usize,
    ) -> RetrievalResult<RetrievalReport> {
        self.retrieve_with_context(kind, query, corpus_dir, n, &RetrievalContext::new())
    }

    /// [`retrieve`](Self::retrieve) with a caller-supplied cancellation token
    /// and event channel
    pub fn retrieve_with_context(
        &self,
        kind: MediaKind,
        query: &Path,
        corpus_dir: &Path,
        n: usize,
        ctx: &RetrievalContext,
    ) -> RetrievalResult<RetrievalReport> {
        let span = info_span!("retrieval", request_id = %ctx.request_id, kind = %kind);
        let _guard = span.enter();

        info!(
            query = %query.display(),
            corpus = %corpus_dir.display(),
            n,
            "Retrieval started"
        );

        let result = match kind {
            MediaKind::Image => {
                ImageRetrieval::new(&self.config, self.cache()).run(query, corpus_dir, n, ctx)
            }
            MediaKind::Audio => AudioRetrieval::new(&self.config).run(query, corpus_dir, n, ctx),
        };

        match &result {
            Ok(report) => ctx.emit(RetrievalEvent::Completed {
                request_id: ctx.request_id,
                result_count: report.results.len(),
                elapsed_ms: report.elapsed_ms,
            }),
            Err(e) => warn!(code = e.code(), error = %e, "Retrieval failed"),
        }

        result
    }

    /// Retrieve with an in-memory query (e.g. an upload)
    ///
    /// The bytes go to a temporary file named with `extension`; the file is
    /// removed before this returns, whatever the outcome.
    pub fn retrieve_bytes(
        &self,
        kind: MediaKind,
        query_bytes: &[u8],
        extension: &str,
        corpus_dir: &Path,
        n: usize,
    ) -> RetrievalResult<RetrievalReport> {
        let upload = QueryUpload::from_bytes(query_bytes, extension)?;
        self.retrieve(kind, upload.path(), corpus_dir, n)
    }

    /// Run a call on the blocking pool so async callers are not stalled
    pub async fn retrieve_async(
        &self,
        kind: MediaKind,
        query: PathBuf,
        corpus_dir: PathBuf,
        n: usize,
        ctx: RetrievalContext,
    ) -> RetrievalResult<RetrievalReport> {
        let engine = self.clone();
        tokio::task::spawn_blocking(move || {
            engine.retrieve_with_context(kind, &query, &corpus_dir, n, &ctx)
        })
        .await
        .map_err(|e| RetrievalError::Internal(format!("Retrieval task failed: {}", e)))?
    }
}
