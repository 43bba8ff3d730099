//! Audio retrieval: melody histograms -> cosine ranking

use super::CallClock;
use crate::config::RetrievalConfig;
use crate::error::{RetrievalError, RetrievalResult};
use crate::extractors::extract_corpus;
use crate::extractors::melody::MelodyExtractor;
use crate::extractors::melody_features::AudioFeatureExtractor;
use crate::models::{RetrievalEvent, RetrievalReport, ScoreKind};
use crate::ranking::{rank_scores, Metric};
use crate::services::CorpusLoader;
use crate::types::{FeatureExtractor, MediaKind, RetrievalContext, ScoredResult};
use std::path::Path;
use tracing::info;

/// One audio retrieval call
pub struct AudioRetrieval<'a> {
    config: &'a RetrievalConfig,
    extractor: AudioFeatureExtractor,
}

impl<'a> AudioRetrieval<'a> {
    pub fn new(config: &'a RetrievalConfig) -> Self {
        let melody = MelodyExtractor::new(config.melody_channel, config.max_notes);
        Self {
            config,
            extractor: AudioFeatureExtractor::new(melody, config.audio_mode),
        }
    }

    /// Rank the MIDI files of `corpus_dir` against `query`, best first
    pub fn run(
        &self,
        query: &Path,
        corpus_dir: &Path,
        n: usize,
        ctx: &RetrievalContext,
    ) -> RetrievalResult<RetrievalReport> {
        let clock = CallClock::start();

        let items = CorpusLoader::new().list_media(
            corpus_dir,
            MediaKind::Audio,
            &self.config.extensions(MediaKind::Audio),
        )?;
        let corpus_size = items.len();

        ctx.emit(RetrievalEvent::Started {
            request_id: ctx.request_id,
            kind: MediaKind::Audio,
            corpus_size,
        });

        let query_features = self.extractor.extract(query).map_err(|e| {
            RetrievalError::QueryExtraction(format!("{}: {}", query.display(), e))
        })?;

        let batch = extract_corpus(&self.extractor, items, ctx, self.config.parallel)?;

        if batch.usable() == 0 {
            return Err(RetrievalError::EmptyCorpus(format!(
                "none of {} MIDI files yielded notes on channel {}",
                corpus_size, self.config.melody_channel
            )));
        }

        if ctx.is_cancelled() {
            return Err(RetrievalError::Cancelled);
        }

        let scores: Vec<f64> = batch
            .outputs
            .iter()
            .map(|features| query_features.similarity(features))
            .collect();

        let results: Vec<ScoredResult> = rank_scores(&scores, Metric::Cosine.order(), n)
            .into_iter()
            .map(|(idx, score)| ScoredResult::new(&batch.items[idx], score))
            .collect();

        let report = RetrievalReport {
            request_id: ctx.request_id,
            kind: MediaKind::Audio,
            query: query.to_path_buf(),
            results,
            score_kind: ScoreKind::Cosine,
            corpus_size,
            usable_items: batch.usable(),
            skipped: batch.skipped,
            cache_hit: false,
            started_at: clock.started_at,
            elapsed_ms: clock.elapsed_ms(),
        };

        info!(
            request_id = %ctx.request_id,
            corpus = corpus_size,
            usable = report.usable_items,
            mode = ?self.extractor.mode(),
            results = report.results.len(),
            elapsed_ms = report.elapsed_ms,
            "Audio retrieval complete"
        );

        Ok(report)
    }
}
