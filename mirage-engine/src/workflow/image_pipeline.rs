//! Image retrieval: pixels -> subspace -> Euclidean ranking

use super::CallClock;
use crate::config::{ImageScore, RetrievalConfig};
use crate::error::{RetrievalError, RetrievalResult};
use crate::extractors::extract_corpus;
use crate::extractors::image_features::ImageFeatureExtractor;
use crate::models::{RetrievalEvent, RetrievalReport, ScoreKind};
use crate::projection::{assemble_matrix, ProjectedCorpus, Subspace};
use crate::ranking::{distances_to_similarity, rank, Metric};
use crate::services::{corpus_fingerprint, CorpusLoader, SubspaceCache};
use crate::types::{FeatureExtractor, MediaItem, MediaKind, RetrievalContext};
use ndarray::ArrayView1;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One image retrieval call
pub struct ImageRetrieval<'a> {
    config: &'a RetrievalConfig,
    cache: Option<&'a SubspaceCache>,
    extractor: ImageFeatureExtractor,
}

impl<'a> ImageRetrieval<'a> {
    pub fn new(config: &'a RetrievalConfig, cache: Option<&'a SubspaceCache>) -> Self {
        Self {
            config,
            cache,
            extractor: ImageFeatureExtractor::new(config.image_width, config.image_height),
        }
    }

    /// Rank the images of `corpus_dir` against `query`, best first
    ///
    /// The query is decoded before the corpus so an unreadable query fails
    /// fast; the corpus listing comes first so an empty corpus fails before
    /// anything is decoded.
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
            MediaKind::Image,
            &self.config.extensions(MediaKind::Image),
        )?;
        let corpus_size = items.len();

        ctx.emit(RetrievalEvent::Started {
            request_id: ctx.request_id,
            kind: MediaKind::Image,
            corpus_size,
        });

        let query_vector = self
            .extractor
            .extract(query)
            .map_err(|e| RetrievalError::QueryDecode(format!("{}: {}", query.display(), e)))?;

        let (corpus, cache_hit) = self.projected_corpus(items, ctx)?;

        if ctx.is_cancelled() {
            return Err(RetrievalError::Cancelled);
        }

        let query_projected = corpus.subspace.project(ArrayView1::from(query_vector.as_slice()))?;
        let query_projected = query_projected.to_vec();

        let rows: Vec<Vec<f64>> = corpus
            .projected
            .rows()
            .into_iter()
            .map(|row| row.to_vec())
            .collect();
        let candidates = corpus.items.iter().zip(rows.iter().map(Vec::as_slice));

        // Similarity is normalized by the largest distance in the whole corpus,
        // so everything is ranked before truncating to n
        let mut results = rank(
            &query_projected,
            candidates,
            Metric::Euclidean,
            corpus.items.len(),
        );

        let score_kind = match self.config.image_score {
            ImageScore::Distance => ScoreKind::Distance,
            ImageScore::Similarity => {
                let distances: Vec<f64> = results.iter().map(|r| r.score).collect();
                for (result, similarity) in
                    results.iter_mut().zip(distances_to_similarity(&distances))
                {
                    result.score = similarity;
                }
                ScoreKind::Similarity
            }
        };
        results.truncate(n);

        let report = RetrievalReport {
            request_id: ctx.request_id,
            kind: MediaKind::Image,
            query: query.to_path_buf(),
            results,
            score_kind,
            corpus_size: corpus.corpus_size,
            usable_items: corpus.items.len(),
            skipped: corpus.skipped.clone(),
            cache_hit,
            started_at: clock.started_at,
            elapsed_ms: clock.elapsed_ms(),
        };

        info!(
            request_id = %ctx.request_id,
            corpus = corpus.corpus_size,
            usable = report.usable_items,
            components = corpus.subspace.components(),
            leading_sigma = corpus.subspace.singular_values().first().copied().unwrap_or(0.0),
            results = report.results.len(),
            cache_hit,
            elapsed_ms = report.elapsed_ms,
            "Image retrieval complete"
        );

        Ok(report)
    }

    /// Fitted corpus, from the cache when enabled and the corpus is unchanged
    fn projected_corpus(
        &self,
        items: Vec<MediaItem>,
        ctx: &RetrievalContext,
    ) -> RetrievalResult<(Arc<ProjectedCorpus>, bool)> {
        let Some(cache) = self.cache else {
            return Ok((Arc::new(self.fit_corpus(items, ctx)?), false));
        };

        let paths: Vec<PathBuf> = items.iter().map(|i| i.path.clone()).collect();
        let fingerprint = match corpus_fingerprint(
            &paths,
            self.config.image_width,
            self.config.image_height,
            self.config.components,
        ) {
            Ok(fingerprint) => fingerprint,
            Err(e) => {
                warn!(
                    request_id = %ctx.request_id,
                    error = %e,
                    "Corpus fingerprint failed, fitting without cache"
                );
                return Ok((Arc::new(self.fit_corpus(items, ctx)?), false));
            }
        };

        if let Some(hit) = cache.get(&fingerprint) {
            debug!(request_id = %ctx.request_id, fingerprint = %fingerprint, "Subspace cache hit");
            ctx.emit(RetrievalEvent::CacheHit {
                request_id: ctx.request_id,
                fingerprint,
            });
            return Ok((hit, true));
        }

        let corpus = Arc::new(self.fit_corpus(items, ctx)?);
        cache.insert(fingerprint, Arc::clone(&corpus));
        Ok((corpus, false))
    }

    fn fit_corpus(
        &self,
        items: Vec<MediaItem>,
        ctx: &RetrievalContext,
    ) -> RetrievalResult<ProjectedCorpus> {
        let corpus_size = items.len();
        let batch = extract_corpus(&self.extractor, items, ctx, self.config.parallel)?;

        if batch.usable() == 0 {
            return Err(RetrievalError::EmptyCorpus(format!(
                "none of {} images could be decoded",
                corpus_size
            )));
        }

        if ctx.is_cancelled() {
            return Err(RetrievalError::Cancelled);
        }

        let matrix = assemble_matrix(batch.outputs)?;
        let (subspace, projected) = Subspace::fit(&matrix, self.config.components)?;

        Ok(ProjectedCorpus {
            items: batch.items,
            corpus_size,
            subspace,
            projected,
            skipped: batch.skipped,
        })
    }
}
