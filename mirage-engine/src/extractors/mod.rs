//! Feature extractors and the corpus batch executor
//!
//! Extractors turn one file into one output; [`extract_corpus`] runs an
//! extractor over a whole listing with per-item error isolation. A failing
//! item is logged and recorded as a [`SkippedItem`], never fatal. The
//! cancellation token is checked once per item.

pub mod image_features;
pub mod melody;
pub mod melody_features;

use crate::error::{RetrievalError, RetrievalResult};
use crate::models::{RetrievalEvent, SkippedItem};
use crate::types::{ExtractionError, FeatureExtractor, MediaItem, RetrievalContext};
use rayon::prelude::*;
use tracing::{debug, warn};

/// Result of running an extractor over a corpus listing
#[derive(Debug)]
pub struct BatchOutcome<T> {
    /// Items that produced an output, in listing order
    pub items: Vec<MediaItem>,
    /// `outputs[i]` belongs to `items[i]`
    pub outputs: Vec<T>,
    /// Items dropped, in listing order
    pub skipped: Vec<SkippedItem>,
}

impl<T> BatchOutcome<T> {
    pub fn usable(&self) -> usize {
        self.outputs.len()
    }
}

enum ItemOutcome<T> {
    Extracted(T),
    Skipped(ExtractionError),
    Cancelled,
}

/// Run `extractor` over every item, preserving listing order
///
/// # Errors
/// `Cancelled` if the context's token fires before every item is done.
pub fn extract_corpus<E: FeatureExtractor>(
    extractor: &E,
    items: Vec<MediaItem>,
    ctx: &RetrievalContext,
    parallel: bool,
) -> RetrievalResult<BatchOutcome<E::Output>> {
    let total = items.len();

    let process = |index: usize, item: &MediaItem| -> ItemOutcome<E::Output> {
        if ctx.is_cancelled() {
            return ItemOutcome::Cancelled;
        }

        match extractor.extract(&item.path) {
            Ok(output) => {
                ctx.emit(RetrievalEvent::ItemProcessed {
                    request_id: ctx.request_id,
                    index,
                    total,
                    path: item.path.clone(),
                });
                ItemOutcome::Extracted(output)
            }
            Err(e) => ItemOutcome::Skipped(e),
        }
    };

    let outcomes: Vec<ItemOutcome<E::Output>> = if parallel {
        items
            .par_iter()
            .enumerate()
            .map(|(index, item)| process(index, item))
            .collect()
    } else {
        let mut outcomes = Vec::with_capacity(total);
        for (index, item) in items.iter().enumerate() {
            let outcome = process(index, item);
            let stop = matches!(outcome, ItemOutcome::Cancelled);
            outcomes.push(outcome);
            if stop {
                break;
            }
        }
        outcomes
    };

    if outcomes.iter().any(|o| matches!(o, ItemOutcome::Cancelled)) {
        warn!(
            request_id = %ctx.request_id,
            extractor = extractor.name(),
            "Corpus extraction cancelled"
        );
        ctx.emit(RetrievalEvent::Cancelled {
            request_id: ctx.request_id,
        });
        return Err(RetrievalError::Cancelled);
    }

    let mut batch = BatchOutcome {
        items: Vec::with_capacity(total),
        outputs: Vec::with_capacity(total),
        skipped: Vec::new(),
    };

    for (item, outcome) in items.into_iter().zip(outcomes) {
        match outcome {
            ItemOutcome::Extracted(output) => {
                batch.items.push(item);
                batch.outputs.push(output);
            }
            ItemOutcome::Skipped(e) => {
                warn!(
                    request_id = %ctx.request_id,
                    path = %item.path.display(),
                    error = %e,
                    "Skipping corpus item"
                );
                ctx.emit(RetrievalEvent::ItemSkipped {
                    request_id: ctx.request_id,
                    path: item.path.clone(),
                    reason: e.to_string(),
                });
                batch.skipped.push(SkippedItem::from_error(&item, &e));
            }
            ItemOutcome::Cancelled => return Err(RetrievalError::Cancelled),
        }
    }

    debug!(
        request_id = %ctx.request_id,
        extractor = extractor.name(),
        total,
        usable = batch.usable(),
        skipped = batch.skipped.len(),
        "Corpus extraction complete"
    );

    Ok(batch)
}
