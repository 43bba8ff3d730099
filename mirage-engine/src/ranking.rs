//! Similarity ranking
//!
//! Scores are compared with [`f64::total_cmp`] after mapping NaN to the worst
//! possible score, and sorted with a stable sort, so equal scores keep corpus
//! enumeration order.

use crate::types::{MediaItem, ScoredResult};

/// Sort direction: which end of the score range is "best"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankOrder {
    /// Lower is better (distances)
    Ascending,
    /// Higher is better (similarities)
    Descending,
}

impl RankOrder {
    fn sort_key(&self, score: f64) -> f64 {
        match (self, score.is_nan()) {
            (_, false) => score,
            (RankOrder::Ascending, true) => f64::INFINITY,
            (RankOrder::Descending, true) => f64::NEG_INFINITY,
        }
    }
}

/// Comparison between a query vector and one corpus vector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Euclidean,
    Cosine,
}

impl Metric {
    pub fn order(&self) -> RankOrder {
        match self {
            Metric::Euclidean => RankOrder::Ascending,
            Metric::Cosine => RankOrder::Descending,
        }
    }

    pub fn score(&self, query: &[f64], candidate: &[f64]) -> f64 {
        match self {
            Metric::Euclidean => euclidean_distance(query, candidate),
            Metric::Cosine => cosine_similarity(query, candidate),
        }
    }
}

pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Cosine similarity, 0 when either vector has zero magnitude
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Order score indices best-first and keep at most `n`
///
/// Returns `(index, score)` pairs; index refers to the input slice.
pub fn rank_scores(scores: &[f64], order: RankOrder, n: usize) -> Vec<(usize, f64)> {
    let mut ranked: Vec<(usize, f64)> = scores.iter().copied().enumerate().collect();

    ranked.sort_by(|(_, a), (_, b)| {
        let (a, b) = (order.sort_key(*a), order.sort_key(*b));
        match order {
            RankOrder::Ascending => a.total_cmp(&b),
            RankOrder::Descending => b.total_cmp(&a),
        }
    });

    ranked.truncate(n);
    ranked
}

/// Score every candidate against the query and return the best `n`
///
/// Result length is `min(n, candidates)`; `n` larger than the corpus is not an
/// error.
pub fn rank<'a, I>(query: &[f64], candidates: I, metric: Metric, n: usize) -> Vec<ScoredResult>
where
    I: IntoIterator<Item = (&'a MediaItem, &'a [f64])>,
{
    let (items, scores): (Vec<&MediaItem>, Vec<f64>) = candidates
        .into_iter()
        .map(|(item, vector)| (item, metric.score(query, vector)))
        .unzip();

    rank_scores(&scores, metric.order(), n)
        .into_iter()
        .map(|(idx, score)| ScoredResult::new(items[idx], score))
        .collect()
}

/// Convert distances to `1 - d / max_d` over the whole set
///
/// When every distance is zero, all similarities are 1.
pub fn distances_to_similarity(distances: &[f64]) -> Vec<f64> {
    let max_distance = distances
        .iter()
        .copied()
        .filter(|d| d.is_finite())
        .fold(0.0_f64, f64::max);

    if max_distance <= 0.0 {
        return vec![1.0; distances.len()];
    }

    distances.iter().map(|d| 1.0 - d / max_distance).collect()
}
