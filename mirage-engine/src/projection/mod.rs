//! Shared low-rank subspace for the image pipeline
//!
//! A [`Subspace`] is fitted once per corpus snapshot: the column mean of the
//! corpus matrix plus its top-K right singular vectors. Corpus rows and the
//! query are both centered on the corpus mean and projected on the same basis,
//! so distances between them are comparable.

pub mod svd;

use crate::models::SkippedItem;
use crate::types::{FeatureVector, MediaItem};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use thiserror::Error;

/// Projection errors
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// No rows or no columns to fit on
    #[error("Cannot fit a subspace on an empty matrix")]
    EmptyMatrix,

    /// Vector length differs from the fitted dimensionality
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Mean vector plus projection basis fitted on a corpus
#[derive(Debug, Clone)]
pub struct Subspace {
    mean: Array1<f64>,
    /// `components x dimension`, one right singular vector per row
    basis: Array2<f64>,
    singular_values: Vec<f64>,
}

impl Subspace {
    /// Fit on a corpus matrix (one row per item) and project its rows
    ///
    /// Returns the subspace and the projected corpus (`rows x components`).
    /// `components` is clamped to the numerical rank of the centered matrix,
    /// which is at most `rows - 1`.
    pub fn fit(
        samples: &Array2<f64>,
        components: usize,
    ) -> Result<(Self, Array2<f64>), ProjectionError> {
        if samples.nrows() == 0 || samples.ncols() == 0 {
            return Err(ProjectionError::EmptyMatrix);
        }

        let mean = samples
            .mean_axis(Axis(0))
            .ok_or(ProjectionError::EmptyMatrix)?;
        let centered = samples - &mean;

        let decomposition = svd::truncated_svd(&centered, components);
        let projected = centered.dot(&decomposition.basis.t());

        tracing::debug!(
            rows = samples.nrows(),
            dimension = samples.ncols(),
            requested = components,
            retained = decomposition.singular_values.len(),
            "Fitted subspace"
        );

        Ok((
            Self {
                mean,
                basis: decomposition.basis,
                singular_values: decomposition.singular_values,
            },
            projected,
        ))
    }

    /// Center a vector on the corpus mean and project it on the basis
    pub fn project(&self, sample: ArrayView1<f64>) -> Result<Array1<f64>, ProjectionError> {
        if sample.len() != self.mean.len() {
            return Err(ProjectionError::DimensionMismatch {
                expected: self.mean.len(),
                actual: sample.len(),
            });
        }

        let centered = &sample - &self.mean;
        Ok(self.basis.dot(&centered))
    }

    /// Retained component count
    pub fn components(&self) -> usize {
        self.basis.nrows()
    }

    /// Dimensionality of the vectors this subspace accepts
    pub fn dimension(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub fn singular_values(&self) -> &[f64] {
        &self.singular_values
    }
}

/// Stack feature vectors into a matrix, one row per vector, in order
pub fn assemble_matrix(rows: Vec<FeatureVector>) -> Result<Array2<f64>, ProjectionError> {
    let nrows = rows.len();
    let ncols = rows.first().map(|r| r.len()).ok_or(ProjectionError::EmptyMatrix)?;

    if let Some(bad) = rows.iter().find(|r| r.len() != ncols) {
        return Err(ProjectionError::DimensionMismatch {
            expected: ncols,
            actual: bad.len(),
        });
    }

    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((nrows, ncols), flat).map_err(|_| ProjectionError::EmptyMatrix)
}

/// Corpus side of an image retrieval call: everything that depends only on
/// the corpus snapshot and can be reused for another query
#[derive(Debug, Clone)]
pub struct ProjectedCorpus {
    /// Usable items, row `i` of `projected` belongs to `items[i]`
    pub items: Vec<MediaItem>,
    /// Files enumerated before extraction
    pub corpus_size: usize,
    pub subspace: Subspace,
    /// `items x components`
    pub projected: Array2<f64>,
    /// Items dropped during extraction
    pub skipped: Vec<SkippedItem>,
}
