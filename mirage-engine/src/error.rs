//! Error types for mirage-engine
//!
//! Whole-call failures surface as [`RetrievalError`]. Per-item failures are
//! [`ExtractionError`](crate::types::ExtractionError) values that stay inside
//! a call and end up as skip records in the report.

use crate::projection::ProjectionError;
use crate::services::corpus_loader::ScanError;
use thiserror::Error;

/// Terminal error of a retrieval call
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// No eligible file, or no usable item after extraction
    #[error("Empty corpus: {0}")]
    EmptyCorpus(String),

    /// Query image could not be read or decoded
    #[error("Query decode error: {0}")]
    QueryDecode(String),

    /// Query produced no feature vector (e.g. no notes on the melody channel)
    #[error("Query extraction error: {0}")]
    QueryExtraction(String),

    /// Stopped by the call's cancellation token
    #[error("Retrieval cancelled")]
    Cancelled,

    /// Corpus directory could not be listed
    #[error("Corpus scan error: {0}")]
    Scan(ScanError),

    /// Subspace fitting or projection failed
    #[error("Projection error: {0}")]
    Projection(#[from] ProjectionError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// mirage-common error (configuration)
    #[error("Common error: {0}")]
    Common(#[from] mirage_common::Error),

    /// Internal error (numerical failure, worker panic)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RetrievalError {
    /// Short machine-readable code for callers mapping errors to responses
    pub fn code(&self) -> &'static str {
        match self {
            RetrievalError::EmptyCorpus(_) => "EMPTY_CORPUS",
            RetrievalError::QueryDecode(_) => "QUERY_DECODE_ERROR",
            RetrievalError::QueryExtraction(_) => "QUERY_EXTRACTION_ERROR",
            RetrievalError::Cancelled => "CANCELLED",
            RetrievalError::Scan(_) => "SCAN_ERROR",
            RetrievalError::Projection(_) => "PROJECTION_ERROR",
            RetrievalError::Io(_) => "IO_ERROR",
            RetrievalError::Common(_) => "COMMON_ERROR",
            RetrievalError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<ScanError> for RetrievalError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::NoEligibleFiles(dir) => RetrievalError::EmptyCorpus(format!(
                "no eligible files in {}",
                dir.display()
            )),
            other => RetrievalError::Scan(other),
        }
    }
}

/// Result type for retrieval calls
pub type RetrievalResult<T> = Result<T, RetrievalError>;
