//! Supporting services for the retrieval pipelines

pub mod corpus_loader;
pub mod query_upload;
pub mod subspace_cache;

pub use corpus_loader::{CorpusLoader, ScanError, ScanResult};
pub use query_upload::QueryUpload;
pub use subspace_cache::{corpus_fingerprint, SubspaceCache};
