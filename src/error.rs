//! Error types for the evidence cache.

use thiserror::Error;

/// Errors produced by data-source implementations (batch or fallback path).
///
/// The cache treats these as transient: they feed the per-key circuit breaker
/// and never crash the caller.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The query was issued and rejected or timed out
    #[error("query failed: {0}")]
    Query(String),

    /// The backend could not be reached at all
    #[error("data source unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by [`crate::loader::EvidenceLoader::load`].
///
/// A failed load always returns one of these; it never raises an unhandled
/// panic toward the consumer.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The batch path failed and no fallback was attempted or available
    #[error("batch load failed for '{parent_key}': {source}")]
    BatchFailed {
        parent_key: String,
        source: SourceError,
    },

    /// The fallback path failed (after the batch path failed or was skipped)
    #[error("fallback load failed for '{parent_key}': {source}")]
    FallbackFailed {
        parent_key: String,
        source: SourceError,
    },

    /// A batch row carried a partial set of evidence columns.
    ///
    /// This indicates a bug in the batch query or grouping logic rather than a
    /// transient backend problem, so it is reported to the recovery supervisor.
    #[error("malformed batch row for '{parent_key}': item '{item_id}' has partial evidence columns")]
    MalformedRow { parent_key: String, item_id: String },
}

impl LoadError {
    /// Parent key the failed load was issued for
    pub fn parent_key(&self) -> &str {
        match self {
            LoadError::BatchFailed { parent_key, .. }
            | LoadError::FallbackFailed { parent_key, .. }
            | LoadError::MalformedRow { parent_key, .. } => parent_key,
        }
    }
}
