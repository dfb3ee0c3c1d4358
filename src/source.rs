//! Data source contracts.
//!
//! Implemented by the embedding application (backend query layer); the cache
//! treats both as opaque async collaborators. Timeouts are the implementor's
//! responsibility.

use crate::error::SourceError;
use crate::types::{BatchRow, ChecklistItemStub, EvidenceRecord};
use async_trait::async_trait;

/// Single round-trip fetch of all items and evidence for one parent key.
///
/// Preferred path: one query regardless of how many checklist items the parent
/// key holds.
#[async_trait]
pub trait BatchSource: Send + Sync {
    async fn fetch_rows(&self, parent_key: &str) -> Result<Vec<BatchRow>, SourceError>;
}

/// Degraded per-item query path, used when the batch path is unreliable.
///
/// One `list_items` call followed by one `list_evidence` call per item; the
/// query count is bounded by the number of items, never unbounded.
#[async_trait]
pub trait FallbackSource: Send + Sync {
    async fn list_items(&self, parent_key: &str) -> Result<Vec<ChecklistItemStub>, SourceError>;

    async fn list_evidence(&self, item_id: &str) -> Result<Vec<EvidenceRecord>, SourceError>;
}
