//! Evcache: Batched Evidence Cache for Inspection Checklists
//!
//! Loads all checklist-item evidence (photos, videos, documents) for an
//! inspection in one batched round trip, caches the result with bounded
//! capacity, and degrades to a per-item fallback query path behind a per-key
//! circuit breaker when the batch path is unreliable. A recovery supervisor
//! suspends the fast path with progressive backoff after systemic failures.

pub mod circuit;
pub mod config;
pub mod error;
pub mod estimate;
pub mod health;
pub mod loader;
pub mod locks;
pub mod logging;
pub mod metrics;
pub mod source;
pub mod store;
pub mod supervisor;
pub mod types;

pub use config::CacheConfig;
pub use error::{LoadError, SourceError};
pub use health::{HealthReport, HealthStatus};
pub use loader::{EvidenceLoader, LoadResult, LoadSource};
pub use metrics::MetricsSnapshot;
pub use source::{BatchSource, FallbackSource};
pub use types::{BatchRow, ChecklistItem, ChecklistItemStub, EvidenceKind, EvidenceRecord, ItemSet};
