//! Core types for the evidence cache.
//!
//! Evidence records are immutable once constructed: a reload replaces the whole
//! `ItemSet` for a parent key, never patching records in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kind of evidence attached to a checklist item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceKind {
    Photo,
    Video,
    Document,
}

/// One evidence attachment (photo, video, or document)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    /// Unique evidence id
    pub id: String,
    /// Owning checklist item id
    pub item_id: String,
    pub kind: EvidenceKind,
    /// Storage locator (URL or backend path)
    pub locator: String,
    pub created_at: DateTime<Utc>,
    pub size_bytes: Option<u64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// One checklist item together with its evidence, keyed by evidence id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    pub label: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub evidence: HashMap<String, EvidenceRecord>,
}

/// All checklist items for one parent key, keyed by item id.
///
/// This is the unit of caching and eviction: the cache only ever evicts whole
/// parent-key entries, never individual items.
pub type ItemSet = HashMap<String, ChecklistItem>;

/// Checklist item header without evidence, as returned by the fallback source's
/// listing query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistItemStub {
    pub id: String,
    pub label: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl ChecklistItemStub {
    /// Promote a stub to a full item with no evidence yet
    pub fn into_item(self) -> ChecklistItem {
        ChecklistItem {
            id: self.id,
            label: self.label,
            status: self.status,
            created_at: self.created_at,
            evidence: HashMap::new(),
        }
    }
}

/// One joined row from the batch source.
///
/// Rows sharing an `item_id` fold into one [`ChecklistItem`]. The evidence
/// columns are either all present (one evidence record) or all absent (an item
/// with no evidence yet); anything in between is a malformed row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRow {
    pub item_id: String,
    pub item_label: String,
    pub item_status: String,
    pub item_created_at: DateTime<Utc>,
    pub evidence_id: Option<String>,
    pub evidence_kind: Option<EvidenceKind>,
    pub evidence_locator: Option<String>,
    pub evidence_created_at: Option<DateTime<Utc>>,
    pub evidence_size_bytes: Option<u64>,
}
