//! Heuristic memory estimation for cached entries.
//!
//! Approximate cost model used for health reporting and the memory gauge;
//! never consulted for correctness decisions. Fixed per-record overheads stand
//! in for allocator and map bookkeeping, string payloads are counted by length.

use crate::store::EvidenceStore;
use crate::types::{ChecklistItem, EvidenceRecord, ItemSet};

/// Map slot, hasher state, and struct framing per checklist item
const ITEM_OVERHEAD_BYTES: u64 = 160;
/// Map slot plus struct framing per evidence record
const EVIDENCE_OVERHEAD_BYTES: u64 = 120;
/// Per parent-key entry in the outer map
const ENTRY_OVERHEAD_BYTES: u64 = 80;

fn estimate_evidence(record: &EvidenceRecord) -> u64 {
    let metadata: u64 = record
        .metadata
        .iter()
        .map(|(k, v)| (k.len() + v.len()) as u64)
        .sum();
    EVIDENCE_OVERHEAD_BYTES
        + record.id.len() as u64
        + record.item_id.len() as u64
        + record.locator.len() as u64
        + metadata
}

fn estimate_item(item: &ChecklistItem) -> u64 {
    ITEM_OVERHEAD_BYTES
        + item.id.len() as u64
        + item.label.len() as u64
        + item.status.len() as u64
        + item.evidence.values().map(estimate_evidence).sum::<u64>()
}

/// Approximate heap cost of one item set in bytes
pub fn estimate_item_set(items: &ItemSet) -> u64 {
    items.values().map(estimate_item).sum()
}

/// Approximate heap cost of the whole store in bytes
pub fn estimate_store(store: &EvidenceStore) -> u64 {
    store
        .iter()
        .map(|(key, items)| ENTRY_OVERHEAD_BYTES + key.len() as u64 + estimate_item_set(items))
        .sum()
}
