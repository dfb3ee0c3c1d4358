//! Scripted data sources for driving the loader in integration tests.

// Each integration target compiles its own copy; not every target uses every helper.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use evcache::{
    BatchRow, BatchSource, ChecklistItemStub, EvidenceKind, EvidenceRecord, FallbackSource,
    SourceError,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// One batch row with full evidence columns
pub fn batch_row(item_id: &str, evidence_id: &str) -> BatchRow {
    BatchRow {
        item_id: item_id.to_string(),
        item_label: format!("label-{}", item_id),
        item_status: "pending".to_string(),
        item_created_at: Utc::now(),
        evidence_id: Some(evidence_id.to_string()),
        evidence_kind: Some(EvidenceKind::Photo),
        evidence_locator: Some(format!("https://cdn.example/{}.jpg", evidence_id)),
        evidence_created_at: Some(Utc::now()),
        evidence_size_bytes: Some(2048),
    }
}

/// One batch row for an item with no evidence yet
pub fn bare_row(item_id: &str) -> BatchRow {
    BatchRow {
        item_id: item_id.to_string(),
        item_label: format!("label-{}", item_id),
        item_status: "pending".to_string(),
        item_created_at: Utc::now(),
        evidence_id: None,
        evidence_kind: None,
        evidence_locator: None,
        evidence_created_at: None,
        evidence_size_bytes: None,
    }
}

pub fn stub(item_id: &str) -> ChecklistItemStub {
    ChecklistItemStub {
        id: item_id.to_string(),
        label: format!("label-{}", item_id),
        status: "pending".to_string(),
        created_at: Utc::now(),
    }
}

pub fn evidence(evidence_id: &str, item_id: &str) -> EvidenceRecord {
    EvidenceRecord {
        id: evidence_id.to_string(),
        item_id: item_id.to_string(),
        kind: EvidenceKind::Video,
        locator: format!("https://cdn.example/{}.mp4", evidence_id),
        created_at: Utc::now(),
        size_bytes: Some(1 << 20),
        metadata: HashMap::new(),
    }
}

/// Batch source with per-key row fixtures and a scripted failure budget
pub struct MockBatch {
    rows: Mutex<HashMap<String, Vec<BatchRow>>>,
    failures_remaining: AtomicU32,
    delay: Duration,
    pub calls: AtomicU32,
}

impl MockBatch {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
            failures_remaining: AtomicU32::new(0),
            delay: Duration::ZERO,
            calls: AtomicU32::new(0),
        }
    }

    /// Every fetch sleeps this long, so tests can overlap concurrent loads
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new()
        }
    }

    pub fn set_rows(&self, parent_key: &str, rows: Vec<BatchRow>) {
        self.rows.lock().insert(parent_key.to_string(), rows);
    }

    /// Make the next `count` fetches fail before serving fixtures again
    pub fn fail_next(&self, count: u32) {
        self.failures_remaining.store(count, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BatchSource for MockBatch {
    async fn fetch_rows(&self, parent_key: &str) -> Result<Vec<BatchRow>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.delay > Duration::ZERO {
            tokio::time::sleep(self.delay).await;
        }
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(SourceError::Unavailable("scripted batch outage".to_string()));
        }
        Ok(self
            .rows
            .lock()
            .get(parent_key)
            .cloned()
            .unwrap_or_default())
    }
}

/// Fallback source with per-key stubs, per-item evidence, and scripted failures
pub struct MockFallback {
    items: Mutex<HashMap<String, Vec<ChecklistItemStub>>>,
    evidence: Mutex<HashMap<String, Vec<EvidenceRecord>>>,
    failing_items: Mutex<HashSet<String>>,
    listing_failures_remaining: AtomicU32,
    pub listing_calls: AtomicU32,
    pub evidence_calls: AtomicU32,
}

impl MockFallback {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            evidence: Mutex::new(HashMap::new()),
            failing_items: Mutex::new(HashSet::new()),
            listing_failures_remaining: AtomicU32::new(0),
            listing_calls: AtomicU32::new(0),
            evidence_calls: AtomicU32::new(0),
        }
    }

    pub fn set_items(&self, parent_key: &str, stubs: Vec<ChecklistItemStub>) {
        self.items.lock().insert(parent_key.to_string(), stubs);
    }

    pub fn set_evidence(&self, item_id: &str, records: Vec<EvidenceRecord>) {
        self.evidence.lock().insert(item_id.to_string(), records);
    }

    /// Make evidence queries for one item always fail
    pub fn fail_evidence_for(&self, item_id: &str) {
        self.failing_items.lock().insert(item_id.to_string());
    }

    /// Make the next `count` listing queries fail
    pub fn fail_next_listings(&self, count: u32) {
        self.listing_failures_remaining
            .store(count, Ordering::SeqCst);
    }

    pub fn listing_call_count(&self) -> u32 {
        self.listing_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FallbackSource for MockFallback {
    async fn list_items(&self, parent_key: &str) -> Result<Vec<ChecklistItemStub>, SourceError> {
        self.listing_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.listing_failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.listing_failures_remaining
                .store(remaining - 1, Ordering::SeqCst);
            return Err(SourceError::Unavailable(
                "scripted fallback outage".to_string(),
            ));
        }
        Ok(self
            .items
            .lock()
            .get(parent_key)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_evidence(&self, item_id: &str) -> Result<Vec<EvidenceRecord>, SourceError> {
        self.evidence_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_items.lock().contains(item_id) {
            return Err(SourceError::Query(format!(
                "scripted evidence failure for {}",
                item_id
            )));
        }
        Ok(self
            .evidence
            .lock()
            .get(item_id)
            .cloned()
            .unwrap_or_default())
    }
}
