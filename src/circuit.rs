//! Per-key circuit breaker for the batch query path.
//!
//! # States
//! - Closed: batch path in normal use
//! - Open (`fallback_open`): batch path skipped, fallback path used exclusively
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive_failures >= fallback_threshold
//! Open → Closed: any successful load for that key (batch or fallback path),
//!                or an explicit reset
//! ```
//!
//! The breaker counts strictly consecutive failures per parent key; there is no
//! time window and no half-open probe state. A failed fallback load after a
//! reset starts the count again from one.

use std::collections::HashMap;
use tracing::{debug, warn};

/// Circuit state for one parent key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitState {
    pub consecutive_failures: u32,
    pub fallback_open: bool,
}

/// Tracks batch-path failures per parent key
pub struct CircuitTracker {
    states: HashMap<String, CircuitState>,
    fallback_threshold: u32,
}

impl CircuitTracker {
    pub fn new(fallback_threshold: u32) -> Self {
        Self {
            states: HashMap::new(),
            fallback_threshold: fallback_threshold.max(1),
        }
    }

    /// Record one failed load for a key; returns the updated state.
    ///
    /// State is created lazily on the first failure for a key.
    pub fn record_failure(&mut self, parent_key: &str) -> CircuitState {
        let state = self
            .states
            .entry(parent_key.to_string())
            .or_insert(CircuitState {
                consecutive_failures: 0,
                fallback_open: false,
            });
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        if state.consecutive_failures >= self.fallback_threshold && !state.fallback_open {
            state.fallback_open = true;
            warn!(
                parent_key = %parent_key,
                failures = state.consecutive_failures,
                "Circuit opened, batch path suspended for key"
            );
        }
        *state
    }

    /// Record a successful load (via either path), closing the circuit
    pub fn record_success(&mut self, parent_key: &str) {
        if let Some(state) = self.states.remove(parent_key) {
            if state.fallback_open {
                debug!(parent_key = %parent_key, "Circuit closed after successful load");
            }
        }
    }

    pub fn is_fallback_open(&self, parent_key: &str) -> bool {
        self.states
            .get(parent_key)
            .map(|s| s.fallback_open)
            .unwrap_or(false)
    }

    pub fn state(&self, parent_key: &str) -> Option<CircuitState> {
        self.states.get(parent_key).copied()
    }

    /// Explicitly clear failure state for a key
    pub fn reset(&mut self, parent_key: &str) {
        self.states.remove(parent_key);
    }

    /// Number of keys currently holding failure state
    pub fn tracked_keys(&self) -> usize {
        self.states.len()
    }
}
