//! Recovery supervisor for systemic failures.
//!
//! Independent of the per-key circuit breaker: the circuit handles data
//! failures for one parent key, the supervisor handles crashes that would
//! affect every key (a malformed batch projection, a panic in a downstream
//! consumer). While degraded, the loader serves all keys through the fallback
//! path only.
//!
//! # State Transitions
//! ```text
//! Stable → Degraded(0): crash reported
//! Degraded(n) → Degraded(min(n+1, last)): crash while degraded, timer restarts
//! Degraded(n) → Stable: backoff timer elapses
//! ```

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Stable,
    Degraded,
}

struct SupervisorState {
    mode: Mode,
    consecutive_crashes: u32,
    /// Bumped on every crash and on shutdown; a recovery timer only applies
    /// if its captured generation still matches (aborting the previous timer
    /// task cannot stop one that already woke from its sleep)
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

/// Supervisor-level breaker with progressive backoff re-enablement
pub struct RecoverySupervisor {
    schedule: Vec<Duration>,
    state: Arc<Mutex<SupervisorState>>,
}

impl RecoverySupervisor {
    /// Create a supervisor with the given backoff schedule.
    ///
    /// The schedule entries apply to the 1st, 2nd, ... consecutive crash;
    /// later crashes reuse the last entry. An empty schedule falls back to a
    /// single 5 second delay.
    pub fn new(schedule: Vec<Duration>) -> Self {
        let schedule = if schedule.is_empty() {
            vec![Duration::from_secs(5)]
        } else {
            schedule
        };
        Self {
            schedule,
            state: Arc::new(Mutex::new(SupervisorState {
                mode: Mode::Stable,
                consecutive_crashes: 0,
                generation: 0,
                timer: None,
            })),
        }
    }

    /// Report a systemic crash.
    ///
    /// Switches to degraded mode (or extends it) and schedules automatic
    /// recovery after the backoff for the current crash count. Must be called
    /// from within a tokio runtime.
    pub fn record_crash(&self) {
        let mut state = self.state.lock();
        state.consecutive_crashes = state.consecutive_crashes.saturating_add(1);
        state.mode = Mode::Degraded;
        state.generation = state.generation.wrapping_add(1);
        let generation = state.generation;

        let index = (state.consecutive_crashes as usize - 1).min(self.schedule.len() - 1);
        let delay = self.schedule[index];
        warn!(
            crash_count = state.consecutive_crashes,
            backoff_secs = delay.as_secs(),
            "Entering degraded mode, fast path suspended"
        );

        // Restart the timer: only the most recent crash's backoff counts.
        // The abort is best-effort; the generation check above is what keeps
        // an already-woken stale timer from flipping state
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        let shared = Arc::clone(&self.state);
        state.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            Self::complete_recovery(&shared, generation);
        }));
    }

    /// Re-enable the fast path if `generation` is still the current one.
    ///
    /// A timer that was superseded by a later crash (or by shutdown) after it
    /// woke from its sleep lands here with a stale generation and must leave
    /// the state untouched.
    fn complete_recovery(shared: &Mutex<SupervisorState>, generation: u64) {
        let mut state = shared.lock();
        if state.generation != generation {
            return;
        }
        state.mode = Mode::Stable;
        state.consecutive_crashes = 0;
        state.timer = None;
        info!("Recovery backoff elapsed, fast path re-enabled");
    }

    /// Whether the fast path is currently suspended
    pub fn is_degraded(&self) -> bool {
        self.state.lock().mode == Mode::Degraded
    }

    /// Crashes since the last completed recovery
    pub fn consecutive_crashes(&self) -> u32 {
        self.state.lock().consecutive_crashes
    }

    /// True when the supervisor has reached the longest configured backoff
    pub fn at_max_backoff(&self) -> bool {
        self.state.lock().consecutive_crashes as usize >= self.schedule.len()
    }

    /// Cancel any pending recovery timer.
    ///
    /// Call on shutdown; the mode flag is left as-is since the process is
    /// going away.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        // Invalidate any timer that already woke but has not run yet
        state.generation = state.generation.wrapping_add(1);
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for RecoverySupervisor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
