//! Health reporting derived from metrics and supervisor mode.

use crate::metrics::MetricsSnapshot;
use serde::Serialize;

/// Estimated cache memory above which health degrades
const MEMORY_WARN_BYTES: u64 = 64 * 1024 * 1024;
/// Error rate above which health degrades / becomes critical
const ERROR_RATE_WARN: f64 = 0.10;
const ERROR_RATE_CRITICAL: f64 = 0.50;
/// Minimum load attempts before error rates are trusted
const MIN_SAMPLES: u64 = 5;

/// Ordered by severity so independent findings combine with `max`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Critical,
}

/// Point-in-time health verdict with human-readable findings
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub issues: Vec<String>,
}

impl HealthReport {
    /// Derive a report from a metrics snapshot and the supervisor state.
    pub fn derive(
        snapshot: &MetricsSnapshot,
        supervisor_degraded: bool,
        supervisor_at_max_backoff: bool,
    ) -> Self {
        let mut issues = Vec::new();
        let mut status = HealthStatus::Healthy;

        let attempts = snapshot.successful_loads + snapshot.failed_loads;
        if attempts >= MIN_SAMPLES {
            if snapshot.error_rate > ERROR_RATE_CRITICAL {
                issues.push(format!(
                    "error rate {:.0}% exceeds critical threshold",
                    snapshot.error_rate * 100.0
                ));
                status = status.max(HealthStatus::Critical);
            } else if snapshot.error_rate > ERROR_RATE_WARN {
                issues.push(format!(
                    "elevated error rate {:.0}%",
                    snapshot.error_rate * 100.0
                ));
                status = status.max(HealthStatus::Degraded);
            }
        }

        if snapshot.memory_usage_bytes > MEMORY_WARN_BYTES {
            issues.push(format!(
                "estimated cache memory {} bytes above watermark",
                snapshot.memory_usage_bytes
            ));
            status = status.max(HealthStatus::Degraded);
        }

        if supervisor_degraded {
            issues.push("recovery supervisor active, serving fallback path only".to_string());
            status = status.max(if supervisor_at_max_backoff {
                HealthStatus::Critical
            } else {
                HealthStatus::Degraded
            });
        }

        Self { status, issues }
    }
}
