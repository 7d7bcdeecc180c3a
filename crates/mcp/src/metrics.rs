// Dispatcher counters, reported by the `status` method and at shutdown

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Why a message did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ParseError,
    UnknownMethod,
    MissingToolName,
    UnknownTool,
    /// The tool could not run; answered with an RPC error.
    ToolFailure,
    /// The tool ran and returned an error-marked result.
    ToolError,
}

/// How one message was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Failed(FailureKind),
}

#[derive(Debug, Default)]
struct Counters {
    total: u64,
    succeeded: u64,
    failed: u64,
    by_kind: BTreeMap<FailureKind, u64>,
    busy: Duration,
    last_error_at: Option<DateTime<Utc>>,
}

/// Message counters for one server.
#[derive(Debug)]
pub struct DispatchMetrics {
    started: Instant,
    counters: Mutex<Counters>,
}

/// Point-in-time copy of [`DispatchMetrics`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub total_messages: u64,
    pub successful_messages: u64,
    pub failed_messages: u64,
    pub error_counts: BTreeMap<FailureKind, u64>,
    pub average_processing_ms: f64,
    pub last_error_at: Option<DateTime<Utc>>,
    pub uptime_secs: u64,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            counters: Mutex::new(Counters::default()),
        }
    }

    pub fn record(&self, outcome: Outcome, elapsed: Duration) {
        let mut counters = self.lock();
        counters.total += 1;
        counters.busy += elapsed;

        match outcome {
            Outcome::Succeeded => counters.succeeded += 1,
            Outcome::Failed(kind) => {
                counters.failed += 1;
                *counters.by_kind.entry(kind).or_insert(0) += 1;
                counters.last_error_at = Some(Utc::now());
            }
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let counters = self.lock();
        let average_processing_ms = if counters.total == 0 {
            0.0
        } else {
            counters.busy.as_secs_f64() * 1000.0 / counters.total as f64
        };

        MetricsSnapshot {
            total_messages: counters.total,
            successful_messages: counters.succeeded,
            failed_messages: counters.failed,
            error_counts: counters.by_kind.clone(),
            average_processing_ms,
            last_error_at: counters.last_error_at,
            uptime_secs: self.started.elapsed().as_secs(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Counters> {
        // Counters stay consistent even if a holder panicked mid-update.
        self.counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for DispatchMetrics {
    fn default() -> Self {
        Self::new()
    }
}
