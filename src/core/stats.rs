use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Aggregate counters across cycles.
///
/// Counters only ever increase. The cycle runner is the sole writer; the
/// monitoring API reads through [`RunStats::snapshot`].
#[derive(Debug, Default)]
pub struct RunStats {
    leads_generated: AtomicU64,
    leads_enriched: AtomicU64,
    errors: AtomicU64,
    cycles_completed: AtomicU64,
    last_cycle_finished_at: RwLock<Option<DateTime<Utc>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub leads_generated: u64,
    pub leads_enriched: u64,
    pub errors: u64,
    pub cycles_completed: u64,
    pub last_cycle_finished_at: Option<DateTime<Utc>>,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_generated(&self, n: u64) {
        self.leads_generated.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn record_enriched(&self) {
        self.leads_enriched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cycle_finished(&self, at: DateTime<Utc>) {
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
        // A poisoned lock only means a reader panicked mid-read; the value is still valid.
        let mut last = self
            .last_cycle_finished_at
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *last = Some(at);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let last_cycle_finished_at = *self
            .last_cycle_finished_at
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        StatsSnapshot {
            leads_generated: self.leads_generated.load(Ordering::Relaxed),
            leads_enriched: self.leads_enriched.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            last_cycle_finished_at,
        }
    }
}
