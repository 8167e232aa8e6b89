use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::core::cycle::{CycleOutcome, CycleRunner};
use crate::utils::error::Result;

/// Four hours between the end of one cycle and the start of the next.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(4 * 60 * 60);

/// How the scheduler loop ended when it was not a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerExit {
    Cancelled { cycles_run: u64 },
}

/// Runs cycles back to back, sleeping `interval` in between.
///
/// Cycles are awaited inline, so a new one never starts while the previous
/// is still running. Cancellation aborts the sleep immediately and is seen
/// by a running cycle at its next item boundary.
pub struct Scheduler {
    runner: CycleRunner,
    interval: Duration,
}

impl Scheduler {
    pub fn new(runner: CycleRunner, interval: Duration) -> Self {
        Self { runner, interval }
    }

    pub fn runner(&self) -> &CycleRunner {
        &self.runner
    }

    /// Loops until `cancel` fires. Returns `Err` only for a fatal cycle error.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<SchedulerExit> {
        tracing::info!(interval = ?self.interval, "scheduler started");
        let mut cycles_run = 0u64;

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let outcome = self.runner.run_cycle(&cancel).await?;
            cycles_run += 1;

            if let CycleOutcome::Cancelled(report) = outcome {
                tracing::info!(
                    leads_generated = report.leads_generated,
                    "cycle interrupted by shutdown"
                );
                break;
            }

            tracing::info!(next_run_in = ?self.interval, "sleeping until next cycle");
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        debug_assert!(!self.runner.session_is_open());
        tracing::info!(cycles_run, "scheduler stopped");
        Ok(SchedulerExit::Cancelled { cycles_run })
    }
}
