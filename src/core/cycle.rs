//! One pass over every configured category.
//!
//! ```text
//! INIT (acquire session)
//!   └─► for each category: COLLECT
//!         └─► for each lead: ENRICH ─► PERSIST (with or without enrichment)
//! DONE (session released by the guard)
//! ```
//!
//! Per-item failures are absorbed into [`RunStats`]. Only failing to open the
//! outbound session crosses the cycle boundary. A pending collection or
//! enrichment call is abandoned as soon as the token is cancelled; a
//! persistence write always runs to completion.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::core::session::ResourceSession;
use crate::core::stats::RunStats;
use crate::domain::model::StoreOutcome;
use crate::domain::ports::{LeadCollector, LeadEnricher, LeadStore};
use crate::utils::error::{LeadError, Result};

/// Counts for a single cycle. `RunStats` holds the process-wide totals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub leads_generated: u64,
    pub leads_enriched: u64,
    pub errors: u64,
    pub leads_inserted: u64,
    pub categories_processed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed(CycleReport),
    /// Stopped at an item boundary; the report covers the work done so far.
    Cancelled(CycleReport),
}

impl CycleOutcome {
    pub fn report(&self) -> &CycleReport {
        match self {
            CycleOutcome::Completed(report) | CycleOutcome::Cancelled(report) => report,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, CycleOutcome::Cancelled(_))
    }
}

pub struct CycleRunner {
    categories: Vec<String>,
    collector: Arc<dyn LeadCollector>,
    enricher: Arc<dyn LeadEnricher>,
    store: Arc<dyn LeadStore>,
    session: ResourceSession,
    stats: Arc<RunStats>,
    enrich_timeout: Duration,
}

impl CycleRunner {
    pub fn new(
        categories: Vec<String>,
        collector: Arc<dyn LeadCollector>,
        enricher: Arc<dyn LeadEnricher>,
        store: Arc<dyn LeadStore>,
        session: ResourceSession,
        stats: Arc<RunStats>,
    ) -> Self {
        Self {
            categories,
            collector,
            enricher,
            store,
            session,
            stats,
            enrich_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_enrich_timeout(mut self, timeout: Duration) -> Self {
        self.enrich_timeout = timeout;
        self
    }

    pub fn stats(&self) -> &Arc<RunStats> {
        &self.stats
    }

    pub fn session_is_open(&self) -> bool {
        self.session.is_open()
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub async fn run_cycle(&mut self, cancel: &CancellationToken) -> Result<CycleOutcome> {
        let started = Instant::now();
        tracing::info!(categories = self.categories.len(), "starting automation cycle");

        let mut guard = self.session.scoped().inspect_err(|e| {
            tracing::error!(error = %e, "could not open outbound session, aborting cycle");
        })?;

        let mut report = CycleReport::default();

        for category in &self.categories {
            if cancel.is_cancelled() {
                tracing::info!(category = %category, "cancellation requested, stopping cycle");
                return Ok(CycleOutcome::Cancelled(report));
            }

            let session = guard.handle()?;

            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(category = %category, "cancellation requested during collection");
                    return Ok(CycleOutcome::Cancelled(report));
                }
                result = self.collector.collect(session, category) => result,
            };

            let leads = match fetched {
                Ok(leads) => leads,
                Err(e) => {
                    tracing::warn!(
                        category = %category,
                        error = %e,
                        retryable = e.is_retryable(),
                        "collection failed, category contributes no leads"
                    );
                    self.stats.record_error();
                    report.errors += 1;
                    report.categories_processed += 1;
                    continue;
                }
            };

            let collected = leads.len() as u64;
            self.stats.record_generated(collected);
            report.leads_generated += collected;

            for lead in &leads {
                if cancel.is_cancelled() {
                    tracing::info!(lead_id = %lead.id, "cancellation requested, stopping cycle");
                    return Ok(CycleOutcome::Cancelled(report));
                }

                let attempt = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        tracing::info!(lead_id = %lead.id, "cancellation requested during enrichment");
                        return Ok(CycleOutcome::Cancelled(report));
                    }
                    result = tokio::time::timeout(
                        self.enrich_timeout,
                        self.enricher.enrich(session, lead),
                    ) => result,
                };

                let enrichment = match attempt {
                    Ok(Ok(result)) => {
                        self.stats.record_enriched();
                        report.leads_enriched += 1;
                        Some(result)
                    }
                    Ok(Err(e)) => {
                        tracing::warn!(lead_id = %lead.id, error = %e, "enrichment failed");
                        self.stats.record_error();
                        report.errors += 1;
                        None
                    }
                    Err(_) => {
                        let e = LeadError::Timeout(self.enrich_timeout);
                        tracing::warn!(lead_id = %lead.id, error = %e, "enrichment timed out");
                        self.stats.record_error();
                        report.errors += 1;
                        None
                    }
                };

                match self.store.store(lead, enrichment.as_ref()).await {
                    Ok(StoreOutcome::Inserted) => report.leads_inserted += 1,
                    Ok(StoreOutcome::AlreadyPresent) => {
                        tracing::debug!(lead_id = %lead.id, "lead already stored");
                    }
                    Err(e) => {
                        tracing::error!(lead_id = %lead.id, error = %e, "failed to persist lead");
                        self.stats.record_error();
                        report.errors += 1;
                    }
                }
            }

            report.categories_processed += 1;
            tracing::info!(
                category = %category,
                leads = leads.len(),
                "completed processing leads for category"
            );
        }

        drop(guard);
        self.stats.record_cycle_finished(Utc::now());

        tracing::info!(
            leads_generated = report.leads_generated,
            leads_enriched = report.leads_enriched,
            errors = report.errors,
            elapsed = ?started.elapsed(),
            "automation cycle finished"
        );

        Ok(CycleOutcome::Completed(report))
    }
}
