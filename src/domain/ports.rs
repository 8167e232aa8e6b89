use crate::core::session::HttpSession;
use crate::domain::model::{EnrichmentResult, Lead, StoreOutcome, StoredLead};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Fetches one page of candidate leads for a category.
///
/// Implementations deduplicate by source identifier and never write to storage.
#[async_trait]
pub trait LeadCollector: Send + Sync {
    async fn collect(&self, session: &HttpSession, category: &str) -> Result<Vec<Lead>>;
}

/// Produces derived signals for a lead through an inference call.
#[async_trait]
pub trait LeadEnricher: Send + Sync {
    async fn enrich(&self, session: &HttpSession, lead: &Lead) -> Result<EnrichmentResult>;
}

#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Writes the lead if absent and the enrichment if present, atomically.
    async fn store(&self, lead: &Lead, enrichment: Option<&EnrichmentResult>)
        -> Result<StoreOutcome>;

    /// Newest first, left-joined with enrichment.
    async fn query_leads(&self, limit: u32, offset: u32) -> Result<Vec<StoredLead>>;

    async fn count_leads(&self) -> Result<u64>;

    async fn count_enriched(&self) -> Result<u64>;
}
