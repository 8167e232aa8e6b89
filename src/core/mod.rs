pub mod cycle;
pub mod scheduler;
pub mod session;
pub mod stats;

pub use crate::domain::model::{EnrichmentResult, Lead, LeadMetadata, StoreOutcome, StoredLead};
pub use crate::domain::ports::{LeadCollector, LeadEnricher, LeadStore};
pub use crate::utils::error::Result;
