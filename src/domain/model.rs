use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A candidate company record collected from the business-data source.
///
/// `id` is the source identifier; the store keys on it so re-collecting the
/// same company never creates a second row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    pub name: String,
    pub category: String,
    pub metadata: LeadMetadata,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadMetadata {
    pub permalink: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
}

impl Lead {
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            metadata: LeadMetadata::default(),
            created_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, metadata: LeadMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Derived signals for one lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentResult {
    pub lead_id: String,
    pub seo_score: f64,
    pub identified_problems: Vec<String>,
    pub opportunities: Vec<String>,
}

/// A persisted lead joined with its enrichment, if any.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredLead {
    #[serde(flatten)]
    pub lead: Lead,
    pub enrichment: Option<EnrichmentResult>,
}

/// What `store` did with the lead row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    Inserted,
    AlreadyPresent,
}
