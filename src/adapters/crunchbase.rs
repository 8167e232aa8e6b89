use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::core::session::HttpSession;
use crate::domain::model::{Lead, LeadMetadata};
use crate::domain::ports::LeadCollector;
use crate::utils::error::{LeadError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.crunchbase.com/api/v4";

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub base_url: String,
    pub api_key: String,
    pub page_size: usize,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    /// Upper bound on a single back-off, including one requested via `Retry-After`.
    pub max_backoff: Duration,
}

impl CollectorConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            page_size: 25,
            retry_attempts: 3,
            retry_delay: Duration::from_secs(2),
            max_backoff: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AutocompleteResponse {
    #[serde(default)]
    entities: Vec<Entity>,
}

#[derive(Debug, Deserialize)]
struct Entity {
    identifier: Option<Identifier>,
    short_description: Option<String>,
    website_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Identifier {
    uuid: Option<String>,
    value: Option<String>,
    permalink: Option<String>,
}

/// Collects organisations for a category from the business-data API.
pub struct CrunchbaseCollector {
    config: CollectorConfig,
}

impl CrunchbaseCollector {
    pub fn new(config: CollectorConfig) -> Self {
        Self { config }
    }

    fn endpoint(&self) -> String {
        format!("{}/autocompletes", self.config.base_url.trim_end_matches('/'))
    }

    fn backoff(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        retry_after
            .unwrap_or_else(|| self.config.retry_delay.saturating_mul(2u32.saturating_pow(attempt)))
            .min(self.config.max_backoff)
    }

    fn into_leads(category: &str, body: AutocompleteResponse) -> Vec<Lead> {
        let mut seen = HashSet::new();
        let mut leads = Vec::with_capacity(body.entities.len());

        for entity in body.entities {
            let Some(identifier) = entity.identifier else {
                tracing::debug!(category, "skipping entity without identifier");
                continue;
            };
            let (Some(uuid), Some(name)) = (identifier.uuid, identifier.value) else {
                tracing::debug!(category, "skipping entity without uuid or name");
                continue;
            };
            if name.trim().is_empty() || !seen.insert(uuid.clone()) {
                continue;
            }

            let metadata = LeadMetadata {
                permalink: identifier.permalink,
                description: entity.short_description,
                website: entity.website_url,
            };
            leads.push(Lead::new(uuid, name.trim(), category).with_metadata(metadata));
        }

        leads
    }
}

fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[async_trait]
impl LeadCollector for CrunchbaseCollector {
    async fn collect(&self, session: &HttpSession, category: &str) -> Result<Vec<Lead>> {
        let url = self.endpoint();
        let page_size = self.config.page_size.to_string();
        let mut attempt = 0u32;

        loop {
            tracing::debug!(category, attempt, "requesting leads from {}", url);
            let response = session
                .client()
                .get(&url)
                .header("X-cb-user-key", &self.config.api_key)
                .query(&[
                    ("query", category),
                    ("collection_ids", "organizations"),
                    ("limit", page_size.as_str()),
                ])
                .send()
                .await?;

            let status = response.status();
            tracing::debug!(category, status = %status, "source response");

            if status == StatusCode::TOO_MANY_REQUESTS {
                if attempt >= self.config.retry_attempts {
                    return Err(LeadError::RateLimited {
                        attempts: attempt + 1,
                    });
                }
                let wait = self.backoff(attempt, retry_after(response.headers()));
                tracing::warn!(category, ?wait, "rate limited by source, backing off");
                tokio::time::sleep(wait).await;
                attempt += 1;
                continue;
            }

            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(LeadError::UpstreamStatus {
                    status: status.as_u16(),
                    message,
                });
            }

            let bytes = response.bytes().await?;
            let body: AutocompleteResponse = serde_json::from_slice(&bytes)
                .map_err(|e| LeadError::malformed(format!("source payload: {}", e)))?;

            let leads = Self::into_leads(category, body);
            tracing::info!(category, count = leads.len(), "collected leads");
            return Ok(leads);
        }
    }
}
