use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

use crate::core::session::HttpSession;
use crate::domain::model::{EnrichmentResult, Lead};
use crate::domain::ports::LeadEnricher;
use crate::utils::error::{LeadError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const SYSTEM_PROMPT: &str = "You are an SEO and growth analyst. \
Given a company, estimate its SEO maturity and answer with a JSON object only: \
{\"seo_score\": <number 0-100>, \"identified_problems\": [<string>], \"opportunities\": [<string>]}";

#[derive(Debug, Clone)]
pub struct EnricherConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_items: usize,
}

impl EnricherConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.2,
            max_items: 5,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Signals {
    seo_score: f64,
    #[serde(default)]
    identified_problems: Vec<String>,
    #[serde(default)]
    opportunities: Vec<String>,
}

/// Scores a lead through a chat-completions endpoint.
pub struct OpenAiEnricher {
    config: EnricherConfig,
}

impl OpenAiEnricher {
    pub fn new(config: EnricherConfig) -> Self {
        Self { config }
    }

    fn prompt(lead: &Lead) -> String {
        let mut prompt = format!("Company: {}\nCategory: {}", lead.name, lead.category);
        if let Some(description) = &lead.metadata.description {
            prompt.push_str(&format!("\nDescription: {}", description));
        }
        if let Some(website) = &lead.metadata.website {
            prompt.push_str(&format!("\nWebsite: {}", website));
        }
        prompt
    }

    /// Pulls the JSON object out of the model's reply, fenced or not.
    fn parse_signals(&self, lead_id: &str, content: &str) -> Result<EnrichmentResult> {
        let trimmed = content.trim();
        let json_text = match (trimmed.find('{'), trimmed.rfind('}')) {
            (Some(start), Some(end)) if start < end => &trimmed[start..=end],
            _ => return Err(LeadError::malformed("inference reply has no JSON object")),
        };

        let signals: Signals = serde_json::from_str(json_text)
            .map_err(|e| LeadError::malformed(format!("inference reply: {}", e)))?;

        if !signals.seo_score.is_finite() {
            return Err(LeadError::malformed("seo_score is not a number"));
        }

        let tidy = |items: Vec<String>| -> Vec<String> {
            items
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .take(self.config.max_items)
                .collect()
        };

        Ok(EnrichmentResult {
            lead_id: lead_id.to_string(),
            seo_score: signals.seo_score.clamp(0.0, 100.0),
            identified_problems: tidy(signals.identified_problems),
            opportunities: tidy(signals.opportunities),
        })
    }
}

#[async_trait]
impl LeadEnricher for OpenAiEnricher {
    async fn enrich(&self, session: &HttpSession, lead: &Lead) -> Result<EnrichmentResult> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let body = json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "response_format": {"type": "json_object"},
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": Self::prompt(lead)},
            ],
        });

        tracing::debug!(lead_id = %lead.id, model = %self.config.model, "requesting enrichment");
        let response = session
            .client()
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::PAYMENT_REQUIRED {
            return Err(LeadError::Quota {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LeadError::UpstreamStatus {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await?;
        let chat: ChatResponse = serde_json::from_slice(&bytes)
            .map_err(|e| LeadError::malformed(format!("inference payload: {}", e)))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LeadError::malformed("inference reply has no content"))?;

        let result = self.parse_signals(&lead.id, &content)?;
        tracing::debug!(lead_id = %lead.id, seo_score = result.seo_score, "lead enriched");
        Ok(result)
    }
}
