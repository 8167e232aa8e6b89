//! Read-only monitoring surface over the run statistics and the lead store.
//!
//! Handlers never mutate [`RunStats`] and never trigger a cycle.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::core::stats::{RunStats, StatsSnapshot};
use crate::domain::model::StoredLead;
use crate::domain::ports::LeadStore;
use crate::utils::error::LeadError;

#[derive(Clone)]
pub struct ApiState {
    pub stats: Arc<RunStats>,
    pub store: Arc<dyn LeadStore>,
    pub interval_hours: f64,
}

#[derive(Debug, Deserialize)]
pub struct LeadsQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_limit() -> u32 {
    100
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    timestamp: String,
    version: &'static str,
}

/// Store failures surface as a 500 with the error message.
pub struct ApiError(LeadError);

impl From<LeadError> for ApiError {
    fn from(err: LeadError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, "monitoring query failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(dashboard_handler))
        .route("/stats", get(stats_handler))
        .route("/leads", get(leads_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn stats_handler(State(state): State<ApiState>) -> Json<StatsSnapshot> {
    Json(state.stats.snapshot())
}

async fn leads_handler(
    State(state): State<ApiState>,
    Query(query): Query<LeadsQuery>,
) -> Result<Json<Vec<StoredLead>>, ApiError> {
    let leads = state.store.query_leads(query.limit, query.offset).await?;
    Ok(Json(leads))
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn dashboard_handler(State(state): State<ApiState>) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Lead Automation Dashboard</title></head>
<body>
  <h1>Lead Automation Dashboard</h1>
  <p>Automation runs every {hours} hours: collect leads, enrich with SEO analysis, store.</p>
  <ul>
    <li><a href="/stats">Statistics</a></li>
    <li><a href="/leads">Leads</a></li>
    <li><a href="/health">Health</a></li>
  </ul>
</body>
</html>"#,
        hours = state.interval_hours
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{EnrichmentResult, Lead, StoreOutcome};
    use crate::utils::error::Result;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    struct FixedStore {
        fail: bool,
    }

    #[async_trait]
    impl LeadStore for FixedStore {
        async fn store(&self, _: &Lead, _: Option<&EnrichmentResult>) -> Result<StoreOutcome> {
            Ok(StoreOutcome::Inserted)
        }

        async fn query_leads(&self, limit: u32, offset: u32) -> Result<Vec<StoredLead>> {
            if self.fail {
                return Err(LeadError::malformed("disk on fire"));
            }
            Ok((offset..offset + limit.min(3))
                .map(|i| StoredLead {
                    lead: Lead::new(format!("u{}", i), "Acme", "software"),
                    enrichment: None,
                })
                .collect())
        }

        async fn count_leads(&self) -> Result<u64> {
            Ok(3)
        }

        async fn count_enriched(&self) -> Result<u64> {
            Ok(0)
        }
    }

    fn app(fail: bool) -> (Router, Arc<RunStats>) {
        let stats = Arc::new(RunStats::new());
        let state = ApiState {
            stats: stats.clone(),
            store: Arc::new(FixedStore { fail }),
            interval_hours: 4.0,
        };
        (router(state), stats)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_stats_reports_snapshot_without_mutating() {
        let (app, stats) = app(false);
        stats.record_generated(2);
        stats.record_enriched();
        stats.record_error();

        let (status, body) = get_json(app.clone(), "/stats").await;
        let (_, again) = get_json(app, "/stats").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["leads_generated"], 2);
        assert_eq!(body["leads_enriched"], 1);
        assert_eq!(body["errors"], 1);
        assert_eq!(body, again);
    }

    #[tokio::test]
    async fn test_leads_pagination_params() {
        let (app, _) = app(false);

        let (status, body) = get_json(app, "/leads?limit=2&offset=5").await;

        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["id"], "u5");
        assert!(rows[0]["enrichment"].is_null());
    }

    #[tokio::test]
    async fn test_leads_store_error_is_500() {
        let (app, _) = app(true);

        let (status, body) = get_json(app, "/leads").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("disk on fire"));
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app(false);

        let (status, body) = get_json(app, "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_dashboard_links() {
        let (app, _) = app(false);
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();

        assert!(html.contains("href=\"/stats\""));
        assert!(html.contains("every 4 hours"));
    }
}
