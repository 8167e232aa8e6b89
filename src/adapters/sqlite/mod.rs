//! SQLite-backed [`LeadStore`].
//!
//! The database runs in WAL mode: the cycle runner is the only writer, and the
//! monitoring API reads concurrently from a consistent snapshot. Each `store`
//! call is a single transaction covering the lead row and its enrichment row.

mod migrations;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use crate::domain::model::{EnrichmentResult, Lead, LeadMetadata, StoreOutcome, StoredLead};
use crate::domain::ports::LeadStore;
use crate::utils::error::{LeadError, Result};

/// Upper bound on a single page from `query_leads`.
pub const MAX_PAGE_SIZE: u32 = 1000;

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| LeadError::malformed(format!("stored timestamp {:?}: {}", raw, e)))
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `path` and applies migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        tracing::info!(path = %path.display(), "lead database ready");
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::raw_sql(migrations::SCHEMA_TABLE)
            .execute(&self.pool)
            .await?;

        let current = self.schema_version().await?;

        for migration in migrations::all_migrations() {
            if migration.version <= current {
                continue;
            }
            tracing::info!(
                version = migration.version,
                description = migration.description,
                "applying migration"
            );

            let version = migration.version;
            let wrap = |source: sqlx::Error| LeadError::Migration { version, source };

            let mut tx = self.pool.begin().await.map_err(wrap)?;
            sqlx::raw_sql(migration.sql)
                .execute(&mut *tx)
                .await
                .map_err(wrap)?;
            sqlx::query("INSERT INTO schema_migrations (version) VALUES (?1)")
                .bind(i64::from(version))
                .execute(&mut *tx)
                .await
                .map_err(wrap)?;
            tx.commit().await.map_err(wrap)?;
        }
        Ok(())
    }

    pub async fn schema_version(&self) -> Result<u32> {
        let version: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_migrations")
            .fetch_one(&self.pool)
            .await?;
        Ok(version.unwrap_or(0) as u32)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn row_to_stored(row: &SqliteRow) -> Result<StoredLead> {
        let created_at: String = row.try_get("created_at")?;
        let lead = Lead {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            category: row.try_get("category")?,
            metadata: LeadMetadata {
                permalink: row.try_get("permalink")?,
                description: row.try_get("description")?,
                website: row.try_get("website")?,
            },
            created_at: parse_timestamp(&created_at)?,
        };

        let enriched_id: Option<String> = row.try_get("enriched_lead_id")?;
        let enrichment = match enriched_id {
            Some(lead_id) => {
                let problems: String = row.try_get("identified_problems")?;
                let opportunities: String = row.try_get("opportunities")?;
                Some(EnrichmentResult {
                    lead_id,
                    seo_score: row.try_get("seo_score")?,
                    identified_problems: serde_json::from_str(&problems)?,
                    opportunities: serde_json::from_str(&opportunities)?,
                })
            }
            None => None,
        };

        Ok(StoredLead { lead, enrichment })
    }
}

#[async_trait]
impl LeadStore for SqliteStore {
    async fn store(
        &self,
        lead: &Lead,
        enrichment: Option<&EnrichmentResult>,
    ) -> Result<StoreOutcome> {
        if let Some(result) = enrichment {
            if result.lead_id != lead.id {
                return Err(LeadError::malformed(format!(
                    "enrichment for {} attached to lead {}",
                    result.lead_id, lead.id
                )));
            }
        }

        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO leads (id, name, category, permalink, description, website, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(lead.id.as_str())
        .bind(lead.name.as_str())
        .bind(lead.category.as_str())
        .bind(lead.metadata.permalink.as_deref())
        .bind(lead.metadata.description.as_deref())
        .bind(lead.metadata.website.as_deref())
        .bind(format_timestamp(&lead.created_at))
        .execute(&mut *tx)
        .await?
        .rows_affected()
            == 1;

        if let Some(result) = enrichment {
            // Re-enrichment replaces the previous signals for the lead.
            sqlx::query(
                "INSERT INTO enrichment_data (lead_id, seo_score, identified_problems, opportunities, enriched_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(lead_id) DO UPDATE SET
                     seo_score = excluded.seo_score,
                     identified_problems = excluded.identified_problems,
                     opportunities = excluded.opportunities,
                     enriched_at = excluded.enriched_at",
            )
            .bind(result.lead_id.as_str())
            .bind(result.seo_score)
            .bind(serde_json::to_string(&result.identified_problems)?)
            .bind(serde_json::to_string(&result.opportunities)?)
            .bind(format_timestamp(&Utc::now()))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(if inserted {
            StoreOutcome::Inserted
        } else {
            StoreOutcome::AlreadyPresent
        })
    }

    async fn query_leads(&self, limit: u32, offset: u32) -> Result<Vec<StoredLead>> {
        let limit = limit.min(MAX_PAGE_SIZE);
        let rows = sqlx::query(
            "SELECT l.id, l.name, l.category, l.permalink, l.description, l.website, l.created_at,
                    e.lead_id AS enriched_lead_id, e.seo_score, e.identified_problems, e.opportunities
             FROM leads l
             LEFT JOIN enrichment_data e ON l.id = e.lead_id
             ORDER BY l.created_at DESC, l.rowid DESC
             LIMIT ?1 OFFSET ?2",
        )
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_stored).collect()
    }

    async fn count_leads(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM leads")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn count_enriched(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM enrichment_data")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}
