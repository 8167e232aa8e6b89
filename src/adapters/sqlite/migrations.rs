//! Schema migrations for the lead database, applied in ascending order on open.

pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

pub(crate) const SCHEMA_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "leads and enrichment_data",
            sql: r#"
CREATE TABLE IF NOT EXISTS leads (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    category    TEXT NOT NULL,
    permalink   TEXT,
    description TEXT,
    website     TEXT,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS enrichment_data (
    lead_id             TEXT PRIMARY KEY REFERENCES leads(id) ON DELETE CASCADE,
    seo_score           REAL NOT NULL,
    identified_problems TEXT NOT NULL DEFAULT '[]',
    opportunities       TEXT NOT NULL DEFAULT '[]',
    enriched_at         TEXT NOT NULL
);
"#,
        },
        Migration {
            version: 2,
            description: "index leads by creation time",
            sql: r#"
CREATE INDEX IF NOT EXISTS idx_leads_created_at ON leads(created_at);
CREATE INDEX IF NOT EXISTS idx_leads_category ON leads(category);
"#,
        },
    ]
}
