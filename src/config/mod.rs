//! Configuration built once at startup and handed to the components that need it.

pub mod cli;
pub mod toml_config;

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::adapters::{CollectorConfig, EnricherConfig};
use crate::core::session::SessionConfig;
use crate::utils::error::{LeadError, Result};
use crate::utils::validation::Validate;

pub use cli::CliArgs;
pub use toml_config::FileConfig;

pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const CRUNCHBASE_API_KEY: &str = "CRUNCHBASE_API_KEY";

/// The two API keys. `Debug` never prints them.
#[derive(Clone)]
pub struct Secrets {
    pub openai_api_key: String,
    pub crunchbase_api_key: String,
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("openai_api_key", &"<redacted>")
            .field("crunchbase_api_key", &"<redacted>")
            .finish()
    }
}

impl Secrets {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads both keys; the error names every missing one, not just the first.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let openai = read(OPENAI_API_KEY);
        let crunchbase = read(CRUNCHBASE_API_KEY);

        match (openai, crunchbase) {
            (Some(openai_api_key), Some(crunchbase_api_key)) => Ok(Self {
                openai_api_key,
                crunchbase_api_key,
            }),
            (openai, crunchbase) => {
                let mut vars = Vec::new();
                if openai.is_none() {
                    vars.push(OPENAI_API_KEY.to_string());
                }
                if crunchbase.is_none() {
                    vars.push(CRUNCHBASE_API_KEY.to_string());
                }
                Err(LeadError::MissingEnv { vars })
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub file: FileConfig,
    pub secrets: Secrets,
}

impl AppConfig {
    /// File values (or defaults), then CLI overrides, then validation.
    pub fn load(args: &CliArgs, secrets: Secrets) -> Result<Self> {
        let mut file = match &args.config {
            Some(path) => FileConfig::from_file(path)?,
            None => FileConfig::default(),
        };

        if let Some(db_path) = &args.db_path {
            file.storage.db_path = db_path.clone();
        }
        if let Some(bind) = &args.bind {
            file.server.bind = bind.clone();
        }

        let config = Self { file, secrets };
        config.validate()?;
        Ok(config)
    }

    pub fn categories(&self) -> Vec<String> {
        self.file.schedule.categories.clone()
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.file.schedule.interval_seconds)
    }

    pub fn enrich_timeout(&self) -> Duration {
        Duration::from_secs(self.file.inference.timeout_seconds)
    }

    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.file.storage.db_path)
    }

    pub fn log_file(&self) -> Option<PathBuf> {
        self.file.logging.file.as_ref().map(PathBuf::from)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            request_timeout: Duration::from_secs(self.file.schedule.request_timeout_seconds),
            proxy: self.file.schedule.proxy.clone(),
            ..SessionConfig::default()
        }
    }

    pub fn collector_config(&self) -> CollectorConfig {
        let source = &self.file.source;
        CollectorConfig {
            base_url: source.base_url.clone(),
            api_key: self.secrets.crunchbase_api_key.clone(),
            page_size: source.page_size,
            retry_attempts: source.retry_attempts,
            retry_delay: Duration::from_secs(source.retry_delay_seconds),
            max_backoff: Duration::from_secs(source.max_backoff_seconds),
        }
    }

    pub fn enricher_config(&self) -> EnricherConfig {
        let inference = &self.file.inference;
        EnricherConfig {
            base_url: inference.base_url.clone(),
            api_key: self.secrets.openai_api_key.clone(),
            model: inference.model.clone(),
            temperature: inference.temperature,
            max_items: inference.max_items,
        }
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.file.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn secrets() -> Secrets {
        Secrets {
            openai_api_key: "sk-1".to_string(),
            crunchbase_api_key: "cb-1".to_string(),
        }
    }

    #[test]
    fn test_missing_secrets_are_all_reported() {
        let err = Secrets::from_lookup(|_| None).unwrap_err();
        match err {
            LeadError::MissingEnv { vars } => {
                assert_eq!(vars, vec![OPENAI_API_KEY, CRUNCHBASE_API_KEY]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_blank_secret_counts_as_missing() {
        let env: HashMap<&str, &str> = [(OPENAI_API_KEY, "sk"), (CRUNCHBASE_API_KEY, "  ")].into();
        let err = Secrets::from_lookup(|name| env.get(name).map(|v| v.to_string())).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing required environment variables: CRUNCHBASE_API_KEY"
        );
    }

    #[test]
    fn test_secrets_debug_is_redacted() {
        let debug = format!("{:?}", secrets());
        assert!(!debug.contains("sk-1"));
        assert!(!debug.contains("cb-1"));
    }

    #[test]
    fn test_cli_overrides_file_values() {
        let args = CliArgs {
            db_path: Some("/tmp/other.db".to_string()),
            bind: Some("0.0.0.0:9100".to_string()),
            ..CliArgs::default()
        };

        let config = AppConfig::load(&args, secrets()).unwrap();

        assert_eq!(config.db_path(), PathBuf::from("/tmp/other.db"));
        assert_eq!(config.file.bind_addr().unwrap().port(), 9100);
        assert_eq!(config.interval(), Duration::from_secs(4 * 60 * 60));
        assert_eq!(config.collector_config().api_key, "cb-1");
        assert_eq!(config.enricher_config().api_key, "sk-1");
    }

    #[test]
    fn test_invalid_override_fails_validation() {
        let args = CliArgs {
            bind: Some("nowhere".to_string()),
            ..CliArgs::default()
        };
        assert!(AppConfig::load(&args, secrets()).is_err());
    }
}
