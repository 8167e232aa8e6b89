use crate::adapters::{crunchbase, openai};
use crate::utils::error::{LeadError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

pub const DEFAULT_CATEGORIES: [&str; 6] = [
    "software",
    "ecommerce",
    "healthcare",
    "fintech",
    "ai",
    "cybersecurity",
];

/// Settings read from the optional TOML file. Every field has a default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub source: SourceSection,
    pub inference: InferenceSection,
    pub schedule: ScheduleSection,
    pub storage: StorageSection,
    pub server: ServerSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSection {
    pub base_url: String,
    pub page_size: usize,
    pub retry_attempts: u32,
    pub retry_delay_seconds: u64,
    pub max_backoff_seconds: u64,
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            base_url: crunchbase::DEFAULT_BASE_URL.to_string(),
            page_size: 25,
            retry_attempts: 3,
            retry_delay_seconds: 2,
            max_backoff_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceSection {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
    pub max_items: usize,
}

impl Default for InferenceSection {
    fn default() -> Self {
        Self {
            base_url: openai::DEFAULT_BASE_URL.to_string(),
            model: openai::DEFAULT_MODEL.to_string(),
            temperature: 0.2,
            timeout_seconds: 30,
            max_items: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSection {
    pub categories: Vec<String>,
    pub interval_seconds: u64,
    pub request_timeout_seconds: u64,
    pub proxy: Option<String>,
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            categories: DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            interval_seconds: 4 * 60 * 60,
            request_timeout_seconds: 60,
            proxy: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub db_path: String,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            db_path: "leads.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub file: Option<String>,
    pub json: bool,
}

impl FileConfig {
    /// Loads the configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// Parses the configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| LeadError::Config {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` placeholders with environment values; unset ones are left as-is.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| LeadError::Config {
            message: format!("placeholder pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server
            .bind
            .parse()
            .map_err(|e| LeadError::InvalidConfigValue {
                field: "server.bind".to_string(),
                value: self.server.bind.clone(),
                reason: format!("{}", e),
            })
    }
}

impl Validate for FileConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("source.base_url", &self.source.base_url)?;
        validation::validate_range("source.page_size", self.source.page_size, 1, 1000)?;
        validation::validate_range("source.retry_attempts", self.source.retry_attempts, 0, 10)?;
        validation::validate_range(
            "source.max_backoff_seconds",
            self.source.max_backoff_seconds,
            1,
            3600,
        )?;

        validation::validate_url("inference.base_url", &self.inference.base_url)?;
        validation::validate_non_empty_string("inference.model", &self.inference.model)?;
        validation::validate_range("inference.temperature", self.inference.temperature, 0.0, 2.0)?;
        validation::validate_range("inference.timeout_seconds", self.inference.timeout_seconds, 1, 600)?;
        validation::validate_range("inference.max_items", self.inference.max_items, 1, 50)?;

        validation::validate_categories("schedule.categories", &self.schedule.categories)?;
        validation::validate_range(
            "schedule.interval_seconds",
            self.schedule.interval_seconds,
            1,
            u64::MAX,
        )?;
        validation::validate_range(
            "schedule.request_timeout_seconds",
            self.schedule.request_timeout_seconds,
            1,
            600,
        )?;
        if let Some(proxy) = &self.schedule.proxy {
            validation::validate_url("schedule.proxy", proxy)?;
        }

        validation::validate_path("storage.db_path", &self.storage.db_path)?;
        if let Some(file) = &self.logging.file {
            validation::validate_path("logging.file", file)?;
        }
        self.bind_addr()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = FileConfig::from_toml_str("").unwrap();

        assert_eq!(config.schedule.categories.len(), 6);
        assert_eq!(config.schedule.categories[0], "software");
        assert_eq!(config.schedule.interval_seconds, 14_400);
        assert_eq!(config.storage.db_path, "leads.db");
        assert_eq!(config.bind_addr().unwrap().port(), 8000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_sections() {
        let toml_content = r#"
[source]
base_url = "https://cb.example.com/api/v4"
page_size = 10

[inference]
model = "gpt-4o"
timeout_seconds = 15

[schedule]
categories = ["software", "ai"]
interval_seconds = 60

[logging]
file = "lead_automation.log"
"#;

        let config = FileConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.source.base_url, "https://cb.example.com/api/v4");
        assert_eq!(config.source.page_size, 10);
        assert_eq!(config.source.retry_attempts, 3);
        assert_eq!(config.inference.model, "gpt-4o");
        assert_eq!(config.schedule.categories, vec!["software", "ai"]);
        assert_eq!(config.logging.file.as_deref(), Some("lead_automation.log"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("LEAD_TEST_SOURCE_BASE", "https://source.test");

        let toml_content = r#"
[source]
base_url = "${LEAD_TEST_SOURCE_BASE}"
"#;

        let config = FileConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.source.base_url, "https://source.test");

        std::env::remove_var("LEAD_TEST_SOURCE_BASE");
    }

    #[test]
    fn test_config_validation() {
        let bad_url = FileConfig::from_toml_str("[source]\nbase_url = \"invalid-url\"\n").unwrap();
        assert!(bad_url.validate().is_err());

        let no_categories = FileConfig::from_toml_str("[schedule]\ncategories = []\n").unwrap();
        assert!(no_categories.validate().is_err());

        let zero_interval =
            FileConfig::from_toml_str("[schedule]\ninterval_seconds = 0\n").unwrap();
        assert!(zero_interval.validate().is_err());

        let bad_bind = FileConfig::from_toml_str("[server]\nbind = \"localhost\"\n").unwrap();
        assert!(bad_bind.validate().is_err());
    }

    #[test]
    fn test_inference_list_cap_must_be_positive() {
        let zero_items = FileConfig::from_toml_str("[inference]\nmax_items = 0\n").unwrap();
        let err = zero_items.validate().unwrap_err();
        assert!(err.to_string().contains("inference.max_items"));

        let many_items = FileConfig::from_toml_str("[inference]\nmax_items = 51\n").unwrap();
        assert!(many_items.validate().is_err());
    }

    #[test]
    fn test_source_backoff_cap_bounds() {
        let config = FileConfig::from_toml_str("").unwrap();
        assert_eq!(config.source.max_backoff_seconds, 60);

        let zero_cap = FileConfig::from_toml_str("[source]\nmax_backoff_seconds = 0\n").unwrap();
        assert!(zero_cap.validate().is_err());

        let day_cap =
            FileConfig::from_toml_str("[source]\nmax_backoff_seconds = 86400\n").unwrap();
        assert!(day_cap.validate().is_err());
    }

    #[test]
    fn test_unparsable_toml_is_config_error() {
        let err = FileConfig::from_toml_str("[source\nbase_url = 1").unwrap_err();
        assert!(matches!(err, LeadError::Config { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[storage]\ndb_path = \"/tmp/custom-leads.db\"\n")
            .unwrap();

        let config = FileConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.storage.db_path, "/tmp/custom-leads.db");
    }
}
