use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LeadError {
    #[error("Missing required environment variables: {}", vars.join(", "))]
    MissingEnv { vars: Vec<String> },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Failed to open outbound session: {message}")]
    SessionUnavailable { message: String },

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Upstream returned status {status}: {message}")]
    UpstreamStatus { status: u16, message: String },

    #[error("Rate limited by upstream after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("Inference quota exhausted (status {status})")]
    Quota { status: u16 },

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Migration v{version} failed: {source}")]
    Migration {
        version: u32,
        #[source]
        source: sqlx::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Absorbed into statistics; the cycle carries on.
    Medium,
    /// Surfaced to a caller (storage, malformed data).
    High,
    /// Aborts the cycle or the process.
    Critical,
}

impl LeadError {
    pub fn malformed(message: impl Into<String>) -> Self {
        LeadError::MalformedResponse {
            message: message.into(),
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            LeadError::MissingEnv { .. }
            | LeadError::InvalidConfigValue { .. }
            | LeadError::Config { .. }
            | LeadError::SessionUnavailable { .. }
            | LeadError::Migration { .. } => ErrorSeverity::Critical,
            LeadError::Transport(_)
            | LeadError::UpstreamStatus { .. }
            | LeadError::RateLimited { .. }
            | LeadError::Quota { .. }
            | LeadError::Timeout(_) => ErrorSeverity::Medium,
            LeadError::MalformedResponse { .. }
            | LeadError::Storage(_)
            | LeadError::Io(_)
            | LeadError::Serialization(_) => ErrorSeverity::High,
        }
    }

    /// Fatal errors cross the cycle boundary; everything else is absorbed.
    pub fn is_fatal(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LeadError::Transport(_)
                | LeadError::UpstreamStatus { .. }
                | LeadError::RateLimited { .. }
                | LeadError::Timeout(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, LeadError>;
