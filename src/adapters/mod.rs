// Adapters layer: concrete implementations of the domain ports for external systems.

pub mod crunchbase;
pub mod openai;
pub mod sqlite;

pub use crunchbase::{CollectorConfig, CrunchbaseCollector};
pub use openai::{EnricherConfig, OpenAiEnricher};
pub use sqlite::SqliteStore;
