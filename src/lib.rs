pub mod adapters;
pub mod api;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::{AppConfig, CliArgs, Secrets};
pub use core::cycle::{CycleOutcome, CycleReport, CycleRunner};
pub use core::scheduler::{Scheduler, SchedulerExit};
pub use core::session::{ResourceSession, SessionConfig};
pub use core::stats::{RunStats, StatsSnapshot};
pub use utils::error::{LeadError, Result};
