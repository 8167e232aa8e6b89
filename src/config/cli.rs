use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Parser)]
#[command(name = "lead-automation")]
#[command(about = "Collects company leads, enriches them with SEO signals and serves run statistics")]
pub struct CliArgs {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "LEAD_AUTOMATION_CONFIG")]
    pub config: Option<PathBuf>,

    /// SQLite database path (overrides storage.db_path)
    #[arg(long)]
    pub db_path: Option<String>,

    /// Monitoring API bind address (overrides server.bind)
    #[arg(long)]
    pub bind: Option<String>,

    /// Run a single cycle and exit instead of scheduling
    #[arg(long)]
    pub once: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}
