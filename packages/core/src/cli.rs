use clap::{Parser, Subcommand};

use crate::lifecycle::config::DEFAULT_BACKFILL_VALIDITY_YEARS;

/// Tool Tracker CLI arguments
#[derive(Debug, Parser)]
#[command(
    name = "tool-tracker",
    version,
    about = "Lifting-tool inventory, inspections and expiry alerts"
)]
pub struct Cli {
    /// SQLite database URL (overrides DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Address the HTTP server binds to
    #[arg(long)]
    pub bind_addr: Option<String>,

    /// Usability percentage below which inspections raise an alert
    #[arg(long)]
    pub low_usability_threshold: Option<f64>,

    /// Days before expiry at which tools are flagged as expiring soon
    #[arg(long)]
    pub expiring_window_days: Option<i64>,

    /// Expiry audit interval in seconds
    #[arg(long)]
    pub audit_interval: Option<u64>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP API and the expiry audit loop (default)
    Serve,

    /// Fill in missing expiry dates for tools with a known supply date
    BackfillExpiry {
        /// Validity in years for tools that have none recorded
        #[arg(long, default_value_t = DEFAULT_BACKFILL_VALIDITY_YEARS)]
        default_validity: u32,
    },
}
