//! Common utilities for all binaries
//!
//! Shared CLI parsing and logging setup.

use clap::Parser;

/// Common CLI arguments for all binaries
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct CommonArgs {
    /// Security ID to trade
    #[arg(short, long, default_value = "1")]
    pub security_id: u64,

    /// Log level
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Emit JSON logs
    #[arg(long)]
    pub json_logs: bool,
}

/// Initialize tracing/logging
pub fn init_logging(args: &CommonArgs) {
    myr_core::utils::init_logger(&args.log_level, args.json_logs);
}
