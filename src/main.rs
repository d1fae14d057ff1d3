//! `garden` CLI entry point.
//!
//! This binary is a thin shim over [`garden_core::cli`] — see that
//! module's docs for why it is not itself the deliverable. It exists so
//! the Config->Graph->Solver pipeline can be exercised from a terminal.

use clap::Parser;
use garden_core::cli::Cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let log_config = cli.log_config();

    // Rules: RUST_LOG always wins when set; otherwise --verbose maps to
    // debug; otherwise logging is off by default.
    let rust_log_exists = std::env::var("RUST_LOG").is_ok();
    let filter = if rust_log_exists {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error"))
    } else if log_config.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("off")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    if let Err(err) = cli.execute().await {
        let ctx = garden_core::core::error::user_friendly_error(err.into());
        ctx.display();
        std::process::exit(1);
    }
}
