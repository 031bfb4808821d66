pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;
pub mod session;

use anyhow::{Context, Result};

pub use lifeos_core::AppConfig;
pub use session::Session;

/// Run one command to completion on a fresh multi-threaded runtime, printing to stdout.
pub fn run(cli: cli::Cli) -> Result<()> {
    let config = config::from_cli(&cli)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    runtime.block_on(async move {
        let session = if cli.offline {
            Session::offline(&config)?
        } else {
            Session::connect(&config)?
        };
        tracing::debug!(api_url = config.api_url(), offline = cli.offline, "session ready");
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        commands::execute(&session, cli.command, &mut handle).await
    })
}
