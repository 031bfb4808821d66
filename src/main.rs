use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = lifeos::cli::Cli::parse();
    lifeos::logging::init_tracing(cli.log_filter.as_deref())?;
    lifeos::run(cli)
}
