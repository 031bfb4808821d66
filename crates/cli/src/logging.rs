use anyhow::Result;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` refines the default directive; repeated
/// calls are harmless.
pub fn init_tracing(filter: Option<&str>) -> Result<()> {
    let directive: Directive = filter.unwrap_or("warn").parse()?;
    let env_filter = EnvFilter::builder()
        .with_default_directive(directive)
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
    Ok(())
}
