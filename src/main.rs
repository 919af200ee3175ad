use anyhow::Result;
use clap::Parser;
use error_overlay::cli::{self, Cli};
use error_overlay::debug;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // CLI --log-level takes precedence, then DEBUG_LEVEL / RUST_LOG, then config.
    debug::init_log_bridge(cli.log_level.map(|l| l.to_level_filter()));
    log::info!("Starting error-overlay");

    let config = cli::load_config(&cli)?;
    if let Some(level) = config.log_level {
        debug::apply_config_level(level.to_level_filter());
    }

    let result = cli::run(&cli, &config);
    if let Err(ref e) = result {
        log::error!("error-overlay failed: {e:#}");
    }
    result
}
