// Logger setup for embedders of the library.
use crate::config::Config;
use crate::context::AppContext;
use anyhow::{Context, Result};
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};
use std::fs::OpenOptions;

/// Installs the global logger: stderr always, plus `daybook.log` in the data
/// directory when `log_to_file` is set. Fails if a logger is already installed.
pub fn init(ctx: &dyn AppContext, config: &Config) -> Result<()> {
    let level = config.level_filter();
    let log_config = ConfigBuilder::new()
        .set_target_level(log::LevelFilter::Error)
        .build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        log_config.clone(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];

    if config.log_to_file
        && let Some(path) = ctx.get_log_file_path()
    {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {:?}", path))?;
        loggers.push(WriteLogger::new(level, log_config, file));
    }

    CombinedLogger::init(loggers).context("Logger already initialized")?;
    log::debug!("Logging initialized at {}", level);
    Ok(())
}
