//! Command-line interface for error-overlay.
//!
//! `error-overlay resolve <FILE>` reads a captured failure (a JSON error
//! object or a raw stack trace), resolves its frames through source maps, and
//! prints the overlay as text.

use crate::capture::AmbientFailureHub;
use crate::controller::OverlayController;
use crate::failure::{FailureOrigin, FailurePayload};
use crate::view::TextView;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use error_overlay_config::OverlayConfig;
use error_overlay_resolve::{ArtifactCache, HttpFetcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

/// error-overlay - inspect runtime failures with source-mapped stack frames
#[derive(Parser)]
#[command(name = "error-overlay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file to use instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log level for the debug log file
    #[arg(long, global = true, value_enum)]
    pub log_level: Option<LogLevelArg>,
}

/// Log level argument for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevelArg {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevelArg {
    /// Convert to `log::LevelFilter`
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevelArg::Off => log::LevelFilter::Off,
            LogLevelArg::Error => log::LevelFilter::Error,
            LogLevelArg::Warn => log::LevelFilter::Warn,
            LogLevelArg::Info => log::LevelFilter::Info,
            LogLevelArg::Debug => log::LevelFilter::Debug,
            LogLevelArg::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve and print the stack frames of a captured failure
    Resolve {
        /// JSON error object (`{"name", "message", "stack"}`) or raw stack text
        file: PathBuf,

        /// Show frames at their compiled positions
        #[arg(long)]
        compiled: bool,

        /// Give up waiting for artifact fetches after this many seconds
        #[arg(long, value_name = "SECONDS", default_value_t = 30)]
        timeout_secs: u64,
    },
}

/// Load the config named on the command line, or the default one.
pub fn load_config(cli: &Cli) -> Result<OverlayConfig> {
    match &cli.config {
        Some(path) => OverlayConfig::load_from(path),
        None => OverlayConfig::load(),
    }
}

pub fn run(cli: &Cli, config: &OverlayConfig) -> Result<()> {
    match &cli.command {
        Commands::Resolve {
            file,
            compiled,
            timeout_secs,
        } => run_resolve(config, file, *compiled, Duration::from_secs(*timeout_secs)),
    }
}

/// Interpret input text as a failure payload.
///
/// Valid JSON is taken as the thrown value. Anything else is a stack trace
/// whose first line is `Name: message`.
pub fn parse_input(text: &str) -> FailurePayload {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(text) {
        return FailurePayload::from_json(value);
    }

    let text = text.trim_end();
    let first = text.lines().next().unwrap_or_default().trim();
    let (name, message) = match first.split_once(": ") {
        Some((name, message)) if !name.is_empty() && !name.contains(char::is_whitespace) => {
            (name, message)
        }
        _ => ("Error", first),
    };
    FailurePayload::error(name, message).with_stack(text)
}

fn run_resolve(
    config: &OverlayConfig,
    file: &Path,
    compiled: bool,
    timeout: Duration,
) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read failure from {file:?}"))?;
    let payload = parse_input(&text);

    let runtime = Runtime::new().context("Failed to start tokio runtime")?;
    let fetcher = Arc::new(HttpFetcher::new(config.fetch.clone()));
    let cache = Arc::new(ArtifactCache::new(fetcher));

    let mut controller = {
        let mut config = config.clone();
        config.capture_panics = false;
        OverlayController::new(&config, runtime.handle().clone(), cache, AmbientFailureHub::new())
    };
    controller.mount();
    if compiled != controller.is_compiled() {
        controller.toggle_compiled_mode();
    }
    controller.push_failure(payload, FailureOrigin::Ambient);

    // Requests resolution for every frame.
    controller.current_frames();
    if !controller.wait_settled(timeout) {
        log::warn!(
            "{} frame(s) still unresolved after {:?}",
            controller.resolver().pending_count(),
            timeout
        );
    }

    let mut view = TextView::new(std::io::stdout().lock());
    controller.render(&mut view);
    view.finish().context("Failed to write overlay")?;

    controller.unmount();
    drop(controller);
    runtime.shutdown_timeout(Duration::from_secs(2));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_error() {
        let payload = parse_input(r#"{"name":"TypeError","message":"x is undefined","stack":"TypeError: x is undefined\n    at f (a.js:1:2)"}"#);
        let error = payload.as_error().unwrap();
        assert_eq!(error.name, "TypeError");
        assert_eq!(error.message, "x is undefined");
        assert!(payload.stack().unwrap().contains("a.js:1:2"));
    }

    #[test]
    fn test_parse_stack_text() {
        let payload = parse_input("RangeError: too deep\n    at f (http://h/a.js:3:9)\n");
        let error = payload.as_error().unwrap();
        assert_eq!(error.name, "RangeError");
        assert_eq!(error.message, "too deep");
        assert_eq!(
            payload.stack(),
            Some("RangeError: too deep\n    at f (http://h/a.js:3:9)")
        );
    }

    #[test]
    fn test_parse_headerless_stack() {
        let payload = parse_input("something went wrong here");
        let error = payload.as_error().unwrap();
        assert_eq!(error.name, "Error");
        assert_eq!(error.message, "something went wrong here");
    }

    #[test]
    fn test_cli_parses_resolve() {
        let cli = Cli::try_parse_from([
            "error-overlay",
            "--log-level",
            "debug",
            "resolve",
            "failure.json",
            "--compiled",
        ])
        .unwrap();
        assert_eq!(cli.log_level, Some(LogLevelArg::Debug));
        let Commands::Resolve {
            file,
            compiled,
            timeout_secs,
        } = cli.command;
        assert_eq!(file, PathBuf::from("failure.json"));
        assert!(compiled);
        assert_eq!(timeout_secs, 30);
    }

    #[test]
    fn test_load_config_from_flag() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("overlay.yaml");
        std::fs::write(&path, "start_compiled: true\nexcerpt:\n  context_before: 2\n").unwrap();

        let cli = Cli::try_parse_from([
            "error-overlay",
            "--config",
            path.to_str().unwrap(),
            "resolve",
            "failure.txt",
        ])
        .unwrap();
        let config = load_config(&cli).unwrap();
        assert!(config.start_compiled);
        assert_eq!(config.excerpt.context_before, 2);
        assert_eq!(config.excerpt.context_after, 4);
    }
}
