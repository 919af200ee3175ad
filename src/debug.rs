//! Debug log bridge.
//!
//! Routes every `log::*!` call in the process (overlay crates included) to
//! `<temp>/error_overlay_debug.log`, so diagnostics never interleave with the
//! overlay's own output. When `RUST_LOG` is set, lines are mirrored to stderr.
//!
//! Level precedence: `--log-level`, then `DEBUG_LEVEL` (0-4), then
//! `RUST_LOG`, then the config file's `log_level`, then `warn`.

use chrono::Local;
use log::{LevelFilter, Log, Metadata, Record};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

struct LogBridge {
    file: Mutex<Option<File>>,
    opened: AtomicBool,
    mirror_stderr: bool,
}

impl LogBridge {
    fn write_line(&self, line: &str) {
        let mut file = self.file.lock();
        if !self.opened.swap(true, Ordering::AcqRel) {
            *file = open_log_file();
        }
        if let Some(f) = file.as_mut() {
            let _ = f.write_all(line.as_bytes());
            let _ = f.flush();
        }
    }
}

impl Log for LogBridge {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!(
            "[{}] [{:<5}] [{}] {}\n",
            Local::now().format("%H:%M:%S%.6f"),
            record.level(),
            record.target(),
            record.args()
        );
        self.write_line(&line);
        if self.mirror_stderr {
            eprint!("{line}");
        }
    }

    fn flush(&self) {
        if let Some(f) = self.file.lock().as_mut() {
            let _ = f.flush();
        }
    }
}

static BRIDGE: OnceLock<LogBridge> = OnceLock::new();
static EXPLICIT_LEVEL: AtomicBool = AtomicBool::new(false);

/// Path of the debug log file.
pub fn log_path() -> PathBuf {
    std::env::temp_dir().join("error_overlay_debug.log")
}

fn open_log_file() -> Option<File> {
    let path = log_path();
    let mut file = OpenOptions::new()
        .write(true)
        .truncate(true)
        .create(true)
        .open(&path)
        .ok()?;
    let rule = "=".repeat(80);
    let _ = writeln!(
        file,
        "{rule}\nerror-overlay debug session started at {}\n{rule}",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    Some(file)
}

fn level_from_debug_level(value: &str) -> Option<LevelFilter> {
    match value.trim().parse::<u8>().ok()? {
        0 => Some(LevelFilter::Off),
        1 => Some(LevelFilter::Error),
        2 => Some(LevelFilter::Info),
        3 => Some(LevelFilter::Debug),
        4 => Some(LevelFilter::Trace),
        _ => None,
    }
}

fn level_from_env() -> Option<LevelFilter> {
    if let Ok(value) = std::env::var("DEBUG_LEVEL")
        && let Some(level) = level_from_debug_level(&value)
    {
        return Some(level);
    }
    // Only a bare level is understood; per-target directives fall back to debug.
    std::env::var("RUST_LOG")
        .ok()
        .map(|value| value.trim().parse().unwrap_or(LevelFilter::Debug))
}

/// Install the bridge as the global logger. Later calls are no-ops.
pub fn init_log_bridge(level_override: Option<LevelFilter>) {
    let env_level = level_from_env();
    let explicit = level_override.or(env_level);
    let level = explicit.unwrap_or(LevelFilter::Warn);

    let bridge = BRIDGE.get_or_init(|| LogBridge {
        file: Mutex::new(None),
        opened: AtomicBool::new(false),
        mirror_stderr: std::env::var_os("RUST_LOG").is_some(),
    });

    if log::set_logger(bridge).is_ok() {
        EXPLICIT_LEVEL.store(explicit.is_some(), Ordering::Release);
        log::set_max_level(level);
    }
}

/// Apply the config file's level unless the CLI or environment chose one.
pub fn apply_config_level(level: LevelFilter) {
    if !EXPLICIT_LEVEL.load(Ordering::Acquire) {
        log::set_max_level(level);
    }
}
