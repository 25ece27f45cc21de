//! Logger initialisation for the binaries, demos and benches.
//!
//! The library itself only emits `log` records; whoever runs it decides where they go.
use chrono::Local;
use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, SharedLogger, TermLogger, TerminalMode, WriteLogger,
};
use std::fs::File;

/// parse a textual log level ("debug", "info", "warn", "error", "off")
pub fn parse_level(level: &str) -> Option<LevelFilter> {
    match level.trim().to_lowercase().as_str() {
        "trace" => Some(LevelFilter::Trace),
        "debug" => Some(LevelFilter::Debug),
        "info" => Some(LevelFilter::Info),
        "warn" => Some(LevelFilter::Warn),
        "error" => Some(LevelFilter::Error),
        "off" | "none" => Some(LevelFilter::Off),
        _ => None,
    }
}

/// log file name stamped with the current local time: `log_YYYY-MM-DD_HH-MM-SS.txt`
pub fn default_log_file_name() -> String {
    let date_and_time = Local::now().format("%Y-%m-%d_%H-%M-%S");
    format!("log_{}.txt", date_and_time)
}

/// Installs a terminal logger and, if `log_file` is given, a file logger with the same level.
///
/// A second call is a no-op (the global logger can only be set once), so tests and demos may
/// call it freely.
pub fn init_logger(level: LevelFilter, log_file: Option<&str>) {
    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    loggers.push(TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ));
    if let Some(filename) = log_file {
        if let Ok(file) = File::create(filename) {
            loggers.push(WriteLogger::new(level, Config::default(), file));
        }
    }
    let _ = CombinedLogger::init(loggers);
}
