//! Logger setup for the gallery binary.
//!
//! Always logs to the terminal; `GALLERY_LOG_FILE` additionally writes
//! `./gallery.log` in the current working directory.

use std::fs::File;
use std::path::PathBuf;

use gallery_logging::parse_level;
use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

pub const ENV_LOG_LEVEL: &str = "GALLERY_LOG";
pub const ENV_LOG_FILE: &str = "GALLERY_LOG_FILE";

/// Destination for log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogDestination {
    /// Write to terminal (stderr for warnings and errors).
    Terminal,
    /// Write to terminal and ./gallery.log.
    Both,
}

impl LogDestination {
    pub fn from_flag(raw: Option<&str>) -> Self {
        match raw.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("1" | "true" | "yes" | "on") => LogDestination::Both,
            _ => LogDestination::Terminal,
        }
    }
}

/// Level from `GALLERY_LOG`, `info` when unset or unrecognised.
pub fn level_from(raw: Option<&str>) -> LevelFilter {
    raw.and_then(parse_level).unwrap_or(LevelFilter::Info)
}

pub fn initialize_from_env() {
    let level = level_from(std::env::var(ENV_LOG_LEVEL).ok().as_deref());
    let destination = LogDestination::from_flag(std::env::var(ENV_LOG_FILE).ok().as_deref());
    initialize(level, destination);
}

pub fn initialize(level: LevelFilter, destination: LogDestination) {
    let config = build_config();
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        config.clone(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if destination == LogDestination::Both {
        if let Some(file_logger) = create_file_logger(level, config) {
            loggers.push(file_logger);
        }
    }

    let _ = CombinedLogger::init(loggers);
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        // Keep dependency chatter (hyper, rustls, tungstenite) out of the log.
        .add_filter_allow_str("gallery")
        .build()
}

fn create_file_logger(level: LevelFilter, config: Config) -> Option<Box<WriteLogger<File>>> {
    let log_path = PathBuf::from("./gallery.log");
    match File::create(&log_path) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("Warning: Could not create log file at {:?}: {}", log_path, err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{level_from, LogDestination};
    use log::LevelFilter;

    #[test]
    fn level_defaults_to_info() {
        assert_eq!(level_from(None), LevelFilter::Info);
        assert_eq!(level_from(Some("loud")), LevelFilter::Info);
        assert_eq!(level_from(Some("debug")), LevelFilter::Debug);
    }

    #[test]
    fn file_logging_is_opt_in() {
        assert_eq!(LogDestination::from_flag(None), LogDestination::Terminal);
        assert_eq!(LogDestination::from_flag(Some("0")), LogDestination::Terminal);
        assert_eq!(LogDestination::from_flag(Some(" TRUE ")), LogDestination::Both);
    }
}
