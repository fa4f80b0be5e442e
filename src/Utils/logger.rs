use crate::Utils::config::ConfigError;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use simplelog::{
    ColorChoice, CombinedLogger, Config, SharedLogger, TermLogger, TerminalMode, WriteLogger,
};
use std::fs::File;
use std::str::FromStr;

/// Where and how verbosely the burner logs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// "off", "error", "warn", "info", "debug" or "trace"
    pub level: String,
    pub log_to_console: bool,
    pub log_to_file: Option<String>,
}

impl Default for LogSettings {
    fn default() -> Self {
        LogSettings {
            level: "info".to_string(),
            log_to_console: true,
            log_to_file: None,
        }
    }
}

impl LogSettings {
    pub fn level_filter(&self) -> Result<LevelFilter, ConfigError> {
        LevelFilter::from_str(&self.level)
            .map_err(|_| ConfigError::Invalid(format!("unknown log level '{}'", self.level)))
    }
}

/// Sets up a console and/or file logger. A logger that is already installed stays in
/// place, so calling this more than once is harmless.
pub fn init_logger(settings: &LogSettings) -> Result<(), ConfigError> {
    let level = settings.level_filter()?;
    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();

    // Console logger
    if settings.log_to_console {
        loggers.push(TermLogger::new(
            level,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ));
    }

    // File logger
    if let Some(ref filename) = settings.log_to_file {
        let file = File::create(filename)?;
        loggers.push(WriteLogger::new(level, Config::default(), file));
    }

    if !loggers.is_empty() {
        let _ = CombinedLogger::init(loggers);
    }
    Ok(())
}
