//! Logging backend
//!
//! Library code logs through the `log` facade. The binary installs
//! [`StderrLogger`] at the level picked in [`Options`](crate::config::Options);
//! the `log_*!` macros are shorthands for driver messages.

use std::fmt;
use std::str::FromStr;

use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use serde::{Deserialize, Serialize};

/// Verbosity levels, from silent to everything
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Nothing = 0,
    User = 1,
    Error = 2,
    #[default]
    Warning = 3,
    Info = 4,
    Debug = 5,
    All = 6,
}

impl LogLevel {
    /// Create a LogLevel from an integer; out-of-range values mean Info
    pub fn from_i32(level: i32) -> Self {
        match level {
            0 => LogLevel::Nothing,
            1 => LogLevel::User,
            2 => LogLevel::Error,
            3 => LogLevel::Warning,
            4 => LogLevel::Info,
            5 => LogLevel::Debug,
            6 => LogLevel::All,
            _ => LogLevel::Info,
        }
    }

    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    pub fn level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Nothing => LevelFilter::Off,
            LogLevel::User | LogLevel::Error => LevelFilter::Error,
            LogLevel::Warning => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::All => LevelFilter::Trace,
        }
    }

    /// `log` level a message at this level is emitted with
    pub fn record_level(self) -> Option<Level> {
        match self {
            LogLevel::Nothing => None,
            LogLevel::User | LogLevel::Error => Some(Level::Error),
            LogLevel::Warning => Some(Level::Warn),
            LogLevel::Info => Some(Level::Info),
            LogLevel::Debug => Some(Level::Debug),
            LogLevel::All => Some(Level::Trace),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Nothing => "nothing",
            LogLevel::User => "user",
            LogLevel::Error => "error",
            LogLevel::Warning => "warning",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::All => "all",
        };
        f.write_str(name)
    }
}

/// Unrecognized log level name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown log level: {0}")]
pub struct ParseLogLevelError(pub String);

impl FromStr for LogLevel {
    type Err = ParseLogLevelError;

    /// Accepts a level name (`warn` and `trace` as aliases) or its number
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(n) = s.trim().parse::<i32>() {
            if (0..=6).contains(&n) {
                return Ok(LogLevel::from_i32(n));
            }
            return Err(ParseLogLevelError(s.to_string()));
        }
        match s.trim().to_lowercase().as_str() {
            "nothing" | "off" | "none" => Ok(LogLevel::Nothing),
            "user" => Ok(LogLevel::User),
            "error" => Ok(LogLevel::Error),
            "warning" | "warn" => Ok(LogLevel::Warning),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "all" | "trace" => Ok(LogLevel::All),
            _ => Err(ParseLogLevelError(s.to_string())),
        }
    }
}

/// Writes `[Level] message` lines to stderr
#[derive(Debug)]
pub struct StderrLogger {
    filter: LevelFilter,
}

impl StderrLogger {
    pub fn new(level: LogLevel) -> Self {
        Self {
            filter: level.level_filter(),
        }
    }
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.filter
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

/// Install the stderr logger; fails if a logger is already set
pub fn init(level: LogLevel) -> Result<(), SetLoggerError> {
    log::set_boxed_logger(Box::new(StderrLogger::new(level)))?;
    log::set_max_level(level.level_filter());
    Ok(())
}

/// Emit `message` at `level` through the `log` facade
pub fn log_add(level: LogLevel, message: &str) {
    if let Some(level) = level.record_level() {
        log::log!(target: "deskmate", level, "{}", message);
    }
}

/// Convenience macro for errors
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::logging::log_add($crate::logging::LogLevel::Error, &format!($($arg)*))
    };
}

/// Convenience macro for warnings
#[macro_export]
macro_rules! log_warning {
    ($($arg:tt)*) => {
        $crate::logging::log_add($crate::logging::LogLevel::Warning, &format!($($arg)*))
    };
}

/// Convenience macro for info messages
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logging::log_add($crate::logging::LogLevel::Info, &format!($($arg)*))
    };
}

/// Convenience macro for debug messages
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::logging::log_add($crate::logging::LogLevel::Debug, &format!($($arg)*))
    };
}
