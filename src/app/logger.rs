use std::fs::{File, OpenOptions};
use std::io::Write;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::{Error, Result};

pub const ENV_LOG_LEVEL: &str = "CRISTALLIQ_LOG_LEVEL";
pub const ENV_LOG_PATH: &str = "CRISTALLIQ_LOG_PATH";

/// Log verbosity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    #[default]
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl FromStr for LogLevel {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(Error::InvalidArgs(format!("unknown log level '{other}'"))),
        }
    }
}

/// Leveled stderr logger with an optional append-only file copy.
pub struct Logger {
    level: LogLevel,
    file: Option<File>,
}

impl Logger {
    /// Environment variables win over the arguments.
    pub fn new(level: LogLevel, file_path: Option<String>) -> Result<Self> {
        let env_level = std::env::var(ENV_LOG_LEVEL)
            .ok()
            .and_then(|s| LogLevel::from_str(&s).ok());
        let path = std::env::var(ENV_LOG_PATH).ok().or(file_path);
        let file = match path {
            Some(p) => Some(OpenOptions::new().create(true).append(true).open(p)?),
            None => None,
        };
        Ok(Self {
            level: env_level.unwrap_or(level),
            file,
        })
    }

    /// Logger that drops everything above `level` and never touches the environment.
    pub fn stderr(level: LogLevel) -> Self {
        Self { level, file: None }
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level <= self.level
    }

    pub fn log(&self, level: LogLevel, msg: impl AsRef<str>) {
        if !self.enabled(level) {
            return;
        }
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        let line = format!("[{ts:.3}] [{level:?}] {}", msg.as_ref());
        eprintln!("{line}");
        if let Some(mut file) = self.file.as_ref() {
            let _ = writeln!(file, "{line}");
        }
    }

    pub fn error(&self, msg: impl AsRef<str>) {
        self.log(LogLevel::Error, msg);
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        self.log(LogLevel::Warn, msg);
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        self.log(LogLevel::Info, msg);
    }

    pub fn debug(&self, msg: impl AsRef<str>) {
        self.log(LogLevel::Debug, msg);
    }

    pub fn trace(&self, msg: impl AsRef<str>) {
        self.log(LogLevel::Trace, msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_level_names() {
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!(" trace ".parse::<LogLevel>().unwrap(), LogLevel::Trace);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn level_filters_messages() {
        let logger = Logger::stderr(LogLevel::Warn);
        assert!(logger.enabled(LogLevel::Error));
        assert!(logger.enabled(LogLevel::Warn));
        assert!(!logger.enabled(LogLevel::Info));
    }

    #[test]
    fn file_sink_receives_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cristalliq.log");
        let mut logger = Logger::stderr(LogLevel::Debug);
        logger.file = Some(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .unwrap(),
        );
        logger.debug("frame dispatched");
        logger.trace("hidden");
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[Debug] frame dispatched"));
        assert!(!contents.contains("hidden"));
    }
}
