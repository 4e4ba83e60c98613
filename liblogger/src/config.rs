/*
 * Configuration for liblogger
 *
 * Parses the [logging] table of the host configuration file and exposes
 * the severity threshold, the output destination and the file rotation
 * settings. Level and type names are accepted case-insensitively.
 */

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Log severity levels, ordered from most to least verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        LogLevel::parse(&s).ok_or_else(|| {
            serde::de::Error::unknown_variant(&s, &["debug", "info", "warn", "warning", "error"])
        })
    }
}

impl LogLevel {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

/// Where log lines are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LogType {
    /// stderr; stdout is left to the program's own output.
    Console,
    File,
}

impl<'de> Deserialize<'de> for LogType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.to_lowercase().as_str() {
            "console" => Ok(LogType::Console),
            "file" => Ok(LogType::File),
            _ => Err(serde::de::Error::unknown_variant(&s, &["console", "file"])),
        }
    }
}

/// Configuration for the logger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Type of output (console, file)
    #[serde(rename = "type", default = "default_log_type")]
    pub log_type: LogType,

    /// Minimum log level to record
    #[serde(default = "default_threshold")]
    pub threshold: LogLevel,

    /// File name for file-based logging
    #[serde(default)]
    pub file_path: Option<String>,

    /// Folder the log file lives in
    #[serde(default)]
    pub log_folder: Option<String>,

    /// Maximum file size before rotation (in MB)
    #[serde(default)]
    pub max_file_size_mb: Option<u64>,

    /// Hand lines to a background worker instead of writing inline
    #[serde(default)]
    pub async_logging: bool,

    /// Flush after every write
    #[serde(default)]
    pub force_flush: bool,
}

fn default_log_type() -> LogType {
    LogType::Console
}

fn default_threshold() -> LogLevel {
    LogLevel::Info
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            log_type: LogType::Console,
            threshold: LogLevel::Info,
            file_path: None,
            log_folder: None,
            max_file_size_mb: None,
            async_logging: false,
            force_flush: false,
        }
    }
}

impl LogConfig {
    /// Reads the `[logging]` table from a TOML file.
    ///
    /// A missing file yields the default configuration; a malformed one is an error.
    pub fn from_file(file_path: &str) -> Result<Self, String> {
        let config_str = match fs::read_to_string(file_path) {
            Ok(content) => content,
            Err(e) => {
                eprintln!(
                    "Warning: Could not read config file '{}': {}. Using defaults.",
                    file_path, e
                );
                return Ok(LogConfig::default());
            }
        };
        Self::from_toml_str(&config_str)
    }

    /// Parses either a document with a `[logging]` table or a bare logging table.
    pub fn from_toml_str(config_str: &str) -> Result<Self, String> {
        let mut document: toml::Table =
            toml::from_str(config_str).map_err(|e| format!("Failed to parse config file: {}", e))?;
        let section = match document.remove("logging") {
            Some(section) => section,
            None => toml::Value::Table(document),
        };
        section
            .try_into()
            .map_err(|e| format!("Invalid logging configuration: {}", e))
    }

    /// Full path of the log file, joining `log_folder` and `file_path`.
    pub fn resolved_file_path(&self) -> PathBuf {
        let file = self.file_path.clone().unwrap_or_else(|| "osaurus_host.log".to_string());
        match &self.log_folder {
            Some(folder) => PathBuf::from(folder).join(file),
            None => PathBuf::from(file),
        }
    }

    pub fn max_file_size_bytes(&self) -> Option<u64> {
        self.max_file_size_mb.map(|mb| mb.saturating_mul(1024 * 1024))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_logging_table() {
        let config = LogConfig::from_toml_str(
            r#"
            [logging]
            type = "File"
            threshold = "warning"
            log_folder = "logs"
            file_path = "host.log"
            max_file_size_mb = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.log_type, LogType::File);
        assert_eq!(config.threshold, LogLevel::Warn);
        assert_eq!(config.resolved_file_path(), PathBuf::from("logs").join("host.log"));
        assert_eq!(config.max_file_size_bytes(), Some(2 * 1024 * 1024));
        assert!(!config.async_logging);
    }

    #[test]
    fn accepts_bare_table_and_defaults() {
        let config = LogConfig::from_toml_str("threshold = \"DEBUG\"").unwrap();
        assert_eq!(config.log_type, LogType::Console);
        assert_eq!(config.threshold, LogLevel::Debug);
    }

    #[test]
    fn rejects_unknown_level() {
        assert!(LogConfig::from_toml_str("[logging]\nthreshold = \"loud\"").is_err());
    }

    #[test]
    fn huge_rotation_size_saturates() {
        let config = LogConfig { max_file_size_mb: Some(u64::MAX), ..LogConfig::default() };
        assert_eq!(config.max_file_size_bytes(), Some(u64::MAX));

        let config = LogConfig { max_file_size_mb: Some(10), ..LogConfig::default() };
        assert_eq!(config.max_file_size_bytes(), Some(10 * 1024 * 1024));
    }

    #[test]
    fn levels_are_ordered() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Warn < LogLevel::Error);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = LogConfig::from_file("/nonexistent/osaurus/host_config.toml").unwrap();
        assert_eq!(config.threshold, LogLevel::Info);
    }
}
