/*
 * Log output implementations
 *
 * - ConsoleOutput: writes lines to stderr
 * - FileOutput: appends to a file and rotates it once it grows past a size limit
 *
 * Both implement LogOutput. create_log_output picks one from a LogConfig.
 */

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::config::{LogConfig, LogType};

pub trait LogOutput: Send {
    fn write_log(&mut self, formatted_message: &str) -> Result<(), String>;

    fn flush(&mut self) -> Result<(), String> {
        Ok(())
    }
}

pub struct ConsoleOutput;

impl LogOutput for ConsoleOutput {
    fn write_log(&mut self, formatted_message: &str) -> Result<(), String> {
        writeln!(io::stderr(), "{}", formatted_message)
            .map_err(|e| format!("Failed to write to console: {}", e))
    }

    fn flush(&mut self) -> Result<(), String> {
        io::stderr().flush().map_err(|e| format!("Failed to flush console output: {}", e))
    }
}

pub struct FileOutput {
    path: PathBuf,
    file: File,
    written: u64,
    max_bytes: Option<u64>,
    force_flush: bool,
}

impl FileOutput {
    pub fn new(path: &Path, max_bytes: Option<u64>, force_flush: bool) -> Result<Self, String> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .map_err(|e| format!("Failed to create log directory: {}", e))?;
            }
        }

        let file = open_append(path)?;
        let written = file.metadata().map(|m| m.len()).unwrap_or(0);

        Ok(FileOutput {
            path: path.to_path_buf(),
            file,
            written,
            max_bytes,
            force_flush,
        })
    }

    /// Path the previous generation is moved to on rotation.
    pub fn rotated_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".1");
        PathBuf::from(name)
    }

    fn rotate(&mut self) -> Result<(), String> {
        self.file.flush().map_err(|e| format!("Failed to flush log file: {}", e))?;
        fs::rename(&self.path, self.rotated_path())
            .map_err(|e| format!("Failed to rotate log file: {}", e))?;
        self.file = open_append(&self.path)?;
        self.written = 0;
        Ok(())
    }
}

impl LogOutput for FileOutput {
    fn write_log(&mut self, formatted_message: &str) -> Result<(), String> {
        let line_len = formatted_message.len() as u64 + 1;
        if let Some(max) = self.max_bytes {
            if self.written > 0 && self.written + line_len > max {
                self.rotate()?;
            }
        }

        self.file
            .write_all(formatted_message.as_bytes())
            .and_then(|_| self.file.write_all(b"\n"))
            .map_err(|e| format!("Failed to write to log file: {}", e))?;
        self.written += line_len;

        if self.force_flush {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), String> {
        self.file.flush().map_err(|e| format!("Failed to flush log file: {}", e))
    }
}

fn open_append(path: &Path) -> Result<File, String> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| format!("Failed to open log file {}: {}", path.display(), e))
}

pub fn create_log_output(config: &LogConfig) -> Result<Box<dyn LogOutput>, String> {
    match config.log_type {
        LogType::Console => Ok(Box::new(ConsoleOutput)),
        LogType::File => {
            let output = FileOutput::new(
                &config.resolved_file_path(),
                config.max_file_size_bytes(),
                config.force_flush,
            )?;
            Ok(Box::new(output))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_output_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("host.log");

        let mut output = FileOutput::new(&path, None, true).unwrap();
        output.write_log("first").unwrap();
        output.write_log("second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn file_output_rotates_past_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("host.log");

        let mut output = FileOutput::new(&path, Some(12), true).unwrap();
        output.write_log("0123456789").unwrap();
        output.write_log("abc").unwrap();

        assert_eq!(fs::read_to_string(output.rotated_path()).unwrap(), "0123456789\n");
        assert_eq!(fs::read_to_string(&path).unwrap(), "abc\n");
    }
}
