/*
 * Logger implementation
 *
 * One process-wide logger lives behind a OnceCell. Lines are formatted on the
 * calling thread and either written straight to the configured output or
 * handed to a background task on a small Tokio runtime. When the channel is
 * full the line is written inline and counted as dropped from the async path.
 */

use chrono::Utc;
use once_cell::sync::OnceCell;
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Runtime;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{timeout, Duration};

use crate::config::{LogConfig, LogLevel};
use crate::outputs::{create_log_output, LogOutput};

static LOGGER_INSTANCE: OnceCell<Mutex<LoggerInner>> = OnceCell::new();
static RUNTIME: OnceCell<Runtime> = OnceCell::new();

const CHANNEL_CAPACITY: usize = 256;

type SharedOutput = Arc<Mutex<Box<dyn LogOutput>>>;

enum LogCommand {
    Entry(String),
    Shutdown(oneshot::Sender<()>),
}

pub(crate) struct LoggerInner {
    config: Option<LogConfig>,
    output: Option<SharedOutput>,
    async_sender: Option<mpsc::Sender<LogCommand>>,
    dropped_logs: AtomicU64,
}

impl LoggerInner {
    fn new() -> Self {
        LoggerInner {
            config: None,
            output: None,
            async_sender: None,
            dropped_logs: AtomicU64::new(0),
        }
    }

    pub(crate) fn with_output(config: LogConfig, output: Box<dyn LogOutput>) -> Self {
        LoggerInner {
            config: Some(config),
            output: Some(Arc::new(Mutex::new(output))),
            async_sender: None,
            dropped_logs: AtomicU64::new(0),
        }
    }

    fn init_with_config(&mut self, config: LogConfig) -> Result<(), String> {
        let output: SharedOutput = Arc::new(Mutex::new(create_log_output(&config)?));

        self.async_sender = None;
        if config.async_logging {
            match runtime() {
                Some(rt) => {
                    let (tx, rx) = mpsc::channel::<LogCommand>(CHANNEL_CAPACITY);
                    rt.spawn(process_log_commands(rx, Arc::clone(&output)));
                    self.async_sender = Some(tx);
                }
                None => eprintln!("liblogger: async runtime unavailable, logging synchronously"),
            }
        }

        self.output = Some(output);
        self.config = Some(config);
        Ok(())
    }

    fn threshold(&self) -> LogLevel {
        self.config.as_ref().map(|c| c.threshold).unwrap_or(LogLevel::Info)
    }

    pub(crate) fn log(
        &self,
        level: LogLevel,
        message: &str,
        context: Option<&str>,
        file: &str,
        line: u32,
        module: &str,
    ) {
        if level < self.threshold() {
            return;
        }

        let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
        let formatted = format_log_message(&timestamp, level, message, context, file, line, module);

        if let Some(sender) = &self.async_sender {
            match sender.try_send(LogCommand::Entry(formatted)) {
                Ok(()) => return,
                Err(mpsc::error::TrySendError::Full(LogCommand::Entry(line)))
                | Err(mpsc::error::TrySendError::Closed(LogCommand::Entry(line))) => {
                    self.dropped_logs.fetch_add(1, Ordering::Relaxed);
                    self.write_sync(&line);
                }
                Err(_) => {}
            }
            return;
        }

        self.write_sync(&formatted);
    }

    fn write_sync(&self, formatted: &str) {
        match &self.output {
            Some(output) => {
                if let Err(e) = lock_output(output).write_log(formatted) {
                    eprintln!("Failed to write log: {}", e);
                }
            }
            None => {
                let _ = writeln!(io::stderr(), "{}", formatted);
            }
        }
    }
}

fn runtime() -> Option<&'static Runtime> {
    RUNTIME
        .get_or_try_init(|| {
            tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .thread_name("liblogger")
                .enable_time()
                .build()
        })
        .ok()
}

fn lock_output(output: &SharedOutput) -> MutexGuard<'_, Box<dyn LogOutput>> {
    output.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn lock_inner() -> MutexGuard<'static, LoggerInner> {
    LOGGER_INSTANCE
        .get_or_init(|| Mutex::new(LoggerInner::new()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub(crate) fn format_log_message(
    timestamp: &str,
    level: LogLevel,
    message: &str,
    context: Option<&str>,
    file: &str,
    line: u32,
    module: &str,
) -> String {
    let head = format!(
        "{} [{}] [{}:{}] [{}] {}",
        timestamp,
        level.as_str(),
        file,
        line,
        module,
        message
    );
    match context {
        Some(ctx) => format!("{} | {}", head, ctx),
        None => head,
    }
}

async fn process_log_commands(mut receiver: mpsc::Receiver<LogCommand>, output: SharedOutput) {
    while let Some(cmd) = receiver.recv().await {
        match cmd {
            LogCommand::Entry(line) => {
                if let Err(e) = lock_output(&output).write_log(&line) {
                    eprintln!("Async logging error: {}", e);
                }
            }
            LogCommand::Shutdown(done) => {
                let _ = lock_output(&output).flush();
                let _ = done.send(());
                break;
            }
        }
    }
}

pub struct Logger;

impl Logger {
    /// Initialize with defaults (console, info).
    pub fn init() {
        let _ = Self::init_with_config(LogConfig::default());
    }

    /// Initialize from the `[logging]` table of a TOML file.
    pub fn init_with_config_file(config_path: &str) -> Result<(), String> {
        let config = LogConfig::from_file(config_path)?;
        Self::init_with_config(config)
    }

    pub fn init_with_config(config: LogConfig) -> Result<(), String> {
        lock_inner().init_with_config(config)
    }

    pub fn is_initialized() -> bool {
        LOGGER_INSTANCE.get().map(|_| lock_inner().config.is_some()).unwrap_or(false)
    }

    pub fn debug(
        message: &str,
        context: Option<String>,
        file: &'static str,
        line: u32,
        module: &'static str,
    ) {
        Self::log_with_metadata(LogLevel::Debug, message, context, file, line, module)
    }

    pub fn info(
        message: &str,
        context: Option<String>,
        file: &'static str,
        line: u32,
        module: &'static str,
    ) {
        Self::log_with_metadata(LogLevel::Info, message, context, file, line, module)
    }

    pub fn warn(
        message: &str,
        context: Option<String>,
        file: &'static str,
        line: u32,
        module: &'static str,
    ) {
        Self::log_with_metadata(LogLevel::Warn, message, context, file, line, module)
    }

    pub fn error(
        message: &str,
        context: Option<String>,
        file: &'static str,
        line: u32,
        module: &'static str,
    ) {
        Self::log_with_metadata(LogLevel::Error, message, context, file, line, module)
    }

    fn log_with_metadata(
        level: LogLevel,
        message: &str,
        context: Option<String>,
        file: &str,
        line: u32,
        module: &str,
    ) {
        let file_name = Path::new(file).file_name().and_then(|n| n.to_str()).unwrap_or(file);
        lock_inner().log(level, message, context.as_deref(), file_name, line, module);
    }

    /// Drains the async worker, then flushes the output.
    pub fn shutdown() -> Result<(), String> {
        let (sender, output) = {
            let mut inner = lock_inner();
            (inner.async_sender.take(), inner.output.clone())
        };

        if let (Some(sender), Some(rt)) = (sender, RUNTIME.get()) {
            // block_on must not run on a thread that is already inside a runtime
            let handle = std::thread::spawn(move || {
                let (done_tx, done_rx) = oneshot::channel();
                rt.block_on(async move {
                    sender
                        .send(LogCommand::Shutdown(done_tx))
                        .await
                        .map_err(|e| format!("Failed to send shutdown command: {}", e))?;
                    match timeout(Duration::from_secs(5), done_rx).await {
                        Ok(Ok(())) => Ok(()),
                        Ok(Err(_)) => Err("Shutdown completion channel was closed".to_string()),
                        Err(_) => Err("Logger shutdown timed out after 5 seconds".to_string()),
                    }
                })
            });
            handle.join().map_err(|_| "Logger shutdown thread panicked".to_string())??;
        }

        if let Some(output) = output {
            lock_output(&output).flush()?;
        }
        Ok(())
    }

    /// Lines that fell back to synchronous writes because the worker queue was full.
    pub fn get_dropped_log_count() -> u64 {
        LOGGER_INSTANCE
            .get()
            .map(|_| lock_inner().dropped_logs.load(Ordering::Relaxed))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CaptureOutput(Arc<Mutex<Vec<String>>>);

    impl LogOutput for CaptureOutput {
        fn write_log(&mut self, formatted_message: &str) -> Result<(), String> {
            self.0.lock().unwrap().push(formatted_message.to_string());
            Ok(())
        }
    }

    #[test]
    fn format_includes_location_and_context() {
        let line = format_log_message(
            "T",
            LogLevel::Warn,
            "loaded",
            Some("id=com.acme.echo"),
            "loader.rs",
            42,
            "host_core::loader",
        );
        assert_eq!(line, "T [WARN] [loader.rs:42] [host_core::loader] loaded | id=com.acme.echo");
    }

    #[test]
    fn threshold_filters_lower_levels() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let config = LogConfig { threshold: LogLevel::Warn, ..LogConfig::default() };
        let inner = LoggerInner::with_output(config, Box::new(CaptureOutput(Arc::clone(&lines))));

        inner.log(LogLevel::Info, "quiet", None, "a.rs", 1, "m");
        inner.log(LogLevel::Error, "loud", None, "a.rs", 2, "m");

        let lines = lines.lock().unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("[ERROR]"));
        assert!(lines[0].ends_with("loud"));
    }

    #[test]
    fn closed_worker_queue_falls_back_to_inline_writes() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let capture = Box::new(CaptureOutput(Arc::clone(&lines)));
        let mut inner = LoggerInner::with_output(LogConfig::default(), capture);
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        inner.async_sender = Some(tx);

        inner.log(LogLevel::Error, "kept", None, "a.rs", 1, "m");

        assert_eq!(inner.dropped_logs.load(Ordering::Relaxed), 1);
        assert_eq!(lines.lock().unwrap().len(), 1);
    }
}
