//! Logging for plugins
//!
//! With the `logging` feature the `log_*!` macros come from `liblogger`;
//! without it they compile to nothing. A plugin built as its own cdylib has
//! its own logger instance, configured from the host's config file.

/// Environment variable naming the host configuration file.
pub const CONFIG_ENV: &str = "OSAURUS_HOST_CONFIG";

/// Initializes the plugin's logger unless something already did.
///
/// Reads the `[logging]` table of the file named by `OSAURUS_HOST_CONFIG`
/// (default `host_config.toml`) and falls back to console logging.
#[cfg(feature = "logging")]
pub fn init_logger(plugin_name: &str) {
    if liblogger::Logger::is_initialized() {
        return;
    }

    let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| "host_config.toml".to_string());
    if let Err(e) = liblogger::Logger::init_with_config_file(&path) {
        eprintln!("[{}] Error initializing logger from config: {}", plugin_name, e);
        liblogger::Logger::init();
    }
}

#[cfg(not(feature = "logging"))]
pub fn init_logger(_plugin_name: &str) {}
