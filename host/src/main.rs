mod cli;
mod commands;

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use liblogger::{log_error, Logger};
use plugin_core::logging::CONFIG_ENV;

use crate::cli::Cli;
use crate::commands::{load_config, CommandRunner};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("osaurus-host: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = Logger::init_with_config(config.logging.clone()) {
        eprintln!("Error initializing logger: {}. Falling back to console.", e);
        Logger::init();
    }

    // Plugins built as separate libraries read their logging setup from here.
    std::env::set_var(CONFIG_ENV, &cli.config);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("osaurus-host: cannot start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let runner = CommandRunner::new(config);
    let outcome = runtime.block_on(runner.run(cli.command));
    // A timed-out plugin call may still be running on the blocking pool.
    runtime.shutdown_timeout(Duration::from_secs(1));

    let code = match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log_error!(&format!("{:#}", e));
            eprintln!("osaurus-host: {:#}", e);
            ExitCode::FAILURE
        }
    };

    let dropped = Logger::get_dropped_log_count();
    if dropped > 0 {
        eprintln!(
            "osaurus-host: {} log lines were written inline after the log queue filled",
            dropped
        );
    }
    if let Err(e) = Logger::shutdown() {
        eprintln!("Error shutting down logger: {}", e);
    }
    code
}
