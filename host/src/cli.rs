use std::path::PathBuf;

use clap::{Parser, Subcommand};
use host_core::AbiVersion;

/// Load Osaurus native tool plugins and talk to them from the shell.
///
/// Results are printed to stdout as JSON; logs go to stderr or the file set
/// in the `[logging]` table of the config.
#[derive(Parser, Debug)]
#[command(name = "osaurus-host", version, about)]
pub struct Cli {
    /// Host configuration file
    #[arg(short, long, env = "OSAURUS_HOST_CONFIG", default_value = "host_config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print a plugin's identity and the manifest it publishes
    Manifest {
        /// Plugin library
        path: PathBuf,
        /// Bind this table instead of probing v2, v1, generic
        #[arg(long)]
        abi: Option<AbiVersion>,
    },
    /// Print the tools a plugin exposes
    Tools {
        path: PathBuf,
        #[arg(long)]
        abi: Option<AbiVersion>,
    },
    /// Run one tool and print its result
    Invoke {
        path: PathBuf,
        /// Tool name
        tool: String,
        /// Arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,
        /// Give up after this many seconds (default from [host] invoke_timeout_secs)
        #[arg(long)]
        timeout_secs: Option<u64>,
        #[arg(long)]
        abi: Option<AbiVersion>,
    },
    /// Generic (type, id, payload) invocation
    Call {
        path: PathBuf,
        /// Capability type, e.g. "tool"
        kind: String,
        /// Capability id
        id: String,
        /// Payload as JSON
        #[arg(long, default_value = "{}")]
        payload: String,
        #[arg(long)]
        timeout_secs: Option<u64>,
        #[arg(long)]
        abi: Option<AbiVersion>,
    },
    /// Load every plugin listed in the config and print a summary
    ServeConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_invoke() {
        let cli = Cli::try_parse_from([
            "osaurus-host",
            "--config",
            "custom.toml",
            "invoke",
            "libplugin_echo.so",
            "echo",
            "--args",
            r#"{"text":"hi"}"#,
            "--timeout-secs",
            "3",
            "--abi",
            "v2",
        ])
        .unwrap();

        assert_eq!(cli.config, PathBuf::from("custom.toml"));
        match cli.command {
            Command::Invoke { tool, args, timeout_secs, abi, .. } => {
                assert_eq!(tool, "echo");
                assert_eq!(args, r#"{"text":"hi"}"#);
                assert_eq!(timeout_secs, Some(3));
                assert_eq!(abi, Some(AbiVersion::V2));
            }
            other => panic!("parsed as {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_abi() {
        assert!(Cli::try_parse_from(["osaurus-host", "tools", "x.so", "--abi", "v7"]).is_err());
    }
}
