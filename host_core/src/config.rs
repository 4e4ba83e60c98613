use std::fs;
use std::path::{Path, PathBuf};

use liblogger::LogConfig;
use serde::Deserialize;

use crate::abi_version::AbiVersion;
use crate::error::{HostError, HostResult};
use crate::plugin_utils::resolve_plugin_binary_path;

/// `host_config.toml`: a `[logging]` table for liblogger, `[host]` settings
/// and one `[[plugins]]` entry per library to load.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostConfig {
    #[serde(default)]
    pub logging: LogConfig,
    #[serde(default)]
    pub host: HostSettings,
    #[serde(default)]
    pub plugins: Vec<PluginEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostSettings {
    /// Folder searched for entries that give a `name` instead of a `path`.
    #[serde(default = "default_plugin_dir")]
    pub plugin_dir: PathBuf,
    /// Upper bound on a single tool call made by the CLI.
    #[serde(default = "default_invoke_timeout")]
    pub invoke_timeout_secs: u64,
}

impl Default for HostSettings {
    fn default() -> Self {
        HostSettings {
            plugin_dir: default_plugin_dir(),
            invoke_timeout_secs: default_invoke_timeout(),
        }
    }
}

fn default_plugin_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_invoke_timeout() -> u64 {
    30
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct PluginEntry {
    /// Explicit library path.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Crate name, resolved to the platform file name inside `plugin_dir`.
    #[serde(default)]
    pub name: Option<String>,
    /// Force one table instead of probing.
    #[serde(default)]
    pub abi: Option<AbiVersion>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl PluginEntry {
    /// Where the library lives: `path` if given, else `name` inside `plugin_dir`.
    pub fn library_path(&self, plugin_dir: &Path) -> HostResult<PathBuf> {
        match (&self.path, &self.name) {
            (Some(path), _) => Ok(path.clone()),
            (None, Some(name)) => Ok(resolve_plugin_binary_path(plugin_dir, name)),
            (None, None) => Err(HostError::Config(
                "plugin entry needs a 'path' or a 'name'".to_string(),
            )),
        }
    }
}

impl HostConfig {
    pub fn from_toml_str(text: &str) -> HostResult<Self> {
        toml::from_str(text).map_err(|e| HostError::Config(e.to_string()))
    }

    /// Reads a config file. Relative paths inside it are taken relative to
    /// the file's own directory.
    pub fn from_file<P: AsRef<Path>>(path: P) -> HostResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| HostError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let mut config = Self::from_toml_str(&text)?;

        if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            config.rebase(base);
        }
        Ok(config)
    }

    fn rebase(&mut self, base: &Path) {
        if self.host.plugin_dir.is_relative() {
            self.host.plugin_dir = base.join(&self.host.plugin_dir);
        }
        for entry in &mut self.plugins {
            if let Some(path) = entry.path.as_mut().filter(|p| p.is_relative()) {
                *path = base.join(&*path);
            }
        }
    }

    pub fn enabled_plugins(&self) -> impl Iterator<Item = &PluginEntry> {
        self.plugins.iter().filter(|entry| entry.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use liblogger::{LogLevel, LogType};

    const SAMPLE: &str = r#"
[logging]
type = "file"
threshold = "debug"
file_path = "host.log"

[host]
plugin_dir = "plugins"
invoke_timeout_secs = 5

[[plugins]]
name = "plugin_echo"

[[plugins]]
path = "/opt/osaurus/libplugin_clock.so"
abi = "v1"

[[plugins]]
name = "plugin_textkit"
enabled = false
"#;

    #[test]
    fn parses_all_sections() {
        let config = HostConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.logging.log_type, LogType::File);
        assert_eq!(config.logging.threshold, LogLevel::Debug);
        assert_eq!(config.host.invoke_timeout_secs, 5);
        assert_eq!(config.plugins.len(), 3);
        assert_eq!(config.plugins[1].abi, Some(AbiVersion::V1));
        assert_eq!(config.enabled_plugins().count(), 2);
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config = HostConfig::from_toml_str("").unwrap();
        assert_eq!(config.host.invoke_timeout_secs, 30);
        assert!(config.plugins.is_empty());
        assert_eq!(config.logging.log_type, LogType::Console);
    }

    #[test]
    fn unknown_abi_is_a_config_error() {
        let err = HostConfig::from_toml_str("[[plugins]]\nname = \"x\"\nabi = \"v9\"\n")
            .unwrap_err();
        assert!(matches!(err, HostError::Config(_)));
    }

    #[test]
    fn abi_names_ignore_case() {
        let config =
            HostConfig::from_toml_str("[[plugins]]\nname = \"x\"\nabi = \"V2\"\n").unwrap();
        assert_eq!(config.plugins[0].abi, Some(AbiVersion::V2));
    }

    #[test]
    fn relative_paths_follow_the_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("host_config.toml");
        std::fs::write(&file, SAMPLE).unwrap();

        let config = HostConfig::from_file(&file).unwrap();
        assert_eq!(config.host.plugin_dir, dir.path().join("plugins"));

        let echo = config.plugins[0].library_path(&config.host.plugin_dir).unwrap();
        assert!(echo.starts_with(dir.path().join("plugins")));
        assert_eq!(
            config.plugins[1].library_path(&config.host.plugin_dir).unwrap(),
            PathBuf::from("/opt/osaurus/libplugin_clock.so")
        );
    }

    #[test]
    fn entry_without_location_is_rejected() {
        let entry = PluginEntry {
            path: None,
            name: None,
            abi: None,
            enabled: true,
        };
        assert!(entry.library_path(Path::new(".")).is_err());
    }
}
