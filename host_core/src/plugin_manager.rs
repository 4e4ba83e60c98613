//! Plugin Manager Module
//!
//! Loads the plugins named in a [`HostConfig`] into a shared
//! [`PluginRegistry`]. A plugin that fails to load is logged and skipped so
//! one broken library does not keep the others from starting.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use liblogger::{log_error, log_info};

use crate::abi_version::AbiVersion;
use crate::config::{HostConfig, PluginEntry};
use crate::error::HostResult;
use crate::plugin::LoadedPlugin;
use crate::plugin_loader::{load_plugin, load_plugin_as};
use crate::plugin_registry::PluginRegistry;

/// Outcome of [`PluginManager::load_all`].
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Ids of the plugins that were registered.
    pub loaded: Vec<String>,
    /// Library path and error text of every entry that was skipped.
    pub failed: Vec<(PathBuf, String)>,
}

pub struct PluginManager {
    registry: Arc<PluginRegistry>,
}

impl PluginManager {
    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// Loads one library and registers it.
    ///
    /// `abi` forces a table; `None` tries v2, v1, then generic.
    pub fn load_plugin(
        &self,
        path: &Path,
        abi: Option<AbiVersion>,
    ) -> HostResult<Arc<LoadedPlugin>> {
        log_info!(&format!("Loading plugin {}", path.display()));

        let plugin = match abi {
            Some(abi) => load_plugin_as(path, abi)?,
            None => load_plugin(path)?,
        };

        let tool_names: Vec<&str> = plugin.tools().iter().map(|t| t.name.as_str()).collect();
        log_info!(&format!(
            "Plugin {} ({}) provides: {}",
            plugin.id(),
            plugin.abi(),
            tool_names.join(", ")
        ));

        self.registry.register(plugin)
    }

    /// Registers an already bound plugin, e.g. one linked into the host.
    pub fn register(&self, plugin: LoadedPlugin) -> HostResult<Arc<LoadedPlugin>> {
        log_info!(&format!("Registering plugin {}", plugin.id()));
        self.registry.register(plugin)
    }

    fn load_entry(
        &self,
        entry: &PluginEntry,
        plugin_dir: &Path,
    ) -> Result<Arc<LoadedPlugin>, (PathBuf, String)> {
        let path = entry
            .library_path(plugin_dir)
            .map_err(|e| (PathBuf::new(), e.to_string()))?;
        self.load_plugin(&path, entry.abi).map_err(|e| (path, e.to_string()))
    }

    /// Loads every enabled entry of `config`.
    pub fn load_all(&self, config: &HostConfig) -> LoadReport {
        let mut report = LoadReport::default();

        for entry in config.enabled_plugins() {
            match self.load_entry(entry, &config.host.plugin_dir) {
                Ok(plugin) => report.loaded.push(plugin.id().to_string()),
                Err((path, reason)) => {
                    log_error!(&format!("Failed to load plugin {}: {}", path.display(), reason));
                    report.failed.push((path, reason));
                }
            }
        }

        log_info!(&format!(
            "{} plugins loaded, {} failed",
            report.loaded.len(),
            report.failed.len()
        ));
        report
    }

    /// Removes a plugin from the registry. It is unloaded once no caller holds it.
    pub fn unload(&self, id: &str) -> bool {
        let removed = self.registry.unregister(id).is_some();
        if removed {
            log_info!(&format!("Unloaded plugin {}", id));
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broken_entries_are_skipped_and_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = HostConfig::from_toml_str(&format!(
            r#"
            [host]
            plugin_dir = {:?}

            [[plugins]]
            name = "missing"

            [[plugins]]

            [[plugins]]
            name = "off"
            enabled = false
            "#,
            dir.path().display().to_string()
        ))
        .unwrap();

        let manager = PluginManager::new(Arc::new(PluginRegistry::new()));
        let report = manager.load_all(&config);

        assert!(report.loaded.is_empty());
        assert_eq!(report.failed.len(), 2);
        assert!(manager.registry().is_empty());
        assert!(!manager.unload("missing"));
    }
}
