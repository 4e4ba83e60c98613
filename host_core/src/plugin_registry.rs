use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{HostError, HostResult};
use crate::plugin::LoadedPlugin;

/// Central registry of loaded plugins, keyed by plugin id.
///
/// Entries are shared as `Arc`s, so a plugin removed here stays loaded until
/// the last caller holding it is done.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: RwLock<HashMap<String, Arc<LoadedPlugin>>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<LoadedPlugin>>> {
        self.plugins.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<LoadedPlugin>>> {
        self.plugins.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, plugin: LoadedPlugin) -> HostResult<Arc<LoadedPlugin>> {
        let mut map = self.write();
        if map.contains_key(plugin.id()) {
            return Err(HostError::DuplicatePlugin(plugin.id().to_string()));
        }
        let plugin = Arc::new(plugin);
        map.insert(plugin.id().to_string(), Arc::clone(&plugin));
        Ok(plugin)
    }

    pub fn get(&self, id: &str) -> Option<Arc<LoadedPlugin>> {
        self.read().get(id).cloned()
    }

    /// All plugins, ordered by id.
    pub fn all(&self) -> Vec<Arc<LoadedPlugin>> {
        let mut plugins: Vec<_> = self.read().values().cloned().collect();
        plugins.sort_by(|a, b| a.id().cmp(b.id()));
        plugins
    }

    pub fn unregister(&self, id: &str) -> Option<Arc<LoadedPlugin>> {
        self.write().remove(id)
    }

    /// The first plugin, by id, exposing a tool called `tool`.
    pub fn find_tool(&self, tool: &str) -> Option<Arc<LoadedPlugin>> {
        self.all().into_iter().find(|plugin| plugin.tool(tool).is_some())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
