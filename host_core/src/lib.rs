pub mod abi_version;
pub use abi_version::AbiVersion;

pub mod error;
pub use error::{HostError, HostResult};

pub mod plugin_string;
pub use plugin_string::PluginString;

mod plugin_binding;

pub mod manifest;
pub use manifest::PluginInfo;

pub mod tool_spec;
pub use tool_spec::ToolDescriptor;

pub mod plugin;
pub use plugin::LoadedPlugin;

pub mod plugin_loader;
pub use plugin_loader::{load_plugin, load_plugin_as};

pub mod plugin_registry;
pub use plugin_registry::PluginRegistry;

pub mod plugin_manager;
pub use plugin_manager::{LoadReport, PluginManager};

pub mod config;
pub use config::HostConfig;

pub mod plugin_utils;

pub use plugin_core::PermissionPolicy;
