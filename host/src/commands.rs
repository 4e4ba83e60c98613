use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use host_core::{
    load_plugin, load_plugin_as, AbiVersion, HostConfig, LoadedPlugin, PluginManager,
    PluginRegistry,
};
use liblogger::{log_info, log_warn};
use serde::Serialize;
use serde_json::{json, Value};

use crate::cli::Command;

fn load(path: &Path, abi: Option<AbiVersion>) -> Result<LoadedPlugin> {
    let plugin = match abi {
        Some(abi) => load_plugin_as(path, abi),
        None => load_plugin(path),
    };
    plugin.with_context(|| format!("loading {}", path.display()))
}

fn parse_json(text: &str, what: &str) -> Result<Value> {
    serde_json::from_str(text).with_context(|| format!("{} is not valid JSON", what))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Runs a plugin call on the blocking pool and stops waiting after `limit`.
///
/// A call that times out keeps running on its thread; the plugin has no way
/// to be interrupted.
pub async fn call_with_timeout<F>(limit: Duration, call: F) -> Result<Value>
where
    F: FnOnce() -> host_core::HostResult<Value> + Send + 'static,
{
    match tokio::time::timeout(limit, tokio::task::spawn_blocking(call)).await {
        Ok(joined) => Ok(joined.context("plugin call panicked")??),
        Err(_) => bail!("plugin call did not finish within {:?}", limit),
    }
}

fn plugin_summary(plugin: &LoadedPlugin) -> Value {
    json!({
        "id": plugin.id(),
        "abi": plugin.abi(),
        "version": plugin.version().map(|v| v.to_string()),
        "tools": plugin.tools().iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
    })
}

pub struct CommandRunner {
    config: HostConfig,
}

impl CommandRunner {
    pub fn new(config: HostConfig) -> Self {
        Self { config }
    }

    fn timeout(&self, override_secs: Option<u64>) -> Duration {
        Duration::from_secs(override_secs.unwrap_or(self.config.host.invoke_timeout_secs))
    }

    pub async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Manifest { path, abi } => {
                let plugin = load(&path, abi)?;
                let published = plugin
                    .manifest_json()
                    .map(|text| parse_json(text, "manifest"))
                    .transpose()?;
                print_json(&json!({ "plugin": plugin.info(), "manifest": published }))
            }
            Command::Tools { path, abi } => {
                let plugin = load(&path, abi)?;
                print_json(&plugin.tools())
            }
            Command::Invoke { path, tool, args, timeout_secs, abi } => {
                let arguments = parse_json(&args, "--args")?;
                let plugin = Arc::new(load(&path, abi)?);
                log_info!(&format!("invoking {}/{}", plugin.id(), tool));

                let limit = self.timeout(timeout_secs);
                let result =
                    call_with_timeout(limit, move || plugin.execute(&tool, &arguments)).await?;
                print_json(&result)
            }
            Command::Call { path, kind, id, payload, timeout_secs, abi } => {
                let payload = parse_json(&payload, "--payload")?;
                let plugin = Arc::new(load(&path, abi)?);
                log_info!(&format!("calling {}/{}/{}", plugin.id(), kind, id));

                let limit = self.timeout(timeout_secs);
                let result =
                    call_with_timeout(limit, move || plugin.invoke(&kind, &id, &payload)).await?;
                print_json(&result)
            }
            Command::ServeConfig => self.serve_config(),
        }
    }

    fn serve_config(&self) -> Result<()> {
        let manager = PluginManager::new(Arc::new(PluginRegistry::new()));
        let report = manager.load_all(&self.config);

        let loaded: Vec<Value> =
            manager.registry().all().iter().map(|p| plugin_summary(p)).collect();
        let failed: Vec<Value> = report
            .failed
            .iter()
            .map(|(path, error)| json!({ "path": path, "error": error }))
            .collect();
        print_json(&json!({ "loaded": loaded, "failed": failed }))?;

        if !report.failed.is_empty() {
            let attempted = report.failed.len() + report.loaded.len();
            bail!("{} of {} plugins failed to load", report.failed.len(), attempted);
        }
        Ok(())
    }
}

/// Reads the config file. A missing file means defaults.
pub fn load_config(path: &Path) -> Result<HostConfig> {
    if !path.exists() {
        log_warn!(&format!("{} not found, using defaults", path.display()));
        return Ok(HostConfig::default());
    }
    HostConfig::from_file(path).with_context(|| format!("reading {}", path.display()))
}
