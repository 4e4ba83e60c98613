//! Parsing and validation of the JSON manifests plugins publish at load time.

use plugin_core::abi::ABI_VERSION_V2;
use plugin_core::{GenericManifest, PluginManifest};
use semver::Version;
use serde::Serialize;

use crate::abi_version::AbiVersion;
use crate::error::{HostError, HostResult};

/// Identity of a loaded plugin, whichever table it was bound through.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PluginInfo {
    pub id: String,
    /// Absent for v1 plugins, which do not publish one.
    pub version: Option<Version>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub abi: AbiVersion,
}

/// `plugin_id` must be reverse-DNS: two or more `[A-Za-z0-9_-]+` segments joined by `.`.
pub fn validate_plugin_id(plugin_id: &str) -> HostResult<()> {
    if plugin_id.is_empty() {
        return Err(HostError::InvalidManifest("plugin_id is empty".to_string()));
    }

    let segments: Vec<&str> = plugin_id.split('.').collect();
    let well_formed = segments.len() >= 2
        && segments.iter().all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        });

    if well_formed {
        Ok(())
    } else {
        Err(HostError::InvalidManifest(format!(
            "plugin_id '{}' is not a reverse-DNS identifier",
            plugin_id
        )))
    }
}

pub fn validate_version(version: &str) -> HostResult<Version> {
    Version::parse(version)
        .map_err(|e| {
            HostError::InvalidManifest(format!("version '{}' is not semantic: {}", version, e))
        })
}

/// Parses and validates the v2 identity manifest.
pub fn parse_plugin_manifest(json: &str) -> HostResult<PluginInfo> {
    let manifest: PluginManifest =
        serde_json::from_str(json).map_err(|e| HostError::InvalidManifest(e.to_string()))?;

    if manifest.abi != ABI_VERSION_V2 {
        return Err(HostError::AbiMismatch {
            expected: ABI_VERSION_V2,
            found: manifest.abi,
        });
    }
    validate_plugin_id(&manifest.plugin_id)?;
    let version = validate_version(&manifest.version)?;

    Ok(PluginInfo {
        id: manifest.plugin_id,
        version: Some(version),
        name: None,
        description: None,
        abi: AbiVersion::V2,
    })
}

/// Parses the generic manifest, validating identity but leaving tool
/// entries for [`ToolDescriptor::from_manifest`](crate::ToolDescriptor::from_manifest).
pub fn parse_generic_manifest(json: &str) -> HostResult<(PluginInfo, GenericManifest)> {
    let manifest: GenericManifest =
        serde_json::from_str(json).map_err(|e| HostError::InvalidManifest(e.to_string()))?;

    validate_plugin_id(&manifest.plugin_id)?;
    let version = validate_version(&manifest.version)?;

    let info = PluginInfo {
        id: manifest.plugin_id.clone(),
        version: Some(version),
        name: manifest.name.clone(),
        description: manifest.description.clone(),
        abi: AbiVersion::Generic,
    };
    Ok((info, manifest))
}
