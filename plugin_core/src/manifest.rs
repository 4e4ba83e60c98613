//! JSON documents exchanged at load time.
//!
//! Both sides of the boundary use these types: the SDK serializes them and
//! the host deserializes and validates them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::tool::{PermissionPolicy, PluginIdentity, ToolPlugin, ToolSpec};

/// v2 identity manifest: `{"plugin_id":"com.acme.echo","version":"1.2.0","abi":2}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManifest {
    pub plugin_id: String,
    pub version: String,
    pub abi: u32,
}

/// Manifest returned by the generic table's `get_manifest`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericManifest {
    pub plugin_id: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub capabilities: Capabilities,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Capabilities {
    #[serde(default)]
    pub tools: Vec<ManifestTool>,
    /// Capability kinds other than tools, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A tool entry inside [`Capabilities`]. `id` is the tool name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestTool {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Option<Value>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub permission_policy: Option<String>,
}

impl From<&ToolSpec> for ManifestTool {
    fn from(spec: &ToolSpec) -> Self {
        ManifestTool {
            id: spec.name.clone(),
            description: spec.description.clone(),
            parameters: Some(spec.parameters.clone()),
            requirements: spec.requirements.clone(),
            permission_policy: Some(spec.permission_policy.as_str().to_string()),
        }
    }
}

impl PluginManifest {
    pub fn for_identity(identity: &PluginIdentity, abi: u32) -> Self {
        PluginManifest {
            plugin_id: identity.plugin_id.clone(),
            version: identity.version.clone(),
            abi,
        }
    }
}

impl GenericManifest {
    pub fn describe<T: ToolPlugin + ?Sized>(plugin: &T) -> Self {
        let identity = plugin.identity();
        GenericManifest {
            plugin_id: identity.plugin_id,
            version: identity.version,
            name: identity.name,
            description: identity.description,
            capabilities: Capabilities {
                tools: plugin.tools().iter().map(ManifestTool::from).collect(),
                extra: Map::new(),
            },
        }
    }
}

impl ManifestTool {
    pub fn policy(&self) -> Option<Result<PermissionPolicy, crate::tool::UnknownPolicy>> {
        self.permission_policy.as_deref().map(str::parse)
    }
}
