use std::collections::HashSet;

use plugin_core::manifest::ManifestTool;
use plugin_core::PermissionPolicy;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{HostError, HostResult};
use crate::plugin_binding::RawToolSpec;

/// A tool as the host sees it after validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments object.
    pub parameters: Value,
    pub requirements: Vec<String>,
    pub permission_policy: PermissionPolicy,
}

fn empty_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

fn invalid(tool: &str, reason: impl Into<String>) -> HostError {
    HostError::InvalidToolSpec {
        tool: tool.to_string(),
        reason: reason.into(),
    }
}

fn check_schema(tool: &str, schema: Value) -> HostResult<Value> {
    match schema {
        Value::Null => Ok(empty_schema()),
        Value::Object(_) => Ok(schema),
        other => Err(invalid(tool, format!("parameters must be a JSON object, got {}", other))),
    }
}

fn parse_policy(tool: &str, policy: Option<&str>) -> HostResult<PermissionPolicy> {
    match policy {
        None => Ok(PermissionPolicy::default()),
        Some(text) => text.parse().map_err(|e| invalid(tool, format!("{}", e))),
    }
}

impl ToolDescriptor {
    /// Validates a spec copied out of `get_tool_spec`.
    pub(crate) fn from_raw(raw: RawToolSpec) -> HostResult<Self> {
        let name = match raw.name {
            Some(name) if !name.is_empty() => name,
            _ => return Err(invalid("", "tool name is null or empty")),
        };

        let parameters = match raw.parameters_json.as_deref().map(str::trim) {
            None | Some("") => empty_schema(),
            Some(text) => {
                let schema = serde_json::from_str(text)
                    .map_err(|e| {
                        invalid(&name, format!("parameters_json is not valid JSON: {}", e))
                    })?;
                check_schema(&name, schema)?
            }
        };

        let requirements = match raw.requirements_json.as_deref().map(str::trim) {
            None | Some("") => Vec::new(),
            Some(text) => serde_json::from_str::<Vec<String>>(text)
                .map_err(|e| {
                    let reason = format!("requirements_json must be an array of strings: {}", e);
                    invalid(&name, reason)
                })?,
        };

        let permission_policy = parse_policy(&name, raw.permission_policy.as_deref())?;

        Ok(ToolDescriptor {
            description: raw.description.unwrap_or_default(),
            name,
            parameters,
            requirements,
            permission_policy,
        })
    }

    /// Validates a tool entry from a generic manifest's `capabilities.tools`.
    pub fn from_manifest(tool: &ManifestTool) -> HostResult<Self> {
        if tool.id.is_empty() {
            return Err(invalid("", "tool id is empty"));
        }
        let parameters = check_schema(&tool.id, tool.parameters.clone().unwrap_or(Value::Null))?;

        Ok(ToolDescriptor {
            name: tool.id.clone(),
            description: tool.description.clone(),
            parameters,
            requirements: tool.requirements.clone(),
            permission_policy: parse_policy(&tool.id, tool.permission_policy.as_deref())?,
        })
    }
}

/// Rejects a tool list that declares the same name twice.
pub fn ensure_unique(tools: &[ToolDescriptor]) -> HostResult<()> {
    let mut seen = HashSet::new();
    for tool in tools {
        if !seen.insert(tool.name.as_str()) {
            return Err(HostError::DuplicateTool(tool.name.clone()));
        }
    }
    Ok(())
}
