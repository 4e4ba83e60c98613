use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::abi::{POLICY_ASK, POLICY_AUTO, POLICY_DENY};

/// What the host should do before running a tool.
///
/// Closed set; the wire form is the lowercase name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionPolicy {
    /// Run without asking.
    Auto,
    /// Ask the user first.
    #[default]
    Ask,
    /// Never run.
    Deny,
}

impl PermissionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionPolicy::Auto => POLICY_AUTO,
            PermissionPolicy::Ask => POLICY_ASK,
            PermissionPolicy::Deny => POLICY_DENY,
        }
    }
}

impl fmt::Display for PermissionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown permission policy '{0}' (expected auto, ask or deny)")]
pub struct UnknownPolicy(pub String);

impl FromStr for PermissionPolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            POLICY_AUTO => Ok(PermissionPolicy::Auto),
            POLICY_ASK => Ok(PermissionPolicy::Ask),
            POLICY_DENY => Ok(PermissionPolicy::Deny),
            other => Err(UnknownPolicy(other.to_string())),
        }
    }
}

/// A tool as the plugin author describes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments object.
    pub parameters: Value,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub permission_policy: PermissionPolicy,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        ToolSpec {
            name: name.into(),
            description: description.into(),
            parameters: json!({ "type": "object", "properties": {} }),
            requirements: Vec::new(),
            permission_policy: PermissionPolicy::default(),
        }
    }

    pub fn parameters(mut self, schema: Value) -> Self {
        self.parameters = schema;
        self
    }

    pub fn requirement(mut self, requirement: impl Into<String>) -> Self {
        self.requirements.push(requirement.into());
        self
    }

    pub fn policy(mut self, policy: PermissionPolicy) -> Self {
        self.permission_policy = policy;
        self
    }
}

/// Who the plugin is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginIdentity {
    /// Reverse-DNS id, e.g. `com.acme.echo`.
    pub plugin_id: String,
    /// Semantic version.
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PluginIdentity {
    pub fn new(plugin_id: impl Into<String>, version: impl Into<String>) -> Self {
        PluginIdentity {
            plugin_id: plugin_id.into(),
            version: version.into(),
            name: None,
            description: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Failure of a plugin operation, reported to the host as an error envelope.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToolError {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("unsupported capability '{kind}/{id}'")]
    UnknownCapability { kind: String, id: String },

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{0}")]
    Failed(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ToolError {
    /// Stable code carried in the envelope.
    pub fn code(&self) -> &'static str {
        match self {
            ToolError::UnknownTool(_) => "unknown_tool",
            ToolError::UnknownCapability { .. } => "unknown_capability",
            ToolError::InvalidArguments(_) => "invalid_arguments",
            ToolError::Failed(_) => "tool_failed",
            ToolError::Internal(_) => "internal_error",
        }
    }

    /// `{"error": {"code": ..., "message": ...}}`
    pub fn to_envelope(&self) -> Value {
        json!({ "error": { "code": self.code(), "message": self.to_string() } })
    }
}

/// Behavior behind every exported table.
///
/// Implementations are shared across threads by the v1/v2 tables (one
/// process-wide instance) and owned by a context in the generic table.
pub trait ToolPlugin: Send + Sync + 'static {
    fn identity(&self) -> PluginIdentity;

    fn tools(&self) -> Vec<ToolSpec>;

    fn execute(&self, tool_name: &str, arguments: Value) -> Result<Value, ToolError>;

    /// Generic `(type, id, payload)` dispatch. Only `"tool"` is routed by default.
    fn invoke(&self, kind: &str, id: &str, payload: Value) -> Result<Value, ToolError> {
        match kind {
            "tool" => self.execute(id, payload),
            _ => Err(ToolError::UnknownCapability {
                kind: kind.to_string(),
                id: id.to_string(),
            }),
        }
    }
}

/// Reads a required string argument.
pub fn string_arg<'a>(arguments: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArguments(format!("'{}' must be a string", key)))
}
