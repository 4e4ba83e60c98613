//! Echo plugin
//!
//! Exports the v2 table (`osaurus_plugin_entry_v2`) with identity
//! `com.acme.echo`. Handy for checking that a host round-trips arguments
//! and releases every string it is handed.

use plugin_core::{
    declare_plugin_v2, log_debug, string_arg, PermissionPolicy, PluginIdentity, ToolError,
    ToolPlugin, ToolSpec,
};
use serde_json::{json, Value};

pub const PLUGIN_ID: &str = "com.acme.echo";

#[derive(Default)]
pub struct EchoPlugin;

impl EchoPlugin {
    pub fn new() -> Self {
        EchoPlugin
    }

    fn echo(&self, arguments: &Value) -> Result<Value, ToolError> {
        let text = string_arg(arguments, "text")?;
        Ok(json!({ "text": text }))
    }

    fn reverse(&self, arguments: &Value) -> Result<Value, ToolError> {
        let text = string_arg(arguments, "text")?;
        Ok(json!({ "text": text.chars().rev().collect::<String>() }))
    }

    fn repeat(&self, arguments: &Value) -> Result<Value, ToolError> {
        let text = string_arg(arguments, "text")?;
        let times = arguments.get("times").and_then(Value::as_u64).unwrap_or(2);
        if times > 100 {
            return Err(ToolError::Failed(format!("refusing to repeat {} times (max 100)", times)));
        }
        Ok(json!({ "text": text.repeat(times as usize) }))
    }
}

fn text_schema() -> Value {
    json!({
        "type": "object",
        "properties": { "text": { "type": "string" } },
        "required": ["text"]
    })
}

impl ToolPlugin for EchoPlugin {
    fn identity(&self) -> PluginIdentity {
        PluginIdentity::new(PLUGIN_ID, env!("CARGO_PKG_VERSION"))
            .named("Echo")
            .described("Returns its input, optionally transformed")
    }

    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new("echo", "Returns the given text unchanged")
                .parameters(text_schema())
                .policy(PermissionPolicy::Auto),
            ToolSpec::new("reverse", "Returns the given text reversed")
                .parameters(text_schema())
                .policy(PermissionPolicy::Auto),
            ToolSpec::new("repeat", "Repeats the given text")
                .parameters(json!({
                    "type": "object",
                    "properties": {
                        "text": { "type": "string" },
                        "times": { "type": "integer", "minimum": 0, "maximum": 100 }
                    },
                    "required": ["text"]
                })),
        ]
    }

    fn execute(&self, tool_name: &str, arguments: Value) -> Result<Value, ToolError> {
        log_debug!(&format!("echo plugin running {}", tool_name));
        match tool_name {
            "echo" => self.echo(&arguments),
            "reverse" => self.reverse(&arguments),
            "repeat" => self.repeat(&arguments),
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }
}

declare_plugin_v2!(EchoPlugin, EchoPlugin::new());

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_and_reverse() {
        let plugin = EchoPlugin::new();
        let text = json!({ "text": "héllo" });
        assert_eq!(plugin.execute("echo", text.clone()).unwrap(), json!({ "text": "héllo" }));
        assert_eq!(plugin.execute("reverse", text).unwrap(), json!({ "text": "olléh" }));
    }

    #[test]
    fn repeat_defaults_and_limits() {
        let plugin = EchoPlugin::new();
        let repeat = |arguments: Value| plugin.execute("repeat", arguments);
        assert_eq!(repeat(json!({ "text": "ab" })).unwrap(), json!({ "text": "abab" }));
        assert_eq!(repeat(json!({ "text": "ab", "times": 0 })).unwrap(), json!({ "text": "" }));
        let too_many = repeat(json!({ "text": "ab", "times": 101 })).unwrap_err();
        assert_eq!(too_many.code(), "tool_failed");
    }

    #[test]
    fn missing_text_is_invalid_arguments() {
        let err = EchoPlugin::new().execute("echo", json!({})).unwrap_err();
        assert_eq!(err.code(), "invalid_arguments");
    }

    #[test]
    fn identity_is_reverse_dns_and_semver() {
        let identity = EchoPlugin::new().identity();
        assert_eq!(identity.plugin_id, "com.acme.echo");
        assert_eq!(identity.version, "1.2.0");
    }

    #[test]
    fn entry_symbol_returns_complete_table() {
        let table = unsafe { &*osaurus_plugin_entry_v2() };
        assert!(table.free_string.is_some());
        assert!(table.tool_count.is_some());
        assert!(table.get_tool_spec.is_some());
        assert!(table.execute.is_some());
        assert!(table.get_plugin_manifest_json.is_some());
        assert_eq!(unsafe { (table.tool_count.unwrap())() }, 3);
    }
}
