use std::ffi::{c_void, CString};
use std::ptr::{self, NonNull};
use std::sync::{Mutex, MutexGuard, PoisonError};

use libloading::Library;
use liblogger::{log_debug, log_warn};
use plugin_core::abi::{EntryFn, EntryFnV1, EntryFnV2, OsrPluginCtx};
use serde_json::Value;

use crate::abi_version::AbiVersion;
use crate::error::{HostError, HostResult};
use crate::manifest::{parse_generic_manifest, parse_plugin_manifest, PluginInfo};
use crate::plugin_binding::{GenericBinding, PluginBinding, ToolsBinding};
use crate::tool_spec::{ensure_unique, ToolDescriptor};

/// Context returned by a generic plugin's `init`. Only ever passed back to
/// the same plugin, under the call lock.
struct Context(NonNull<c_void>);

unsafe impl Send for Context {}
unsafe impl Sync for Context {}

/// A plugin bound through one of the three tables, with its identity and
/// tool list read and validated once at load.
///
/// Calls into the plugin are serialized per plugin. Dropping it destroys the
/// generic context and then unmaps the library.
pub struct LoadedPlugin {
    info: PluginInfo,
    tools: Vec<ToolDescriptor>,
    manifest_json: Option<String>,
    binding: PluginBinding,
    context: Option<Context>,
    call_lock: Mutex<()>,
    // Declared last so it is dropped after everything that points into it.
    _library: Option<Library>,
}

fn enumerate_tools(tools: &ToolsBinding) -> HostResult<Vec<ToolDescriptor>> {
    let count = tools.tool_count();
    if count < 0 {
        return Err(HostError::InvalidManifest(format!("tool_count returned {}", count)));
    }

    let descriptors = (0..count)
        .map(|index| tools.tool_spec(index).and_then(ToolDescriptor::from_raw))
        .collect::<HostResult<Vec<_>>>()?;
    ensure_unique(&descriptors)?;
    Ok(descriptors)
}

fn describe_generic(
    generic: &GenericBinding,
    ctx: OsrPluginCtx,
) -> HostResult<(PluginInfo, Vec<ToolDescriptor>, String)> {
    let json = unsafe { generic.get_manifest(ctx) }
        .ok_or_else(|| HostError::InvalidManifest("get_manifest returned null".to_string()))?;
    let (info, manifest) = parse_generic_manifest(&json)?;

    let tools = manifest
        .capabilities
        .tools
        .iter()
        .map(ToolDescriptor::from_manifest)
        .collect::<HostResult<Vec<_>>>()?;
    ensure_unique(&tools)?;
    Ok((info, tools, json))
}

/// Turns a plugin's JSON answer into a value or a [`HostError::PluginReported`].
fn interpret_response(id: &str, response: Option<String>) -> HostResult<Value> {
    let text = response.ok_or_else(|| HostError::EmptyResponse(id.to_string()))?;
    let value: Value = serde_json::from_str(&text).map_err(|e| HostError::InvalidResponse {
        id: id.to_string(),
        reason: e.to_string(),
    })?;

    if let Some(error) = value.get("error").and_then(Value::as_object) {
        let field = |key: &str| {
            error.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
        };
        let code = field("code");
        return Err(HostError::PluginReported {
            code: if code.is_empty() { "unknown".to_string() } else { code },
            message: field("message"),
        });
    }
    Ok(value)
}

impl LoadedPlugin {
    /// Reads identity and tools through a freshly resolved table.
    ///
    /// v2 identity is validated before any other table function runs. v1
    /// tables carry no identity, so `id_hint` names them.
    pub(crate) fn bind(
        binding: PluginBinding,
        library: Option<Library>,
        id_hint: &str,
    ) -> HostResult<Self> {
        match binding {
            PluginBinding::Tools(tools) => {
                let (info, manifest_json) = match tools.plugin_manifest_json() {
                    Some(Some(json)) => (parse_plugin_manifest(&json)?, Some(json)),
                    Some(None) => {
                        return Err(HostError::InvalidManifest(
                            "get_plugin_manifest_json returned null".to_string(),
                        ))
                    }
                    None => {
                        let info = PluginInfo {
                            id: id_hint.to_string(),
                            version: None,
                            name: None,
                            description: None,
                            abi: AbiVersion::V1,
                        };
                        (info, None)
                    }
                };
                let descriptors = enumerate_tools(&tools)?;
                log_debug!(&format!(
                    "bound {} plugin {} with {} tools",
                    info.abi,
                    info.id,
                    descriptors.len()
                ));

                Ok(LoadedPlugin {
                    info,
                    tools: descriptors,
                    manifest_json,
                    binding,
                    context: None,
                    call_lock: Mutex::new(()),
                    _library: library,
                })
            }
            PluginBinding::Generic(generic) => {
                let ctx = NonNull::new(generic.init()).ok_or(HostError::InitFailed)?;
                let (info, tools, json) = match describe_generic(&generic, ctx.as_ptr()) {
                    Ok(described) => described,
                    Err(err) => {
                        unsafe { generic.destroy(ctx.as_ptr()) };
                        return Err(err);
                    }
                };
                log_debug!(&format!("bound generic plugin {} with {} tools", info.id, tools.len()));

                Ok(LoadedPlugin {
                    info,
                    tools,
                    manifest_json: Some(json),
                    binding,
                    context: Some(Context(ctx)),
                    call_lock: Mutex::new(()),
                    _library: library,
                })
            }
        }
    }

    /// Binds a generic table exported by code linked into this process.
    ///
    /// # Safety
    /// `entry` must return null or a table that stays valid for the life of the process.
    pub unsafe fn from_entry(entry: EntryFn) -> HostResult<Self> {
        Self::bind(PluginBinding::from_generic(entry())?, None, "")
    }

    /// # Safety
    /// As for [`LoadedPlugin::from_entry`].
    pub unsafe fn from_entry_v1(entry: EntryFnV1, plugin_id: &str) -> HostResult<Self> {
        Self::bind(PluginBinding::from_v1(entry())?, None, plugin_id)
    }

    /// # Safety
    /// As for [`LoadedPlugin::from_entry`].
    pub unsafe fn from_entry_v2(entry: EntryFnV2) -> HostResult<Self> {
        Self::bind(PluginBinding::from_v2(entry())?, None, "")
    }

    pub fn info(&self) -> &PluginInfo {
        &self.info
    }

    pub fn id(&self) -> &str {
        &self.info.id
    }

    pub fn version(&self) -> Option<&semver::Version> {
        self.info.version.as_ref()
    }

    pub fn abi(&self) -> AbiVersion {
        self.binding.abi()
    }

    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn tool(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|tool| tool.name == name)
    }

    /// The manifest exactly as the plugin published it. `None` for v1.
    pub fn manifest_json(&self) -> Option<&str> {
        self.manifest_json.as_deref()
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.call_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn context_ptr(&self) -> OsrPluginCtx {
        self.context.as_ref().map_or(ptr::null_mut(), |ctx| ctx.0.as_ptr())
    }

    /// Runs a tool. Unknown names fail here without calling the plugin.
    pub fn execute(&self, tool: &str, arguments: &Value) -> HostResult<Value> {
        if self.tool(tool).is_none() {
            return Err(HostError::UnknownTool {
                plugin: self.info.id.clone(),
                tool: tool.to_string(),
            });
        }

        let name = CString::new(tool)?;
        let arguments = CString::new(arguments.to_string())?;
        let response = {
            let _guard = self.lock();
            match &self.binding {
                PluginBinding::Tools(tools) => tools.execute(&name, &arguments),
                PluginBinding::Generic(generic) => {
                    let kind = CString::new("tool")?;
                    unsafe { generic.invoke(self.context_ptr(), &kind, &name, &arguments) }
                }
            }
        };

        let result = interpret_response(tool, response);
        if let Err(err) = &result {
            log_warn!(&format!("{}: tool '{}' failed: {}", self.info.id, tool, err));
        }
        result
    }

    /// Generic `(type, id, payload)` dispatch. Tables other than the generic
    /// one only understand `"tool"`.
    pub fn invoke(&self, kind: &str, id: &str, payload: &Value) -> HostResult<Value> {
        if kind == "tool" {
            return self.execute(id, payload);
        }

        let PluginBinding::Generic(generic) = &self.binding else {
            return Err(HostError::UnsupportedCapability {
                abi: self.abi(),
                kind: kind.to_string(),
            });
        };

        let kind_c = CString::new(kind)?;
        let id_c = CString::new(id)?;
        let payload_c = CString::new(payload.to_string())?;
        let response = {
            let _guard = self.lock();
            unsafe { generic.invoke(self.context_ptr(), &kind_c, &id_c, &payload_c) }
        };
        interpret_response(id, response)
    }
}

impl Drop for LoadedPlugin {
    fn drop(&mut self) {
        if let (PluginBinding::Generic(generic), Some(ctx)) = (&self.binding, self.context.take()) {
            log_debug!(&format!("destroying context of {}", self.info.id));
            unsafe { generic.destroy(ctx.0.as_ptr()) };
        }
    }
}

impl std::fmt::Debug for LoadedPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedPlugin")
            .field("info", &self.info)
            .field("tools", &self.tools)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_envelopes_become_plugin_reported() {
        let envelope = json!({
            "error": { "code": "invalid_arguments", "message": "'text' must be a string" }
        });
        let err = interpret_response("echo", Some(envelope.to_string())).unwrap_err();
        match err {
            HostError::PluginReported { code, message } => {
                assert_eq!(code, "invalid_arguments");
                assert_eq!(message, "'text' must be a string");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn null_and_garbage_responses() {
        assert!(matches!(interpret_response("x", None), Err(HostError::EmptyResponse(_))));
        assert!(matches!(
            interpret_response("x", Some("plain text".into())),
            Err(HostError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn plain_values_pass_through() {
        assert_eq!(interpret_response("x", Some("[1,2]".into())).unwrap(), json!([1, 2]));
        assert_eq!(
            interpret_response("x", Some(r#"{"error":"not an envelope"}"#.into())).unwrap(),
            json!({ "error": "not an envelope" })
        );
    }
}
