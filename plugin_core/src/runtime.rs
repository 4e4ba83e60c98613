//! Glue between the exported `extern "C"` slots and a [`ToolPlugin`].
//!
//! The `declare_plugin*!` macros expand to thin `extern "C"` functions that
//! forward here. Every entry runs under `catch_unwind`, so a panicking tool
//! becomes an `internal_error` envelope instead of unwinding into the host.

use std::any::Any;
use std::os::raw::{c_char, c_int};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;

use serde_json::Value;

use crate::abi::{
    OsrPluginCtx, OsrToolSpecV1, ABI_VERSION_V2, OSR_STATUS_INTERNAL, OSR_STATUS_INVALID_ARGUMENT,
    OSR_STATUS_OK, OSR_STATUS_OUT_OF_RANGE,
};
use crate::manifest::{GenericManifest, PluginManifest};
use crate::strings::{into_plugin_string, read_utf8};
use crate::tool::{ToolError, ToolPlugin};

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "plugin panicked".to_string()
    }
}

fn guarded<R>(f: impl FnOnce() -> R) -> Result<R, ToolError> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| ToolError::Internal(panic_message(payload)))
}

fn respond(result: Result<Value, ToolError>) -> *const c_char {
    let body = match result {
        Ok(value) => value,
        Err(err) => {
            crate::log_warn!(format!("tool call failed: {}", err).as_str());
            err.to_envelope()
        }
    };
    into_plugin_string(body.to_string())
}

/// Parses a JSON arguments buffer. Null or blank input is an empty object.
///
/// # Safety
/// `ptr` must be null or a valid NUL-terminated string.
pub unsafe fn parse_arguments(ptr: *const c_char) -> Result<Value, ToolError> {
    let text = read_utf8(ptr)
        .map_err(|e| ToolError::InvalidArguments(format!("arguments are not UTF-8: {}", e)))?;
    match text.map(str::trim) {
        None | Some("") => Ok(Value::Object(Default::default())),
        Some(text) => serde_json::from_str(text)
            .map_err(|e| {
                ToolError::InvalidArguments(format!("arguments are not valid JSON: {}", e))
            }),
    }
}

unsafe fn required_str(ptr: *const c_char, what: &str) -> Result<String, ToolError> {
    match read_utf8(ptr) {
        Ok(Some(s)) => Ok(s.to_string()),
        Ok(None) => Err(ToolError::InvalidArguments(format!("{} is null", what))),
        Err(e) => Err(ToolError::InvalidArguments(format!("{} is not UTF-8: {}", what, e))),
    }
}

/// Number of tools, or a negative status if listing them failed.
pub fn tool_count<'a, T: ToolPlugin>(plugin: impl FnOnce() -> &'a T) -> c_int {
    match guarded(|| plugin().tools().len()) {
        Ok(n) => c_int::try_from(n).unwrap_or(c_int::MAX),
        Err(err) => {
            crate::log_error!(format!("listing tools failed: {}", err).as_str());
            OSR_STATUS_INTERNAL
        }
    }
}

/// Fills `out` with freshly allocated copies of the tool's fields.
///
/// # Safety
/// `out` must be null or valid for writes.
pub unsafe fn get_tool_spec<'a, T: ToolPlugin>(
    plugin: impl FnOnce() -> &'a T,
    index: c_int,
    out: *mut OsrToolSpecV1,
) -> c_int {
    if out.is_null() || index < 0 {
        return OSR_STATUS_INVALID_ARGUMENT;
    }

    let tools = match guarded(|| plugin().tools()) {
        Ok(tools) => tools,
        Err(err) => {
            crate::log_error!(format!("describing tools failed: {}", err).as_str());
            return OSR_STATUS_INTERNAL;
        }
    };

    let Some(spec) = tools.get(index as usize) else {
        return OSR_STATUS_OUT_OF_RANGE;
    };

    let requirements = match serde_json::to_string(&spec.requirements) {
        Ok(json) => json,
        Err(_) => return OSR_STATUS_INTERNAL,
    };

    *out = OsrToolSpecV1 {
        name: into_plugin_string(spec.name.as_str()),
        description: into_plugin_string(spec.description.as_str()),
        parameters_json: into_plugin_string(spec.parameters.to_string()),
        requirements_json: into_plugin_string(requirements),
        permission_policy: into_plugin_string(spec.permission_policy.as_str()),
    };
    OSR_STATUS_OK
}

/// # Safety
/// Both pointers must be null or valid NUL-terminated strings.
pub unsafe fn execute<'a, T: ToolPlugin>(
    plugin: impl FnOnce() -> &'a T,
    tool_name: *const c_char,
    arguments_json: *const c_char,
) -> *const c_char {
    let outcome = (|| -> Result<Value, ToolError> {
        let name = required_str(tool_name, "tool name")?;
        let arguments = parse_arguments(arguments_json)?;
        crate::log_debug!(format!("executing tool '{}'", name).as_str());
        guarded(|| plugin().execute(&name, arguments))?
    })();
    respond(outcome)
}

/// The v2 identity manifest, or null if the plugin cannot describe itself.
pub fn plugin_manifest_json<'a, T: ToolPlugin>(plugin: impl FnOnce() -> &'a T) -> *const c_char {
    let manifest = guarded(|| PluginManifest::for_identity(&plugin().identity(), ABI_VERSION_V2));
    match manifest.ok().and_then(|m| serde_json::to_string(&m).ok()) {
        Some(json) => into_plugin_string(json),
        None => ptr::null(),
    }
}

/// Boxes a new plugin instance as an opaque context. Null if construction panics.
pub fn create_context<T: ToolPlugin>(constructor: impl FnOnce() -> T) -> OsrPluginCtx {
    match guarded(constructor) {
        Ok(plugin) => Box::into_raw(Box::new(plugin)).cast(),
        Err(err) => {
            crate::log_error!(format!("plugin init failed: {}", err).as_str());
            ptr::null_mut()
        }
    }
}

/// # Safety
/// `ctx` must be null or a context from [`create_context`] with the same `T`
/// that has not been destroyed.
pub unsafe fn destroy_context<T: ToolPlugin>(ctx: OsrPluginCtx) {
    if ctx.is_null() {
        return;
    }
    let plugin = Box::from_raw(ctx.cast::<T>());
    if guarded(move || drop(plugin)).is_err() {
        crate::log_error!("plugin panicked while being destroyed");
    }
}

unsafe fn context_ref<'a, T: ToolPlugin>(ctx: OsrPluginCtx) -> Option<&'a T> {
    ctx.cast::<T>().as_ref()
}

/// # Safety
/// `ctx` must be null or a live context from [`create_context`] with the same `T`.
pub unsafe fn generic_manifest<T: ToolPlugin>(ctx: OsrPluginCtx) -> *const c_char {
    let Some(plugin) = context_ref::<T>(ctx) else {
        return ptr::null();
    };
    let manifest = guarded(|| GenericManifest::describe(plugin));
    match manifest.ok().and_then(|m| serde_json::to_string(&m).ok()) {
        Some(json) => into_plugin_string(json),
        None => ptr::null(),
    }
}

/// # Safety
/// `ctx` as for [`generic_manifest`]; the strings must be null or valid.
pub unsafe fn invoke<T: ToolPlugin>(
    ctx: OsrPluginCtx,
    kind: *const c_char,
    id: *const c_char,
    payload: *const c_char,
) -> *const c_char {
    let outcome = (|| -> Result<Value, ToolError> {
        let plugin = context_ref::<T>(ctx)
            .ok_or_else(|| ToolError::Internal("null plugin context".to_string()))?;
        let kind = required_str(kind, "capability type")?;
        let id = required_str(id, "capability id")?;
        let payload = parse_arguments(payload)?;
        crate::log_debug!(format!("invoking {}/{}", kind, id).as_str());
        guarded(|| plugin.invoke(&kind, &id, payload))?
    })();
    respond(outcome)
}
