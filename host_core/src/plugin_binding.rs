use std::ffi::CStr;
use std::os::raw::{c_char, c_int};

use plugin_core::abi::{
    ExecuteFn, FreeStringFn, GetToolSpecFn, OsrPluginApi, OsrPluginApiV1, OsrPluginApiV2,
    OsrPluginCtx, OsrToolSpecV1,
};

use crate::abi_version::AbiVersion;
use crate::error::{HostError, HostResult};
use crate::plugin_string::{take_plugin_string, PluginString};

type ToolCountFn = unsafe extern "C" fn() -> c_int;
type ManifestFn = unsafe extern "C" fn() -> *const c_char;
type InitFn = unsafe extern "C" fn() -> OsrPluginCtx;
type DestroyFn = unsafe extern "C" fn(OsrPluginCtx);
type GetManifestFn = unsafe extern "C" fn(OsrPluginCtx) -> *const c_char;
type InvokeFn = unsafe extern "C" fn(
    OsrPluginCtx,
    *const c_char,
    *const c_char,
    *const c_char,
) -> *const c_char;

fn required<F>(slot: Option<F>, name: &'static str) -> HostResult<F> {
    slot.ok_or(HostError::MissingFunction(name))
}

fn null_table(abi: AbiVersion) -> HostError {
    HostError::NullTable {
        symbol: abi.entry_symbol(),
    }
}

/// The host's copy of a plugin table: every required slot checked non-null
/// and copied out, so the table itself is read exactly once.
///
/// A binding is only sound while the library it came from stays mapped;
/// `LoadedPlugin` owns both and is the only public way to reach one.
#[derive(Clone, Copy)]
pub(crate) enum PluginBinding {
    Generic(GenericBinding),
    Tools(ToolsBinding),
}

/// v1 and v2 tables. `plugin_manifest` is present only for v2.
#[derive(Clone, Copy)]
pub(crate) struct ToolsBinding {
    free_string: FreeStringFn,
    tool_count: ToolCountFn,
    get_tool_spec: GetToolSpecFn,
    execute: ExecuteFn,
    plugin_manifest: Option<ManifestFn>,
}

#[derive(Clone, Copy)]
pub(crate) struct GenericBinding {
    free_string: FreeStringFn,
    init: InitFn,
    destroy: DestroyFn,
    get_manifest: GetManifestFn,
    invoke: InvokeFn,
}

/// A tool spec copied out of plugin memory. Absent fields were null.
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct RawToolSpec {
    pub name: Option<String>,
    pub description: Option<String>,
    pub parameters_json: Option<String>,
    pub requirements_json: Option<String>,
    pub permission_policy: Option<String>,
}

impl PluginBinding {
    /// # Safety
    /// `table` must be null or point to a valid `OsrPluginApi`.
    pub unsafe fn from_generic(table: *const OsrPluginApi) -> HostResult<Self> {
        let table = table.as_ref().ok_or(null_table(AbiVersion::Generic))?;
        Ok(PluginBinding::Generic(GenericBinding {
            free_string: required(table.free_string, "free_string")?,
            init: required(table.init, "init")?,
            destroy: required(table.destroy, "destroy")?,
            get_manifest: required(table.get_manifest, "get_manifest")?,
            invoke: required(table.invoke, "invoke")?,
        }))
    }

    /// # Safety
    /// `table` must be null or point to a valid `OsrPluginApiV1`.
    pub unsafe fn from_v1(table: *const OsrPluginApiV1) -> HostResult<Self> {
        let table = table.as_ref().ok_or(null_table(AbiVersion::V1))?;
        Ok(PluginBinding::Tools(ToolsBinding {
            free_string: required(table.free_string, "free_string")?,
            tool_count: required(table.tool_count, "tool_count")?,
            get_tool_spec: required(table.get_tool_spec, "get_tool_spec")?,
            execute: required(table.execute, "execute")?,
            plugin_manifest: None,
        }))
    }

    /// # Safety
    /// `table` must be null or point to a valid `OsrPluginApiV2`.
    pub unsafe fn from_v2(table: *const OsrPluginApiV2) -> HostResult<Self> {
        let table = table.as_ref().ok_or(null_table(AbiVersion::V2))?;
        Ok(PluginBinding::Tools(ToolsBinding {
            free_string: required(table.free_string, "free_string")?,
            tool_count: required(table.tool_count, "tool_count")?,
            get_tool_spec: required(table.get_tool_spec, "get_tool_spec")?,
            execute: required(table.execute, "execute")?,
            plugin_manifest: Some(required(
                table.get_plugin_manifest_json,
                "get_plugin_manifest_json",
            )?),
        }))
    }

    pub fn abi(&self) -> AbiVersion {
        match self {
            PluginBinding::Generic(_) => AbiVersion::Generic,
            PluginBinding::Tools(tools) if tools.plugin_manifest.is_some() => AbiVersion::V2,
            PluginBinding::Tools(_) => AbiVersion::V1,
        }
    }
}

impl ToolsBinding {
    pub fn tool_count(&self) -> i32 {
        unsafe { (self.tool_count)() }
    }

    /// Copies the tool spec at `index`, then releases every field the plugin filled,
    /// whatever the status.
    pub fn tool_spec(&self, index: i32) -> HostResult<RawToolSpec> {
        let mut spec = OsrToolSpecV1::empty();
        let status = unsafe { (self.get_tool_spec)(index, &mut spec) };

        let [name, description, parameters_json, requirements_json, permission_policy] =
            spec.fields().map(|ptr| unsafe { PluginString::from_raw(ptr, &self.free_string) });

        if status != 0 {
            return Err(HostError::ToolSpec { index, status });
        }

        Ok(RawToolSpec {
            name: name.map(PluginString::into_string),
            description: description.map(PluginString::into_string),
            parameters_json: parameters_json.map(PluginString::into_string),
            requirements_json: requirements_json.map(PluginString::into_string),
            permission_policy: permission_policy.map(PluginString::into_string),
        })
    }

    pub fn execute(&self, tool_name: &CStr, arguments_json: &CStr) -> Option<String> {
        unsafe {
            let response = (self.execute)(tool_name.as_ptr(), arguments_json.as_ptr());
            take_plugin_string(response, &self.free_string)
        }
    }

    /// `None` for v1 tables, `Some(None)` if a v2 plugin returned null.
    pub fn plugin_manifest_json(&self) -> Option<Option<String>> {
        self.plugin_manifest
            .map(|manifest| unsafe { take_plugin_string(manifest(), &self.free_string) })
    }
}

impl GenericBinding {
    pub fn init(&self) -> OsrPluginCtx {
        unsafe { (self.init)() }
    }

    /// # Safety
    /// `ctx` must come from [`GenericBinding::init`] and not be destroyed yet.
    pub unsafe fn destroy(&self, ctx: OsrPluginCtx) {
        (self.destroy)(ctx)
    }

    /// # Safety
    /// `ctx` must be a live context from this binding.
    pub unsafe fn get_manifest(&self, ctx: OsrPluginCtx) -> Option<String> {
        take_plugin_string((self.get_manifest)(ctx), &self.free_string)
    }

    /// # Safety
    /// `ctx` must be a live context from this binding.
    pub unsafe fn invoke(
        &self,
        ctx: OsrPluginCtx,
        kind: &CStr,
        id: &CStr,
        payload: &CStr,
    ) -> Option<String> {
        let response = (self.invoke)(ctx, kind.as_ptr(), id.as_ptr(), payload.as_ptr());
        take_plugin_string(response, &self.free_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_tables_are_rejected() {
        let err = unsafe { PluginBinding::from_v2(std::ptr::null()) }.err().unwrap();
        assert!(matches!(err, HostError::NullTable { symbol: "osaurus_plugin_entry_v2" }));
    }

    #[test]
    fn empty_slots_are_reported_by_name() {
        let table = OsrPluginApiV1 {
            free_string: None,
            tool_count: None,
            get_tool_spec: None,
            execute: None,
        };
        let err = unsafe { PluginBinding::from_v1(&table) }.err().unwrap();
        assert!(matches!(err, HostError::MissingFunction("free_string")));
    }
}
