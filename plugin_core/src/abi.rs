//! Binary contract between an Osaurus host and a native tool plugin.
//!
//! Three table layouts exist. A plugin exports exactly one entry symbol per
//! layout it supports; the host resolves it with `dlsym`, calls it once, and
//! keeps the returned pointer for as long as the library stays mapped.
//!
//! | Layout  | Entry symbol              | Description                       | Invocation       |
//! |---------|---------------------------|-----------------------------------|------------------|
//! | generic | `osaurus_plugin_entry`    | `get_manifest(ctx)` JSON          | `invoke(ctx, ..)`|
//! | v1      | `osaurus_plugin_entry_v1` | `tool_count`, `get_tool_spec`     | `execute(..)`    |
//! | v2      | `osaurus_plugin_entry_v2` | v1 + `get_plugin_manifest_json`   | `execute(..)`    |
//!
//! Every function pointer is wrapped in `Option` so a null slot in a table
//! built by a foreign toolchain is representable; the layout is identical to
//! a plain C function pointer.
//!
//! ### Memory Ownership
//! Every `*const c_char` handed from the plugin to the host is a UTF-8,
//! NUL-terminated buffer allocated by the plugin. The host must release it by
//! calling the same plugin's `free_string`, never its own allocator.

use std::ffi::c_void;
use std::os::raw::{c_char, c_int};

/// Opaque context produced by a generic plugin's `init`.
///
/// The host stores it and passes it back unchanged; it never dereferences it.
pub type OsrPluginCtx = *mut c_void;

pub type FreeStringFn = unsafe extern "C" fn(s: *const c_char);
pub type GetToolSpecFn = unsafe extern "C" fn(index: c_int, out_spec: *mut OsrToolSpecV1) -> c_int;
pub type ExecuteFn =
    unsafe extern "C" fn(tool_name: *const c_char, arguments_json: *const c_char) -> *const c_char;

pub const ENTRY_SYMBOL: &str = "osaurus_plugin_entry";
pub const ENTRY_SYMBOL_V1: &str = "osaurus_plugin_entry_v1";
pub const ENTRY_SYMBOL_V2: &str = "osaurus_plugin_entry_v2";

/// ABI numbers. Only v2 reports its number, in the identity manifest.
pub const ABI_VERSION_V1: u32 = 1;
pub const ABI_VERSION_V2: u32 = 2;

/// Wire values of `OsrToolSpecV1::permission_policy`.
pub const POLICY_AUTO: &str = "auto";
pub const POLICY_ASK: &str = "ask";
pub const POLICY_DENY: &str = "deny";

/// `get_tool_spec` succeeded.
pub const OSR_STATUS_OK: c_int = 0;
/// Null output pointer or negative index.
pub const OSR_STATUS_INVALID_ARGUMENT: c_int = -1;
/// Index past `tool_count()`.
pub const OSR_STATUS_OUT_OF_RANGE: c_int = -2;
/// The plugin failed internally while describing the tool.
pub const OSR_STATUS_INTERNAL: c_int = -3;

/// Generic function table returned by `osaurus_plugin_entry`.
#[repr(C)]
pub struct OsrPluginApi {
    /// Free a string returned by the plugin.
    pub free_string: Option<FreeStringFn>,

    /// Initialize the plugin. Returns an opaque context or null on failure.
    pub init: Option<unsafe extern "C" fn() -> OsrPluginCtx>,

    /// Destroy a context returned by `init` and release its resources.
    pub destroy: Option<unsafe extern "C" fn(ctx: OsrPluginCtx)>,

    /// JSON describing the plugin and its capabilities (tools, providers, ...).
    /// The host calls `free_string` on the result.
    pub get_manifest: Option<unsafe extern "C" fn(ctx: OsrPluginCtx) -> *const c_char>,

    /// Generic invocation point.
    ///
    /// - `kind`: capability type, e.g. `"tool"` or `"provider"`.
    /// - `id`: capability identifier, e.g. the tool name.
    /// - `payload`: JSON arguments.
    ///
    /// Returns a JSON response the host releases with `free_string`.
    pub invoke: Option<
        unsafe extern "C" fn(
            ctx: OsrPluginCtx,
            kind: *const c_char,
            id: *const c_char,
            payload: *const c_char,
        ) -> *const c_char,
    >,
}

/// One tool as described by `get_tool_spec`.
///
/// All fields are plugin-allocated strings; the host copies them and then
/// releases each non-null field through `free_string`.
#[repr(C)]
#[derive(Debug)]
pub struct OsrToolSpecV1 {
    /// Tool id.
    pub name: *const c_char,
    /// Human readable description.
    pub description: *const c_char,
    /// JSON Schema of the arguments object.
    pub parameters_json: *const c_char,
    /// JSON array of requirement strings.
    pub requirements_json: *const c_char,
    /// `"auto"`, `"ask"` or `"deny"`.
    pub permission_policy: *const c_char,
}

impl OsrToolSpecV1 {
    pub const fn empty() -> Self {
        OsrToolSpecV1 {
            name: std::ptr::null(),
            description: std::ptr::null(),
            parameters_json: std::ptr::null(),
            requirements_json: std::ptr::null(),
            permission_policy: std::ptr::null(),
        }
    }

    /// Fields in declaration order, for bulk release.
    pub fn fields(&self) -> [*const c_char; 5] {
        [
            self.name,
            self.description,
            self.parameters_json,
            self.requirements_json,
            self.permission_policy,
        ]
    }
}

impl Default for OsrToolSpecV1 {
    fn default() -> Self {
        Self::empty()
    }
}

/// Table returned by `osaurus_plugin_entry_v1`.
#[repr(C)]
pub struct OsrPluginApiV1 {
    /// Memory management implemented by the plugin.
    pub free_string: Option<FreeStringFn>,

    /// Number of tools the plugin exposes.
    pub tool_count: Option<unsafe extern "C" fn() -> c_int>,

    /// Fills `out_spec` for the tool at `index`. `0` means success.
    pub get_tool_spec: Option<GetToolSpecFn>,

    /// Runs a tool. Returns a plugin-allocated UTF-8 JSON string.
    pub execute: Option<ExecuteFn>,
}

/// Table returned by `osaurus_plugin_entry_v2`.
///
/// The first four fields match [`OsrPluginApiV1`] exactly.
#[repr(C)]
pub struct OsrPluginApiV2 {
    pub free_string: Option<FreeStringFn>,
    pub tool_count: Option<unsafe extern "C" fn() -> c_int>,
    pub get_tool_spec: Option<GetToolSpecFn>,
    pub execute: Option<ExecuteFn>,

    /// Identity manifest for host-side validation, e.g.
    /// `{"plugin_id":"com.acme.echo","version":"1.2.0","abi":2}`.
    pub get_plugin_manifest_json: Option<unsafe extern "C" fn() -> *const c_char>,
}

pub type EntryFn = unsafe extern "C" fn() -> *const OsrPluginApi;
pub type EntryFnV1 = unsafe extern "C" fn() -> *const OsrPluginApiV1;
pub type EntryFnV2 = unsafe extern "C" fn() -> *const OsrPluginApiV2;
