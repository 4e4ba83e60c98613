/// Exports `osaurus_plugin_entry_v1` for a [`ToolPlugin`](crate::ToolPlugin).
///
/// ```ignore
/// declare_plugin_v1!(ClockPlugin, ClockPlugin::new());
/// ```
///
/// One instance is built lazily on first use and shared for the life of the
/// library.
#[macro_export]
macro_rules! declare_plugin_v1 {
    ($plugin_ty:ty, $constructor:expr) => {
        #[doc(hidden)]
        mod __osaurus_plugin_v1 {
            use super::*;
            use std::os::raw::{c_char, c_int};

            static INSTANCE: $crate::__private::OnceCell<$plugin_ty> =
                $crate::__private::OnceCell::new();

            fn instance() -> &'static $plugin_ty {
                INSTANCE.get_or_init(|| {
                    $crate::logging::init_logger(stringify!($plugin_ty));
                    $constructor
                })
            }

            unsafe extern "C" fn tool_count() -> c_int {
                $crate::runtime::tool_count(instance)
            }

            unsafe extern "C" fn get_tool_spec(
                index: c_int,
                out_spec: *mut $crate::abi::OsrToolSpecV1,
            ) -> c_int {
                $crate::runtime::get_tool_spec(instance, index, out_spec)
            }

            unsafe extern "C" fn execute(
                tool_name: *const c_char,
                arguments_json: *const c_char,
            ) -> *const c_char {
                $crate::runtime::execute(instance, tool_name, arguments_json)
            }

            pub(super) static API: $crate::abi::OsrPluginApiV1 = $crate::abi::OsrPluginApiV1 {
                free_string: Some($crate::strings::free_string),
                tool_count: Some(tool_count),
                get_tool_spec: Some(get_tool_spec),
                execute: Some(execute),
            };
        }

        #[no_mangle]
        pub extern "C" fn osaurus_plugin_entry_v1() -> *const $crate::abi::OsrPluginApiV1 {
            &__osaurus_plugin_v1::API
        }
    };
}

/// Exports `osaurus_plugin_entry_v2`: the v1 table plus the identity manifest
/// built from [`ToolPlugin::identity`](crate::ToolPlugin::identity).
#[macro_export]
macro_rules! declare_plugin_v2 {
    ($plugin_ty:ty, $constructor:expr) => {
        #[doc(hidden)]
        mod __osaurus_plugin_v2 {
            use super::*;
            use std::os::raw::{c_char, c_int};

            static INSTANCE: $crate::__private::OnceCell<$plugin_ty> =
                $crate::__private::OnceCell::new();

            fn instance() -> &'static $plugin_ty {
                INSTANCE.get_or_init(|| {
                    $crate::logging::init_logger(stringify!($plugin_ty));
                    $constructor
                })
            }

            unsafe extern "C" fn tool_count() -> c_int {
                $crate::runtime::tool_count(instance)
            }

            unsafe extern "C" fn get_tool_spec(
                index: c_int,
                out_spec: *mut $crate::abi::OsrToolSpecV1,
            ) -> c_int {
                $crate::runtime::get_tool_spec(instance, index, out_spec)
            }

            unsafe extern "C" fn execute(
                tool_name: *const c_char,
                arguments_json: *const c_char,
            ) -> *const c_char {
                $crate::runtime::execute(instance, tool_name, arguments_json)
            }

            unsafe extern "C" fn get_plugin_manifest_json() -> *const c_char {
                $crate::runtime::plugin_manifest_json(instance)
            }

            pub(super) static API: $crate::abi::OsrPluginApiV2 = $crate::abi::OsrPluginApiV2 {
                free_string: Some($crate::strings::free_string),
                tool_count: Some(tool_count),
                get_tool_spec: Some(get_tool_spec),
                execute: Some(execute),
                get_plugin_manifest_json: Some(get_plugin_manifest_json),
            };
        }

        #[no_mangle]
        pub extern "C" fn osaurus_plugin_entry_v2() -> *const $crate::abi::OsrPluginApiV2 {
            &__osaurus_plugin_v2::API
        }
    };
}

/// Exports `osaurus_plugin_entry`, the context-based generic table.
///
/// Each `init` builds a fresh instance with `$constructor`; `destroy` drops it.
#[macro_export]
macro_rules! declare_plugin {
    ($plugin_ty:ty, $constructor:expr) => {
        #[doc(hidden)]
        mod __osaurus_plugin_generic {
            use super::*;
            use std::os::raw::c_char;
            use $crate::abi::OsrPluginCtx;

            unsafe extern "C" fn init() -> OsrPluginCtx {
                $crate::logging::init_logger(stringify!($plugin_ty));
                $crate::runtime::create_context::<$plugin_ty>(|| $constructor)
            }

            unsafe extern "C" fn destroy(ctx: OsrPluginCtx) {
                $crate::runtime::destroy_context::<$plugin_ty>(ctx)
            }

            unsafe extern "C" fn get_manifest(ctx: OsrPluginCtx) -> *const c_char {
                $crate::runtime::generic_manifest::<$plugin_ty>(ctx)
            }

            unsafe extern "C" fn invoke(
                ctx: OsrPluginCtx,
                kind: *const c_char,
                id: *const c_char,
                payload: *const c_char,
            ) -> *const c_char {
                $crate::runtime::invoke::<$plugin_ty>(ctx, kind, id, payload)
            }

            pub(super) static API: $crate::abi::OsrPluginApi = $crate::abi::OsrPluginApi {
                free_string: Some($crate::strings::free_string),
                init: Some(init),
                destroy: Some(destroy),
                get_manifest: Some(get_manifest),
                invoke: Some(invoke),
            };
        }

        #[no_mangle]
        pub extern "C" fn osaurus_plugin_entry() -> *const $crate::abi::OsrPluginApi {
            &__osaurus_plugin_generic::API
        }
    };
}
