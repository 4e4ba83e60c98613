#[cfg(feature = "logging")]
pub use liblogger::{log_debug, log_error, log_info, log_warn};

#[cfg(not(feature = "logging"))]
mod no_op_macros {
    #[macro_export]
    macro_rules! log_debug {
        ($($arg:tt)*) => {};
    }

    #[macro_export]
    macro_rules! log_info {
        ($($arg:tt)*) => {};
    }

    #[macro_export]
    macro_rules! log_warn {
        ($($arg:tt)*) => {};
    }

    #[macro_export]
    macro_rules! log_error {
        ($($arg:tt)*) => {};
    }
}

pub mod abi;
pub mod logging;
pub mod manifest;
pub mod plugin_macros;
pub mod runtime;
pub mod strings;
pub mod tool;

pub use abi::{OsrPluginApi, OsrPluginApiV1, OsrPluginApiV2, OsrPluginCtx, OsrToolSpecV1};
pub use manifest::{Capabilities, GenericManifest, ManifestTool, PluginManifest};
pub use tool::{
    string_arg, PermissionPolicy, PluginIdentity, ToolError, ToolPlugin, ToolSpec, UnknownPolicy,
};

#[doc(hidden)]
pub mod __private {
    pub use once_cell::sync::OnceCell;
}
