use std::path::PathBuf;

use crate::abi_version::AbiVersion;

/// Everything that can go wrong between resolving a plugin and reading its answer.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("failed to load plugin library {path}: {source}")]
    Library {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("{path} exports none of the osaurus plugin entry symbols")]
    MissingEntry { path: PathBuf },

    #[error("entry symbol {symbol} returned a null table")]
    NullTable { symbol: &'static str },

    #[error("plugin table has no '{0}' function")]
    MissingFunction(&'static str),

    #[error("plugin init returned a null context")]
    InitFailed,

    #[error("invalid plugin manifest: {0}")]
    InvalidManifest(String),

    #[error("plugin declares abi {found}, host expects {expected}")]
    AbiMismatch { expected: u32, found: u32 },

    #[error("get_tool_spec({index}) failed with status {status}")]
    ToolSpec { index: i32, status: i32 },

    #[error("invalid spec for tool '{tool}': {reason}")]
    InvalidToolSpec { tool: String, reason: String },

    #[error("tool '{0}' is declared more than once")]
    DuplicateTool(String),

    #[error("plugin {plugin} has no tool named '{tool}'")]
    UnknownTool { plugin: String, tool: String },

    #[error("{abi} plugins only accept 'tool' invocations, got '{kind}'")]
    UnsupportedCapability { abi: AbiVersion, kind: String },

    #[error("plugin returned no response for '{0}'")]
    EmptyResponse(String),

    #[error("plugin returned malformed JSON for '{id}': {reason}")]
    InvalidResponse { id: String, reason: String },

    #[error("plugin reported {code}: {message}")]
    PluginReported { code: String, message: String },

    #[error("a plugin with id '{0}' is already registered")]
    DuplicatePlugin(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("string passed to the plugin contains a NUL byte")]
    InteriorNul(#[from] std::ffi::NulError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type HostResult<T> = Result<T, HostError>;
