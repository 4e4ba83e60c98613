use std::path::Path;

use libloading::Library;
use liblogger::{log_debug, log_info};
use plugin_core::abi::{EntryFn, EntryFnV1, EntryFnV2};

use crate::abi_version::AbiVersion;
use crate::error::{HostError, HostResult};
use crate::plugin::LoadedPlugin;
use crate::plugin_binding::PluginBinding;

/// Id given to a v1 plugin, which cannot name itself: the file stem without
/// a `lib` prefix, e.g. `libplugin_clock.so` -> `plugin_clock`.
pub fn plugin_id_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match stem.strip_prefix("lib") {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => stem,
    }
}

fn open_library(path: &Path) -> HostResult<Library> {
    unsafe { Library::new(path) }.map_err(|source| HostError::Library {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves `abi`'s entry symbol and builds a binding from the table it returns.
/// `Ok(None)` means the library does not export that symbol.
unsafe fn resolve(library: &Library, abi: AbiVersion) -> HostResult<Option<PluginBinding>> {
    let binding = match abi {
        AbiVersion::Generic => match library.get::<EntryFn>(abi.symbol_bytes()) {
            Ok(entry) => PluginBinding::from_generic(entry())?,
            Err(_) => return Ok(None),
        },
        AbiVersion::V1 => match library.get::<EntryFnV1>(abi.symbol_bytes()) {
            Ok(entry) => PluginBinding::from_v1(entry())?,
            Err(_) => return Ok(None),
        },
        AbiVersion::V2 => match library.get::<EntryFnV2>(abi.symbol_bytes()) {
            Ok(entry) => PluginBinding::from_v2(entry())?,
            Err(_) => return Ok(None),
        },
    };
    Ok(Some(binding))
}

/// Loads a plugin library, binding the newest table it exports
/// (v2, then v1, then generic).
pub fn load_plugin<P: AsRef<Path>>(path: P) -> HostResult<LoadedPlugin> {
    let path = path.as_ref();
    log_debug!(&format!("opening plugin library {}", path.display()));
    let library = open_library(path)?;

    for abi in AbiVersion::DETECTION_ORDER {
        if let Some(binding) = unsafe { resolve(&library, abi)? } {
            log_info!(&format!("{} exports {}", path.display(), abi.entry_symbol()));
            return LoadedPlugin::bind(binding, Some(library), &plugin_id_from_path(path));
        }
    }

    Err(HostError::MissingEntry {
        path: path.to_path_buf(),
    })
}

/// Loads a plugin through one specific table, ignoring any others it exports.
pub fn load_plugin_as<P: AsRef<Path>>(path: P, abi: AbiVersion) -> HostResult<LoadedPlugin> {
    let path = path.as_ref();
    let library = open_library(path)?;

    match unsafe { resolve(&library, abi)? } {
        Some(binding) => LoadedPlugin::bind(binding, Some(library), &plugin_id_from_path(path)),
        None => Err(HostError::MissingEntry {
            path: path.to_path_buf(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn ids_from_library_names() {
        let built = PathBuf::from("target/debug/libplugin_clock.so");
        assert_eq!(plugin_id_from_path(&built), "plugin_clock");
        assert_eq!(plugin_id_from_path(&PathBuf::from("plugin_clock.dll")), "plugin_clock");
        assert_eq!(plugin_id_from_path(&PathBuf::from("lib.so")), "lib");
    }

    #[test]
    fn missing_library_is_a_library_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_plugin(dir.path().join("libnothing.so")).unwrap_err();
        assert!(matches!(err, HostError::Library { .. }));
    }

    #[test]
    fn garbage_file_is_not_a_plugin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("libgarbage.so");
        std::fs::write(&path, b"not a shared object").unwrap();
        assert!(matches!(load_plugin_as(&path, AbiVersion::V1), Err(HostError::Library { .. })));
    }
}
