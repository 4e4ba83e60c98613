use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::path::{Path, PathBuf};

/// File name the platform gives a shared library built from crate `name`:
/// `lib<name>.so`, `lib<name>.dylib` or `<name>.dll`.
pub fn resolve_plugin_filename(name: &str) -> String {
    format!("{}{}{}", DLL_PREFIX, name, DLL_SUFFIX)
}

/// `folder` joined with the platform library name for `name`.
pub fn resolve_plugin_binary_path<P: AsRef<Path>>(folder: P, name: &str) -> PathBuf {
    folder.as_ref().join(resolve_plugin_filename(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_names() {
        let file = resolve_plugin_filename("plugin_echo");
        if cfg!(target_os = "windows") {
            assert_eq!(file, "plugin_echo.dll");
        } else if cfg!(target_os = "macos") {
            assert_eq!(file, "libplugin_echo.dylib");
        } else {
            assert_eq!(file, "libplugin_echo.so");
        }
        let path = resolve_plugin_binary_path("target/debug", "plugin_echo");
        assert_eq!(path, Path::new("target/debug").join(file));
    }
}
