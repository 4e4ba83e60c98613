//! Opens the workspace's plugin libraries through the dynamic loader.

use std::path::PathBuf;

use host_core::plugin_utils::resolve_plugin_binary_path;
use host_core::{
    load_plugin, load_plugin_as, AbiVersion, HostError, PermissionPolicy, PluginRegistry,
};
use serde_json::json;

/// Cargo leaves dependency cdylibs in `deps/`, next to this test binary;
/// a workspace build also copies them one level up.
fn library(name: &str) -> PathBuf {
    let exe = std::env::current_exe().unwrap();
    let deps = exe.parent().unwrap();
    let found = [Some(deps), deps.parent()]
        .into_iter()
        .flatten()
        .map(|dir| resolve_plugin_binary_path(dir, name))
        .find(|path| path.exists())
        .unwrap_or_else(|| panic!("{} was not built next to {}", name, exe.display()));
    found
}

#[test]
fn echo_binds_through_the_v2_table() {
    let plugin = load_plugin(library("plugin_echo")).unwrap();

    assert_eq!(plugin.abi(), AbiVersion::V2);
    assert_eq!(plugin.id(), "com.acme.echo");
    assert_eq!(plugin.version().map(|v| v.to_string()).as_deref(), Some("1.2.0"));
    assert_eq!(plugin.tool("repeat").unwrap().permission_policy, PermissionPolicy::Ask);
    let reversed = plugin.execute("reverse", &json!({ "text": "abc" })).unwrap();
    assert_eq!(reversed, json!({ "text": "cba" }));
    assert!(plugin.manifest_json().is_some());
}

#[test]
fn clock_binds_through_the_v1_table_and_is_named_after_its_file() {
    let plugin = load_plugin(library("plugin_clock")).unwrap();

    assert_eq!(plugin.abi(), AbiVersion::V1);
    assert_eq!(plugin.id(), "plugin_clock");
    assert!(plugin.version().is_none());
    assert!(plugin.manifest_json().is_none());
    assert_eq!(plugin.tool("now").unwrap().requirements, vec!["system_clock"]);

    let diff = plugin
        .execute(
            "diff_seconds",
            &json!({ "from": "2024-01-01T00:00:00Z", "to": "2024-01-01T00:02:00Z" }),
        )
        .unwrap();
    assert_eq!(diff["seconds"], 120);

    match plugin.execute("now", &json!({ "utc_offset_minutes": i64::MAX })) {
        Err(HostError::PluginReported { code, .. }) => assert_eq!(code, "invalid_arguments"),
        other => panic!("unexpected result: {:?}", other.map_err(|e| e.to_string())),
    }
}

#[test]
fn textkit_binds_through_the_generic_table() {
    let plugin = load_plugin(library("plugin_textkit")).unwrap();

    assert_eq!(plugin.abi(), AbiVersion::Generic);
    assert_eq!(plugin.id(), "dev.osaurus.textkit");
    assert_eq!(plugin.execute("word_count", &json!({ "text": "one two" })).unwrap()["words"], 2);
    let upper = plugin.invoke("tool", "uppercase", &json!({ "text": "abc" })).unwrap();
    assert_eq!(upper["text"], "ABC");
}

#[test]
fn forcing_an_unexported_table_is_missing_entry() {
    let echo = library("plugin_echo");
    for abi in [AbiVersion::Generic, AbiVersion::V1] {
        let forced = load_plugin_as(&echo, abi);
        assert!(matches!(forced, Err(HostError::MissingEntry { .. })));
    }

    let clock = load_plugin_as(library("plugin_clock"), AbiVersion::V1).unwrap();
    assert_eq!(clock.abi(), AbiVersion::V1);
}

#[test]
fn all_three_share_one_registry() {
    let registry = PluginRegistry::new();
    for name in ["plugin_textkit", "plugin_clock", "plugin_echo"] {
        registry.register(load_plugin(library(name)).unwrap()).unwrap();
    }

    let ids: Vec<String> = registry.all().iter().map(|p| p.id().to_string()).collect();
    assert_eq!(ids, ["com.acme.echo", "dev.osaurus.textkit", "plugin_clock"]);
    assert_eq!(registry.find_tool("slugify").unwrap().id(), "dev.osaurus.textkit");
}
