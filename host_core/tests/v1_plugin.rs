use std::os::raw::{c_char, c_int};
use std::ptr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard};

use host_core::{AbiVersion, HostError, LoadedPlugin, PermissionPolicy};
use plugin_core::abi::{OsrPluginApiV1, OsrToolSpecV1, OSR_STATUS_INTERNAL, OSR_STATUS_OK};
use plugin_core::strings::{free_string, into_plugin_string, outstanding_strings};
use plugin_core::{declare_plugin_v1, string_arg, PluginIdentity, ToolError, ToolPlugin, ToolSpec};
use serde_json::{json, Value};

static SERIAL: Mutex<()> = Mutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(|e| e.into_inner())
}

struct Calculator;

impl ToolPlugin for Calculator {
    fn identity(&self) -> PluginIdentity {
        PluginIdentity::new("dev.test.calculator", "0.1.0")
    }

    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new("add", "Adds two numbers").parameters(json!({
                "type": "object",
                "properties": { "a": { "type": "number" }, "b": { "type": "number" } },
                "required": ["a", "b"]
            })),
            ToolSpec::new("shout", "Upper-cases text").policy(PermissionPolicy::Auto),
        ]
    }

    fn execute(&self, tool_name: &str, arguments: Value) -> Result<Value, ToolError> {
        match tool_name {
            "add" => {
                let number = |key: &str| {
                    arguments[key]
                        .as_f64()
                        .ok_or_else(|| ToolError::InvalidArguments(key.to_string()))
                };
                let (a, b) = (number("a")?, number("b")?);
                Ok(json!({ "sum": a + b }))
            }
            "shout" => Ok(json!(string_arg(&arguments, "text")?.to_uppercase())),
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }
}

declare_plugin_v1!(Calculator, Calculator);

fn bind() -> LoadedPlugin {
    unsafe { LoadedPlugin::from_entry_v1(osaurus_plugin_entry_v1, "plugin_calculator") }.unwrap()
}

#[test]
fn v1_plugins_are_named_by_the_host() {
    let _serial = serial();
    let plugin = bind();

    assert_eq!(plugin.id(), "plugin_calculator");
    assert_eq!(plugin.abi(), AbiVersion::V1);
    assert!(plugin.version().is_none());
    assert!(plugin.manifest_json().is_none());
    assert_eq!(plugin.tools().len(), 2);
    assert_eq!(plugin.tool("add").unwrap().parameters["required"], json!(["a", "b"]));
    assert_eq!(plugin.tool("add").unwrap().permission_policy, PermissionPolicy::Ask);
    assert_eq!(plugin.tool("shout").unwrap().permission_policy, PermissionPolicy::Auto);
}

#[test]
fn execute_round_trip_releases_strings() {
    let _serial = serial();
    let baseline = outstanding_strings();

    {
        let plugin = bind();
        let sum = plugin.execute("add", &json!({ "a": 2, "b": 0.5 })).unwrap();
        assert_eq!(sum, json!({ "sum": 2.5 }));
        assert_eq!(plugin.execute("shout", &json!({ "text": "hey" })).unwrap(), json!("HEY"));

        match plugin.execute("shout", &json!({ "text": 7 })) {
            Err(HostError::PluginReported { code, .. }) => assert_eq!(code, "invalid_arguments"),
            other => panic!("unexpected result: {:?}", other.map_err(|e| e.to_string())),
        }
    }

    assert_eq!(outstanding_strings(), baseline);
}

#[test]
fn parallel_callers_share_one_plugin() {
    let _serial = serial();
    let plugin = std::sync::Arc::new(bind());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let plugin = std::sync::Arc::clone(&plugin);
            std::thread::spawn(move || plugin.execute("add", &json!({ "a": i, "b": 1 })).unwrap())
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap()["sum"], json!(i as f64 + 1.0));
    }
}

// Hand-built v1 table for malformed tool specs.

const MODE_FAIL_AFTER_FILL: u8 = 0;
const MODE_DUPLICATES: u8 = 1;
const MODE_BAD_POLICY: u8 = 2;
const MODE_WELL_FORMED: u8 = 3;
const MODE_LISTING_FAILS: u8 = 4;

static MODE: AtomicU8 = AtomicU8::new(MODE_FAIL_AFTER_FILL);

unsafe extern "C" fn scripted_tool_count() -> c_int {
    if MODE.load(Ordering::SeqCst) == MODE_LISTING_FAILS {
        OSR_STATUS_INTERNAL
    } else {
        2
    }
}

unsafe extern "C" fn scripted_tool_spec(index: c_int, out: *mut OsrToolSpecV1) -> c_int {
    let mode = MODE.load(Ordering::SeqCst);
    let name = match mode {
        MODE_DUPLICATES => "twin".to_string(),
        _ => format!("tool_{}", index),
    };
    let policy = if mode == MODE_BAD_POLICY { "maybe" } else { "ask" };

    *out = OsrToolSpecV1 {
        name: into_plugin_string(name),
        description: into_plugin_string("scripted"),
        parameters_json: ptr::null(),
        requirements_json: into_plugin_string("[]"),
        permission_policy: into_plugin_string(policy),
    };

    if mode == MODE_FAIL_AFTER_FILL && index == 1 {
        OSR_STATUS_INTERNAL
    } else {
        OSR_STATUS_OK
    }
}

unsafe extern "C" fn scripted_execute(_name: *const c_char, _args: *const c_char) -> *const c_char {
    ptr::null()
}

static SCRIPTED: OsrPluginApiV1 = OsrPluginApiV1 {
    free_string: Some(free_string),
    tool_count: Some(scripted_tool_count),
    get_tool_spec: Some(scripted_tool_spec),
    execute: Some(scripted_execute),
};

extern "C" fn scripted_entry() -> *const OsrPluginApiV1 {
    &SCRIPTED
}

fn bind_scripted(mode: u8) -> Result<LoadedPlugin, HostError> {
    MODE.store(mode, Ordering::SeqCst);
    unsafe { LoadedPlugin::from_entry_v1(scripted_entry, "scripted") }
}

#[test]
fn nonzero_status_is_an_error_and_filled_fields_are_freed() {
    let _serial = serial();
    let baseline = outstanding_strings();

    assert!(matches!(
        bind_scripted(MODE_FAIL_AFTER_FILL),
        Err(HostError::ToolSpec { index: 1, status: OSR_STATUS_INTERNAL })
    ));
    assert_eq!(outstanding_strings(), baseline);
}

#[test]
fn duplicate_names_and_unknown_policies_are_rejected() {
    let _serial = serial();
    let baseline = outstanding_strings();

    assert!(matches!(
        bind_scripted(MODE_DUPLICATES),
        Err(HostError::DuplicateTool(name)) if name == "twin"
    ));
    assert!(matches!(
        bind_scripted(MODE_BAD_POLICY),
        Err(HostError::InvalidToolSpec { tool, .. }) if tool == "tool_0"
    ));
    assert_eq!(outstanding_strings(), baseline);
}

#[test]
fn empty_response_is_reported() {
    let _serial = serial();
    let plugin = bind_scripted(MODE_WELL_FORMED).unwrap();
    assert_eq!(plugin.tools().len(), 2);
    assert!(matches!(
        plugin.execute("tool_0", &json!({})),
        Err(HostError::EmptyResponse(id)) if id == "tool_0"
    ));
}

#[test]
fn failed_tool_listing_rejects_the_plugin() {
    let _serial = serial();
    assert!(matches!(bind_scripted(MODE_LISTING_FAILS), Err(HostError::InvalidManifest(_))));
}
