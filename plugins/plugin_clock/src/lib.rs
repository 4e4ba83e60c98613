//! Clock plugin, exported through the v1 table.
//!
//! v1 carries no identity; hosts name it after its library file.

use chrono::{DateTime, Duration, FixedOffset, SecondsFormat, Utc};
use plugin_core::{
    declare_plugin_v1, log_debug, string_arg, PermissionPolicy, PluginIdentity, ToolError,
    ToolPlugin, ToolSpec,
};
use serde_json::{json, Value};

#[derive(Default)]
pub struct ClockPlugin;

fn offset_from_minutes(minutes: i64) -> Result<FixedOffset, ToolError> {
    minutes
        .checked_mul(60)
        .and_then(|seconds| i32::try_from(seconds).ok())
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| {
            ToolError::InvalidArguments(format!("offset of {} minutes is out of range", minutes))
        })
}

fn parse_rfc3339(text: &str) -> Result<DateTime<FixedOffset>, ToolError> {
    DateTime::parse_from_rfc3339(text)
        .map_err(|e| {
            ToolError::InvalidArguments(format!("'{}' is not an RFC 3339 timestamp: {}", text, e))
        })
}

impl ClockPlugin {
    pub fn new() -> Self {
        ClockPlugin
    }

    fn now(&self, arguments: &Value, now: DateTime<Utc>) -> Result<Value, ToolError> {
        let minutes = arguments.get("utc_offset_minutes").and_then(Value::as_i64).unwrap_or(0);
        let local = now.with_timezone(&offset_from_minutes(minutes)?);
        Ok(json!({
            "iso8601": local.to_rfc3339_opts(SecondsFormat::Secs, false),
            "unix_seconds": now.timestamp(),
        }))
    }

    fn add_seconds(&self, arguments: &Value) -> Result<Value, ToolError> {
        let start = parse_rfc3339(string_arg(arguments, "timestamp")?)?;
        let seconds = arguments
            .get("seconds")
            .and_then(Value::as_i64)
            .ok_or_else(|| {
                ToolError::InvalidArguments("'seconds' must be an integer".to_string())
            })?;
        let shifted = Duration::try_seconds(seconds)
            .and_then(|delta| start.checked_add_signed(delta))
            .ok_or_else(|| ToolError::Failed(format!("adding {} seconds overflows", seconds)))?;
        Ok(json!({ "iso8601": shifted.to_rfc3339_opts(SecondsFormat::Secs, false) }))
    }

    fn diff_seconds(&self, arguments: &Value) -> Result<Value, ToolError> {
        let from = parse_rfc3339(string_arg(arguments, "from")?)?;
        let to = parse_rfc3339(string_arg(arguments, "to")?)?;
        Ok(json!({ "seconds": (to - from).num_seconds() }))
    }
}

impl ToolPlugin for ClockPlugin {
    fn identity(&self) -> PluginIdentity {
        PluginIdentity::new("dev.osaurus.clock", env!("CARGO_PKG_VERSION"))
    }

    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new("now", "Current time, optionally shifted to a UTC offset")
                .parameters(json!({
                    "type": "object",
                    "properties": { "utc_offset_minutes": { "type": "integer" } }
                }))
                .requirement("system_clock")
                .policy(PermissionPolicy::Auto),
            ToolSpec::new("add_seconds", "Adds a number of seconds to an RFC 3339 timestamp")
                .parameters(json!({
                    "type": "object",
                    "properties": {
                        "timestamp": { "type": "string", "format": "date-time" },
                        "seconds": { "type": "integer" }
                    },
                    "required": ["timestamp", "seconds"]
                })),
            ToolSpec::new("diff_seconds", "Seconds from one RFC 3339 timestamp to another")
                .parameters(json!({
                    "type": "object",
                    "properties": {
                        "from": { "type": "string", "format": "date-time" },
                        "to": { "type": "string", "format": "date-time" }
                    },
                    "required": ["from", "to"]
                })),
        ]
    }

    fn execute(&self, tool_name: &str, arguments: Value) -> Result<Value, ToolError> {
        log_debug!(&format!("clock plugin running {}", tool_name));
        match tool_name {
            "now" => self.now(&arguments, Utc::now()),
            "add_seconds" => self.add_seconds(&arguments),
            "diff_seconds" => self.diff_seconds(&arguments),
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }
}

declare_plugin_v1!(ClockPlugin, ClockPlugin::new());

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn now_honours_offset() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let value = ClockPlugin::new().now(&json!({ "utc_offset_minutes": 90 }), at).unwrap();
        assert_eq!(value["iso8601"], "2024-03-01T13:30:00+01:30");
        assert_eq!(value["unix_seconds"], at.timestamp());
    }

    #[test]
    fn now_rejects_absurd_offsets() {
        let err = ClockPlugin::new()
            .now(&json!({ "utc_offset_minutes": 100000 }), Utc::now())
            .unwrap_err();
        assert_eq!(err.code(), "invalid_arguments");
    }

    #[test]
    fn offsets_that_overflow_seconds_are_invalid_arguments() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        for minutes in [307_445_734_561_825_861_i64, i64::MAX, i64::MIN] {
            let arguments = json!({ "utc_offset_minutes": minutes });
            let err = ClockPlugin::new().now(&arguments, at).unwrap_err();
            assert_eq!(err.code(), "invalid_arguments", "offset {}", minutes);
        }
    }

    #[test]
    fn add_and_diff() {
        let plugin = ClockPlugin::new();
        let shifted = plugin
            .execute("add_seconds", json!({ "timestamp": "2024-01-01T00:00:00Z", "seconds": 3661 }))
            .unwrap();
        assert_eq!(shifted["iso8601"], "2024-01-01T01:01:01+00:00");

        let diff = plugin
            .execute(
                "diff_seconds",
                json!({ "from": "2024-01-01T00:00:00Z", "to": "2023-12-31T23:59:00Z" }),
            )
            .unwrap();
        assert_eq!(diff["seconds"], -60);
    }

    #[test]
    fn bad_timestamp_is_invalid_arguments() {
        let err = ClockPlugin::new()
            .execute("diff_seconds", json!({ "from": "yesterday", "to": "2024-01-01T00:00:00Z" }))
            .unwrap_err();
        assert_eq!(err.code(), "invalid_arguments");
    }

    #[test]
    fn v1_entry_has_no_manifest_slot() {
        let table = unsafe { &*osaurus_plugin_entry_v1() };
        assert!(table.free_string.is_some());
        assert_eq!(unsafe { (table.tool_count.unwrap())() }, 3);
    }
}
