//! Text utilities behind the generic `(type, id, payload)` table.
//!
//! Each host `init` gets its own `TextKit`, which counts the calls it served.

use std::sync::atomic::{AtomicU64, Ordering};

use plugin_core::{
    declare_plugin, log_debug, string_arg, PermissionPolicy, PluginIdentity, ToolError, ToolPlugin,
    ToolSpec,
};
use serde_json::{json, Value};

pub const PLUGIN_ID: &str = "dev.osaurus.textkit";

#[derive(Default)]
pub struct TextKit {
    calls: AtomicU64,
}

fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

fn text_schema() -> Value {
    json!({
        "type": "object",
        "properties": { "text": { "type": "string" } },
        "required": ["text"]
    })
}

impl TextKit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

impl ToolPlugin for TextKit {
    fn identity(&self) -> PluginIdentity {
        PluginIdentity::new(PLUGIN_ID, env!("CARGO_PKG_VERSION"))
            .named("Text Kit")
            .described("Counting and case conversion for plain text")
    }

    fn tools(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new("word_count", "Counts words, lines and characters")
                .parameters(text_schema())
                .policy(PermissionPolicy::Auto),
            ToolSpec::new("uppercase", "Converts text to upper case")
                .parameters(text_schema())
                .policy(PermissionPolicy::Auto),
            ToolSpec::new("slugify", "Lower-case, dash-separated form of the text for URLs")
                .parameters(text_schema()),
        ]
    }

    fn execute(&self, tool_name: &str, arguments: Value) -> Result<Value, ToolError> {
        let served = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        log_debug!(&format!("textkit call #{}: {}", served, tool_name));

        let text = match tool_name {
            "word_count" | "uppercase" | "slugify" => string_arg(&arguments, "text")?,
            other => return Err(ToolError::UnknownTool(other.to_string())),
        };

        Ok(match tool_name {
            "word_count" => json!({
                "words": text.split_whitespace().count(),
                "lines": text.lines().count(),
                "chars": text.chars().count(),
            }),
            "uppercase" => json!({ "text": text.to_uppercase() }),
            _ => json!({ "text": slugify(text) }),
        })
    }
}

declare_plugin!(TextKit, TextKit::new());
