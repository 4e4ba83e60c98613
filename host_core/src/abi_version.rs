use std::fmt;
use std::str::FromStr;

use plugin_core::abi::{ENTRY_SYMBOL, ENTRY_SYMBOL_V1, ENTRY_SYMBOL_V2};
use serde::{Deserialize, Deserializer, Serialize};

/// Which table layout a plugin exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AbiVersion {
    Generic,
    V1,
    V2,
}

impl AbiVersion {
    /// Newest layout first; a plugin exporting several is bound through the first match.
    pub const DETECTION_ORDER: [AbiVersion; 3] =
        [AbiVersion::V2, AbiVersion::V1, AbiVersion::Generic];

    pub fn entry_symbol(&self) -> &'static str {
        match self {
            AbiVersion::Generic => ENTRY_SYMBOL,
            AbiVersion::V1 => ENTRY_SYMBOL_V1,
            AbiVersion::V2 => ENTRY_SYMBOL_V2,
        }
    }

    /// NUL-terminated symbol name for `dlsym`.
    pub(crate) fn symbol_bytes(&self) -> &'static [u8] {
        match self {
            AbiVersion::Generic => b"osaurus_plugin_entry\0",
            AbiVersion::V1 => b"osaurus_plugin_entry_v1\0",
            AbiVersion::V2 => b"osaurus_plugin_entry_v2\0",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AbiVersion::Generic => "generic",
            AbiVersion::V1 => "v1",
            AbiVersion::V2 => "v2",
        }
    }
}

impl fmt::Display for AbiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AbiVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "generic" => Ok(AbiVersion::Generic),
            "v1" => Ok(AbiVersion::V1),
            "v2" => Ok(AbiVersion::V2),
            other => Err(format!("unknown abi '{}' (expected generic, v1 or v2)", other)),
        }
    }
}

// Config files accept the same spellings as `--abi`.
impl<'de> Deserialize<'de> for AbiVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
