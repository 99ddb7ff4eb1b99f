//! Shared vocabulary of the CSDL JSON reader.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `$Kind` values a schema member object may carry.
pub const ELEMENT_KINDS: &[&str] = &[
    "EntityContainer",
    "EntityType",
    "ComplexType",
    "EnumType",
    "TypeDefinition",
    "Term",
];

/// `$Kind` values an operation overload may carry.
pub const OPERATION_KINDS: &[&str] = &["Action", "Function"];

/// Type assumed when a member omits `$Type`.
pub const DEFAULT_TYPE: &str = "Edm.String";

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Append a member name to a diagnostic path, JSON-pointer escaped.
pub(crate) fn child_path(path: &str, member: &str) -> String {
    format!("{}/{}", path, member.replace('~', "~0").replace('/', "~1"))
}

/// Protocol version declared by `$Version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdmVersion {
    #[serde(rename = "4.0")]
    V4_0,
    #[serde(rename = "4.01")]
    V4_01,
}

impl EdmVersion {
    /// Parse a `$Version` value.
    ///
    /// Returns `None` for anything but `4.0` and `4.01`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "4.0" => Some(EdmVersion::V4_0),
            "4.01" => Some(EdmVersion::V4_01),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EdmVersion::V4_0 => "4.0",
            EdmVersion::V4_01 => "4.01",
        }
    }
}

impl std::fmt::Display for EdmVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
