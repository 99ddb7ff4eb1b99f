//! Error types for CSDL model reading and `$select`/`$expand` binding.

use std::path::PathBuf;
use thiserror::Error;

/// Errors while reading a CSDL JSON document into a [`Model`](crate::Model).
///
/// Every variant is fatal: the whole document is rejected.
#[derive(Debug, Error)]
pub enum CsdlError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    // Document errors (exit code 2)
    #[error("missing required member {member} at {path}")]
    MissingRequiredMember { path: String, member: String },

    #[error("unexpected shape at {path}: expected {expected}, got {actual}")]
    UnexpectedShape {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("annotation target \"{target}\" not found at {path}")]
    AnnotationTargetNotFound { path: String, target: String },

    #[error("referenced document not found: {uri}")]
    MissingReferencedDocument { uri: String },
}

impl CsdlError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            CsdlError::FileNotFound { .. } | CsdlError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            CsdlError::NetworkError { .. } => 3,
            _ => 2,
        }
    }

    pub(crate) fn shape(path: &str, expected: &str, actual: impl Into<String>) -> Self {
        CsdlError::UnexpectedShape {
            path: path.to_string(),
            expected: expected.to_string(),
            actual: actual.into(),
        }
    }

    pub(crate) fn missing(path: &str, member: &str) -> Self {
        CsdlError::MissingRequiredMember {
            path: path.to_string(),
            member: member.to_string(),
        }
    }
}

/// Errors while binding a `$select` or `$expand` path against a model.
///
/// Every variant is fatal: the whole query option is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectExpandError {
    #[error("syntax error in select path: {message}")]
    SelectionSyntax { message: String },

    #[error("navigation property \"{navigation}\" is expanded through a different type cast")]
    AmbiguousExpansion { navigation: String },

    #[error("path continues past navigation property \"{navigation}\" which is not expanded")]
    SelectWithoutExpand { navigation: String },

    #[error("path continues past \"{segment}\" which is not a navigation property")]
    NonNavigationPath { segment: String },

    #[error("\"{segment}\" is not a member of type {type_name}")]
    UnknownPathSegment { segment: String, type_name: String },

    #[error("unknown structured type {type_name}")]
    UnknownType { type_name: String },
}

impl SelectExpandError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }

    pub(crate) fn syntax(message: impl Into<String>) -> Self {
        SelectExpandError::SelectionSyntax {
            message: message.into(),
        }
    }
}

/// A member the reader does not recognise.
///
/// Never fatal: the member is skipped and the value is handed to a
/// [`Reporter`](crate::Reporter) so forward-compatible documents still read.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct UnknownMember {
    /// JSON Pointer-like path of the object holding the member.
    pub path: String,
    /// Member name as written in the document.
    pub member: String,
}

impl std::fmt::Display for UnknownMember {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: unknown member \"{}\"", self.path, self.member)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csdl_error_exit_codes() {
        let err = CsdlError::FileNotFound {
            path: PathBuf::from("metadata.json"),
        };
        assert_eq!(err.exit_code(), 3);

        let err = CsdlError::missing("", "$Version");
        assert_eq!(err.exit_code(), 2);

        let err = CsdlError::MissingReferencedDocument {
            uri: "https://example.com/$metadata".into(),
        };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn unexpected_shape_message() {
        let err = CsdlError::shape("/NS/Customer", "object", "array");
        assert_eq!(
            err.to_string(),
            "unexpected shape at /NS/Customer: expected object, got array"
        );
    }

    #[test]
    fn select_expand_error_exit_code() {
        let err = SelectExpandError::syntax("unexpected $count");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn unknown_member_display() {
        let member = UnknownMember {
            path: "/NS/Customer".into(),
            member: "$Frobnicate".into(),
        };
        assert_eq!(
            member.to_string(),
            "/NS/Customer: unknown member \"$Frobnicate\""
        );
    }
}
