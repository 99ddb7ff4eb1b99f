//! Document linting - static analysis of CSDL JSON files.
//!
//! Checks each document for:
//! - JSON syntax errors
//! - Structural errors that make the reader reject the document
//! - Unknown members the reader skips
//! - Entity types without a key, and a dangling `$EntityContainer`

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::edm::{Model, StructuredKind};
use crate::error::{CsdlError, UnknownMember};
use crate::loader::load_document;
use crate::reader::CsdlReader;
use crate::reference::sibling_resolver;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic message from linting.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub file: PathBuf,
    /// JSON path to the issue (e.g., "/Sales/Customer/$Key")
    pub path: String,
    pub message: String,
}

/// Result of linting a single file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Status of a linted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Error,
    Warning,
}

/// Result of linting a directory or set of files.
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub path: PathBuf,
    pub files_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<FileResult>,
}

impl LintResult {
    /// Returns true if all files passed (no errors).
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }
}

/// Lint a file or directory.
///
/// If path is a directory, recursively finds all .json files.
/// If `strict` is true, warnings are treated as errors.
/// Returns aggregated results for all files.
pub fn lint(path: &Path, strict: bool) -> LintResult {
    let files = collect_document_files(path);
    let mut results = Vec::new();
    let mut total_errors = 0;
    let mut total_warnings = 0;

    for file in &files {
        let file_result = lint_file(file, path);
        total_errors += count(&file_result, Severity::Error);
        total_warnings += count(&file_result, Severity::Warning);
        results.push(file_result);
    }

    let failed = results
        .iter()
        .filter(|r| {
            if strict {
                r.status != FileStatus::Ok
            } else {
                r.status == FileStatus::Error
            }
        })
        .count();

    LintResult {
        path: path.to_path_buf(),
        files_checked: files.len(),
        passed: files.len() - failed,
        failed,
        errors: total_errors,
        warnings: total_warnings,
        results,
    }
}

fn count(result: &FileResult, severity: Severity) -> usize {
    result
        .diagnostics
        .iter()
        .filter(|d| d.severity == severity)
        .count()
}

/// Lint a single CSDL JSON document.
///
/// References resolve against files next to the document, then the bundled
/// vocabularies.
pub fn lint_file(file: &Path, base_path: &Path) -> FileResult {
    let mut diagnostics = Vec::new();
    let diagnostic = |severity: Severity, code: &str, path: &str, message: String| Diagnostic {
        severity,
        code: code.to_string(),
        file: file.to_path_buf(),
        path: path.to_string(),
        message,
    };

    let document = match load_document(file) {
        Ok(document) => document,
        Err(e) => {
            diagnostics.push(diagnostic(
                Severity::Error,
                "E001",
                "/",
                format!("syntax error: {}", e),
            ));
            return file_result(file, base_path, diagnostics);
        }
    };

    let mut unknown: Vec<UnknownMember> = Vec::new();
    let read = CsdlReader::new()
        .resolver(sibling_resolver(file))
        .reporter(&mut unknown)
        .read(&document);

    match read {
        Ok(model) => check_model(&model, &mut |code, path, message| {
            diagnostics.push(diagnostic(Severity::Warning, code, path, message));
        }),
        Err(e) => {
            let (code, path) = error_location(&e);
            diagnostics.push(diagnostic(Severity::Error, code, &path, e.to_string()));
        }
    }

    for member in unknown {
        diagnostics.push(diagnostic(
            Severity::Warning,
            "W001",
            &member.path,
            format!("unknown member \"{}\"", member.member),
        ));
    }

    file_result(file, base_path, diagnostics)
}

fn file_result(file: &Path, base_path: &Path, diagnostics: Vec<Diagnostic>) -> FileResult {
    let has_errors = diagnostics.iter().any(|d| d.severity == Severity::Error);
    let has_warnings = diagnostics.iter().any(|d| d.severity == Severity::Warning);

    let status = if has_errors {
        FileStatus::Error
    } else if has_warnings {
        FileStatus::Warning
    } else {
        FileStatus::Ok
    };

    FileResult {
        file: file.strip_prefix(base_path).unwrap_or(file).to_path_buf(),
        status,
        diagnostics,
    }
}

/// Diagnostic code and JSON path for a fatal reader error.
fn error_location(error: &CsdlError) -> (&'static str, String) {
    match error {
        CsdlError::MissingRequiredMember { path, .. } => ("E002", path.clone()),
        CsdlError::UnexpectedShape { path, .. } => ("E003", path.clone()),
        CsdlError::AnnotationTargetNotFound { path, .. } => ("E004", path.clone()),
        CsdlError::MissingReferencedDocument { .. } => ("E005", "/$Reference".to_string()),
        _ => ("E001", "/".to_string()),
    }
}

/// Warnings about documents the reader accepts.
fn check_model(model: &Model, warn: &mut dyn FnMut(&str, &str, String)) {
    for schema in &model.schemas {
        for ty in &schema.structured_types {
            if ty.kind == StructuredKind::Entity
                && ty.key.is_empty()
                && ty.base_type.is_none()
                && !ty.is_abstract
            {
                warn(
                    "W002",
                    &format!("/{}/{}", schema.namespace, ty.name),
                    format!("entity type {} has no $Key", ty.name),
                );
            }
        }
    }

    if let Some(container) = &model.entity_container {
        if model.find_entity_container(container).is_none() {
            warn(
                "W003",
                "/$EntityContainer",
                format!("entity container {} is not declared", container),
            );
        }
    }
}

/// Collect all .json files in a path (file or directory).
fn collect_document_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            return vec![path.to_path_buf()];
        }
        return vec![];
    }

    let mut files = Vec::new();
    collect_files_recursive(path, &mut files);
    files.sort();
    files
}

fn collect_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files_recursive(&path, files);
        } else if path.extension().map(|e| e == "json").unwrap_or(false) {
            files.push(path);
        }
    }
}
